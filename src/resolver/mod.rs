//! Target resolution: which users must learn about a domain mutation.
//!
//! Each resolver method implements one business policy from the notification
//! matrix (who is told, who is deliberately left out). Methods read the
//! relationship chain embedded in the payload first
//! (`enrollment.session.class.academy_id`) and fall back to the read-only
//! store only for data the caller could not embed (principal, teacher roster,
//! student membership list).
//!
//! Resolution never fails: a lookup error is logged and the partial list
//! built so far is returned. An empty list is a valid, silent outcome, and
//! callers must not treat "no targets" as an error. Duplicate user ids
//! across roles are intentionally not de-duplicated.

use std::sync::Arc;

use crate::domain::{Academy, Class, Enrollment, Refund, Session};
use crate::notifier::AffectedParty;
use crate::store::DomainStore;

/// Maps business events to the concrete recipients who must learn of them.
pub struct TargetResolver {
    store: Arc<dyn DomainStore>,
}

impl TargetResolver {
    pub fn new(store: Arc<dyn DomainStore>) -> Self {
        Self { store }
    }

    /// A new enrollment application: tell the academy principal. The applying
    /// student triggered it and is not notified.
    pub async fn resolve_enrollment_created(&self, enrollment: &Enrollment) -> Vec<AffectedParty> {
        let mut parties = Vec::new();
        if let Some(academy) = self.academy_for_enrollment(enrollment).await {
            push_principal(&mut parties, &academy);
        }
        parties
    }

    /// An enrollment decision: tell the applying student. The principal made
    /// the decision and is not notified.
    pub async fn resolve_enrollment_status_changed(
        &self,
        enrollment: &Enrollment,
    ) -> Vec<AffectedParty> {
        vec![AffectedParty::student(enrollment.student_id)]
    }

    /// A new refund request: tell the academy principal, not the requesting
    /// student.
    pub async fn resolve_refund_created(&self, refund: &Refund) -> Vec<AffectedParty> {
        let mut parties = Vec::new();
        if let Some(academy) = self.academy_for_refund(refund).await {
            push_principal(&mut parties, &academy);
        }
        parties
    }

    /// A refund decision: tell the requesting student, not the principal.
    pub async fn resolve_refund_status_changed(&self, refund: &Refund) -> Vec<AffectedParty> {
        vec![AffectedParty::student(refund.student_id)]
    }

    /// Session availability changed: tell every student of the academy.
    /// Teachers manage availability and are not notified.
    pub async fn resolve_session_availability_changed(
        &self,
        session: &Session,
    ) -> Vec<AffectedParty> {
        let Some(class) = session.class.as_ref() else {
            tracing::warn!(
                session_id = session.id,
                class_id = session.class_id,
                "Session payload has no class chain, resolving no targets"
            );
            return Vec::new();
        };
        self.academy_students(class.academy_id).await
    }

    /// A new class: tell every student of the academy so they can enroll.
    /// Teachers and the principal created it and are not notified.
    pub async fn resolve_class_created(&self, class: &Class) -> Vec<AffectedParty> {
        self.academy_students(class.academy_id).await
    }

    /// A teacher joined or left: tell the principal, the other teachers, and
    /// every student. The teacher in question is excluded.
    pub async fn resolve_teacher_membership_changed(
        &self,
        teacher_id: i64,
        academy: &Academy,
    ) -> Vec<AffectedParty> {
        let mut parties = Vec::new();
        push_principal(&mut parties, academy);
        for teacher in &academy.teachers {
            if teacher.id != teacher_id {
                parties.push(AffectedParty::teacher(teacher.id));
            }
        }
        parties.extend(self.academy_students(academy.id).await);
        parties
    }

    /// A student joined or left: tell the principal and every teacher. Other
    /// students are not notified.
    pub async fn resolve_student_membership_changed(
        &self,
        _student_id: i64,
        academy: &Academy,
    ) -> Vec<AffectedParty> {
        let mut parties = Vec::new();
        push_principal(&mut parties, academy);
        for teacher in &academy.teachers {
            parties.push(AffectedParty::teacher(teacher.id));
        }
        parties
    }

    /// Generic enrollment adapter: both sides of the application, the
    /// student and the academy principal.
    pub async fn resolve_enrollment_event_targets(
        &self,
        enrollment: &Enrollment,
    ) -> Vec<AffectedParty> {
        let mut parties = vec![AffectedParty::student(enrollment.student_id)];
        if let Some(academy) = self.academy_for_enrollment(enrollment).await {
            push_principal(&mut parties, &academy);
        }
        parties
    }

    /// Generic refund adapter: the requesting student and the academy
    /// principal.
    pub async fn resolve_refund_event_targets(&self, refund: &Refund) -> Vec<AffectedParty> {
        let mut parties = vec![AffectedParty::student(refund.student_id)];
        if let Some(academy) = self.academy_for_refund(refund).await {
            push_principal(&mut parties, &academy);
        }
        parties
    }

    /// Generic class adapter: class info or status changed concerns the
    /// academy principal and the class's teacher, if one is assigned.
    /// Students re-fetch on the session/enrollment events instead.
    pub async fn resolve_class_event_targets(&self, class: &Class) -> Vec<AffectedParty> {
        let mut parties = Vec::new();
        if let Some(academy) = self.academy_for_class(class).await {
            push_principal(&mut parties, &academy);
        }
        if let Some(teacher_id) = class.teacher_id {
            match self.store.teacher_by_id(teacher_id).await {
                Ok(Some(teacher)) => parties.push(AffectedParty::teacher(teacher.id)),
                Ok(None) => tracing::debug!(
                    class_id = class.id,
                    teacher_id = teacher_id,
                    "Class teacher no longer exists, omitting"
                ),
                Err(e) => tracing::warn!(
                    class_id = class.id,
                    teacher_id = teacher_id,
                    error = %e,
                    "Teacher lookup failed, omitting party"
                ),
            }
        }
        parties
    }

    /// Generic academy adapter: academy info changed concerns the principal
    /// and every teacher. Never includes students.
    pub async fn resolve_academy_event_targets(&self, academy: &Academy) -> Vec<AffectedParty> {
        // Callers pass the academy fully loaded; a bare payload falls back to
        // the store.
        let fetched;
        let academy = if academy.principal.is_none() && academy.teachers.is_empty() {
            match self.fetch_academy(academy.id).await {
                Some(full) => {
                    fetched = full;
                    &fetched
                }
                None => academy,
            }
        } else {
            academy
        };

        let mut parties = Vec::new();
        push_principal(&mut parties, academy);
        for teacher in &academy.teachers {
            parties.push(AffectedParty::teacher(teacher.id));
        }
        parties
    }

    async fn academy_for_enrollment(&self, enrollment: &Enrollment) -> Option<Academy> {
        if let Some(academy) = enrollment.academy() {
            return Some(academy.clone());
        }
        let Some(academy_id) = enrollment.academy_id() else {
            tracing::warn!(
                enrollment_id = enrollment.id,
                "Enrollment payload has no academy chain, omitting academy parties"
            );
            return None;
        };
        self.fetch_academy(academy_id).await
    }

    async fn academy_for_refund(&self, refund: &Refund) -> Option<Academy> {
        if let Some(academy) = refund.academy() {
            return Some(academy.clone());
        }
        let Some(academy_id) = refund.academy_id() else {
            tracing::warn!(
                refund_id = refund.id,
                "Refund payload has no academy chain, omitting academy parties"
            );
            return None;
        };
        self.fetch_academy(academy_id).await
    }

    async fn academy_for_class(&self, class: &Class) -> Option<Academy> {
        if let Some(academy) = class.academy.as_ref() {
            return Some(academy.clone());
        }
        self.fetch_academy(class.academy_id).await
    }

    async fn fetch_academy(&self, academy_id: i64) -> Option<Academy> {
        match self.store.academy_by_id(academy_id).await {
            Ok(Some(academy)) => Some(academy),
            Ok(None) => {
                tracing::debug!(academy_id = academy_id, "Academy not found");
                None
            }
            Err(e) => {
                tracing::warn!(
                    academy_id = academy_id,
                    error = %e,
                    "Academy lookup failed, omitting its parties"
                );
                None
            }
        }
    }

    async fn academy_students(&self, academy_id: i64) -> Vec<AffectedParty> {
        match self.store.academy_student_ids(academy_id).await {
            Ok(ids) => ids.into_iter().map(AffectedParty::student).collect(),
            Err(e) => {
                tracing::warn!(
                    academy_id = academy_id,
                    error = %e,
                    "Student membership lookup failed, omitting students"
                );
                Vec::new()
            }
        }
    }
}

/// Push the academy's principal if it has one. An academy without a
/// principal simply yields one fewer party.
fn push_principal(parties: &mut Vec<AffectedParty>, academy: &Academy) {
    if let Some(principal) = academy.principal.as_ref() {
        parties.push(AffectedParty::principal(principal.id));
    } else {
        tracing::debug!(academy_id = academy.id, "Academy has no principal");
    }
}
