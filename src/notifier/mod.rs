//! Event normalization and fan-out orchestration.
//!
//! Domain services call one `notify_*` method synchronously after a
//! successful mutation commit, passing the fully-relation-loaded entity. The
//! notifier asks the resolver for affected parties, wraps them in one
//! canonical [`UpdateEnvelope`], and hands the delivery service one
//! `update_required` entry per party. Notification failures never affect the
//! triggering business call: every method returns a [`BatchReport`], never
//! an error.

mod types;

use std::sync::Arc;

use crate::delivery::{BatchEntry, BatchReport, DeliveryService, Target};
use crate::domain::{
    Academy, Class, DomainEvent, Enrollment, EnrollmentStatus, MembershipChange, Refund,
    RefundStatus, Session,
};
use crate::resolver::TargetResolver;

pub use types::{AffectedParty, UpdateEnvelope, UPDATE_REQUIRED_EVENT};

/// Translates domain mutations into canonical `update_required` fan-outs.
pub struct EventNotifier {
    resolver: TargetResolver,
    delivery: Arc<DeliveryService>,
}

impl EventNotifier {
    pub fn new(resolver: TargetResolver, delivery: Arc<DeliveryService>) -> Self {
        Self { resolver, delivery }
    }

    /// Build one envelope for `source_event` and emit it to every party's
    /// `user:<id>` room.
    ///
    /// The envelope is serialized once and the identical payload is shared
    /// across all entries. Parties that cannot form a valid user target are
    /// filtered out, not retried.
    #[tracing::instrument(
        name = "notifier.update_required",
        skip(self, parties, message),
        fields(source_event = %source_event, party_count = parties.len())
    )]
    pub async fn notify_update_required(
        &self,
        source_event: &str,
        parties: Vec<AffectedParty>,
        message: Option<String>,
    ) -> BatchReport {
        if parties.is_empty() {
            tracing::debug!(source_event = %source_event, "No recipients resolved");
            return BatchReport::default();
        }

        let envelope = UpdateEnvelope::new(source_event, parties.clone(), message);
        let payload = match serde_json::to_value(&envelope) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(source_event = %source_event, error = %e, "Failed to serialize envelope");
                return BatchReport::default();
            }
        };

        let entries: Vec<BatchEntry> = parties
            .iter()
            .filter_map(|party| {
                if party.user_id <= 0 {
                    tracing::warn!(
                        user_id = party.user_id,
                        role = %party.role,
                        "Filtered party with unusable user id"
                    );
                    return None;
                }
                Some(BatchEntry {
                    target: Target::User(party.user_id),
                    event: UPDATE_REQUIRED_EVENT.to_string(),
                    data: payload.clone(),
                })
            })
            .collect();

        self.delivery.emit_batch(&entries).await
    }

    /// Generic enrollment adapter: notifies the applying student and the
    /// academy principal under the caller-supplied event name.
    pub async fn notify_enrollment_event(
        &self,
        source_event: &str,
        enrollment: &Enrollment,
        message: Option<String>,
    ) -> BatchReport {
        let parties = self
            .resolver
            .resolve_enrollment_event_targets(enrollment)
            .await;
        self.notify_update_required(source_event, parties, message)
            .await
    }

    /// Generic refund adapter: notifies the requesting student and the
    /// academy principal.
    pub async fn notify_refund_event(
        &self,
        source_event: &str,
        refund: &Refund,
        message: Option<String>,
    ) -> BatchReport {
        let parties = self.resolver.resolve_refund_event_targets(refund).await;
        self.notify_update_required(source_event, parties, message)
            .await
    }

    /// Generic class adapter: notifies the academy principal and the class's
    /// teacher.
    pub async fn notify_class_event(
        &self,
        source_event: &str,
        class: &Class,
        message: Option<String>,
    ) -> BatchReport {
        let parties = self.resolver.resolve_class_event_targets(class).await;
        self.notify_update_required(source_event, parties, message)
            .await
    }

    /// Generic academy adapter: notifies the principal and every teacher.
    pub async fn notify_academy_event(
        &self,
        source_event: &str,
        academy: &Academy,
        message: Option<String>,
    ) -> BatchReport {
        let parties = self.resolver.resolve_academy_event_targets(academy).await;
        self.notify_update_required(source_event, parties, message)
            .await
    }

    /// A student applied: the principal hears about it.
    pub async fn notify_enrollment_created(&self, enrollment: &Enrollment) -> BatchReport {
        let parties = self.resolver.resolve_enrollment_created(enrollment).await;
        self.notify_update_required("enrollment_created", parties, None)
            .await
    }

    /// An application was decided: the student hears about it.
    pub async fn notify_enrollment_status_changed(
        &self,
        enrollment: &Enrollment,
        previous: EnrollmentStatus,
    ) -> BatchReport {
        tracing::debug!(
            enrollment_id = enrollment.id,
            previous = ?previous,
            current = ?enrollment.status,
            "Enrollment status changed"
        );
        let parties = self
            .resolver
            .resolve_enrollment_status_changed(enrollment)
            .await;
        self.notify_update_required("enrollment_status_changed", parties, None)
            .await
    }

    /// A refund was requested: the principal hears about it.
    pub async fn notify_refund_created(&self, refund: &Refund) -> BatchReport {
        let parties = self.resolver.resolve_refund_created(refund).await;
        self.notify_update_required("refund_created", parties, None)
            .await
    }

    /// A refund was decided: the student hears about it.
    pub async fn notify_refund_status_changed(
        &self,
        refund: &Refund,
        previous: RefundStatus,
    ) -> BatchReport {
        tracing::debug!(
            refund_id = refund.id,
            previous = ?previous,
            current = ?refund.status,
            "Refund status changed"
        );
        let parties = self.resolver.resolve_refund_status_changed(refund).await;
        self.notify_update_required("refund_status_changed", parties, None)
            .await
    }

    /// Session availability changed: the academy's students hear about it.
    pub async fn notify_session_availability_changed(&self, session: &Session) -> BatchReport {
        let parties = self
            .resolver
            .resolve_session_availability_changed(session)
            .await;
        self.notify_update_required("session_availability_changed", parties, None)
            .await
    }

    /// A class was created: the academy's students hear about it.
    pub async fn notify_class_created(&self, class: &Class) -> BatchReport {
        let parties = self.resolver.resolve_class_created(class).await;
        self.notify_update_required("class_created", parties, None)
            .await
    }

    /// A teacher joined or left the academy: everyone but that teacher hears
    /// about it.
    pub async fn notify_teacher_membership_changed(
        &self,
        teacher_id: i64,
        academy: &Academy,
        change: MembershipChange,
    ) -> BatchReport {
        let parties = self
            .resolver
            .resolve_teacher_membership_changed(teacher_id, academy)
            .await;
        let source_event = format!("teacher_{}_academy", change.as_str());
        self.notify_update_required(&source_event, parties, None)
            .await
    }

    /// A student joined or left the academy: the staff hears about it.
    pub async fn notify_student_membership_changed(
        &self,
        student_id: i64,
        academy: &Academy,
        change: MembershipChange,
    ) -> BatchReport {
        let parties = self
            .resolver
            .resolve_student_membership_changed(student_id, academy)
            .await;
        let source_event = format!("student_{}_academy", change.as_str());
        self.notify_update_required(&source_event, parties, None)
            .await
    }

    /// Route one [`DomainEvent`] to its adapter.
    pub async fn notify(&self, event: DomainEvent) -> BatchReport {
        match event {
            DomainEvent::EnrollmentCreated(enrollment) => {
                self.notify_enrollment_created(&enrollment).await
            }
            DomainEvent::EnrollmentStatusChanged {
                enrollment,
                previous,
            } => {
                self.notify_enrollment_status_changed(&enrollment, previous)
                    .await
            }
            DomainEvent::RefundCreated(refund) => self.notify_refund_created(&refund).await,
            DomainEvent::RefundStatusChanged { refund, previous } => {
                self.notify_refund_status_changed(&refund, previous).await
            }
            DomainEvent::SessionAvailabilityChanged(session) => {
                self.notify_session_availability_changed(&session).await
            }
            DomainEvent::ClassCreated(class) => self.notify_class_created(&class).await,
            DomainEvent::TeacherMembershipChanged {
                teacher_id,
                academy,
                change,
            } => {
                self.notify_teacher_membership_changed(teacher_id, &academy, change)
                    .await
            }
            DomainEvent::StudentMembershipChanged {
                student_id,
                academy,
                change,
            } => {
                self.notify_student_membership_changed(student_id, &academy, change)
                    .await
            }
        }
    }

    /// Fire-and-forget entry point for domain services.
    ///
    /// Runs the fan-out on a detached task with its own error boundary, so a
    /// slow or failing notification can never delay or fail the originating
    /// business transaction. The handle is returned for callers (and tests)
    /// that do want to await the report.
    pub fn notify_detached(
        self: &Arc<Self>,
        event: DomainEvent,
    ) -> tokio::task::JoinHandle<BatchReport> {
        let notifier = Arc::clone(self);
        tokio::spawn(async move {
            let report = notifier.notify(event).await;
            if !report.all_delivered() {
                tracing::warn!(
                    delivered = report.delivered(),
                    skipped = report.skipped(),
                    "Detached notification finished with skipped entries"
                );
            }
            report
        })
    }
}
