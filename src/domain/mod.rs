//! Academy domain entities and event payloads.
//!
//! These types mirror what the domain services already hold in memory when
//! they call the notifier: each payload carries its relationship chain
//! pre-joined (`enrollment -> session -> class -> academy`) so target
//! resolution can usually avoid store round-trips.

use serde::{Deserialize, Serialize};

/// Role a user plays inside an academy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Teacher,
    Principal,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Teacher => "TEACHER",
            Role::Principal => "PRINCIPAL",
        }
    }

    /// Parse from the wire form used by the `role:<NAME>` addressing grammar.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STUDENT" => Some(Role::Student),
            "TEACHER" => Some(Role::Teacher),
            "PRINCIPAL" => Some(Role::Principal),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of an enrollment application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

/// Lifecycle of a refund request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Requested,
    Approved,
    Rejected,
}

/// Direction of an academy membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Joined,
    Left,
}

impl MembershipChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipChange::Joined => "joined",
            MembershipChange::Left => "left",
        }
    }
}

/// The principal (owner) of an academy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub name: String,
}

/// A teacher belonging to an academy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    pub id: i64,
    pub name: String,
    pub academy_id: i64,
}

/// An academy with its principal and teacher roster loaded.
///
/// `principal` is optional: an academy whose principal account was removed
/// still exists and still notifies everyone else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Academy {
    pub id: i64,
    pub name: String,
    pub principal: Option<Principal>,
    #[serde(default)]
    pub teachers: Vec<Teacher>,
}

/// A class offered by an academy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: i64,
    pub name: String,
    pub academy_id: i64,
    /// Pre-joined parent, when the caller loaded it.
    pub academy: Option<Academy>,
    /// The teacher assigned to this class, if any.
    pub teacher_id: Option<i64>,
}

/// A bookable session of a class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub class_id: i64,
    /// Pre-joined parent, when the caller loaded it.
    pub class: Option<Class>,
}

/// A student's enrollment application for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub status: EnrollmentStatus,
    /// Pre-joined `session -> class -> academy` chain, when loaded.
    pub session: Option<Session>,
}

/// A refund request raised against an enrollment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: i64,
    pub student_id: i64,
    pub status: RefundStatus,
    /// Pre-joined enrollment chain, when loaded.
    pub enrollment: Option<Enrollment>,
}

impl Enrollment {
    /// Walk the embedded chain to the owning academy id, if fully loaded.
    pub fn academy_id(&self) -> Option<i64> {
        self.session
            .as_ref()
            .and_then(|s| s.class.as_ref())
            .map(|c| c.academy_id)
    }

    /// Walk the embedded chain to the owning academy entity, if fully loaded.
    pub fn academy(&self) -> Option<&Academy> {
        self.session
            .as_ref()
            .and_then(|s| s.class.as_ref())
            .and_then(|c| c.academy.as_ref())
    }
}

impl Refund {
    pub fn academy_id(&self) -> Option<i64> {
        self.enrollment.as_ref().and_then(Enrollment::academy_id)
    }

    pub fn academy(&self) -> Option<&Academy> {
        self.enrollment.as_ref().and_then(Enrollment::academy)
    }
}

/// One domain mutation the notifier can be handed as a unit.
///
/// Domain services may call the per-event methods on
/// [`EventNotifier`](crate::notifier::EventNotifier) directly; this enum
/// exists for callers that route all mutations through the single detached
/// entry point.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    EnrollmentCreated(Enrollment),
    EnrollmentStatusChanged {
        enrollment: Enrollment,
        previous: EnrollmentStatus,
    },
    RefundCreated(Refund),
    RefundStatusChanged {
        refund: Refund,
        previous: RefundStatus,
    },
    SessionAvailabilityChanged(Session),
    ClassCreated(Class),
    TeacherMembershipChanged {
        teacher_id: i64,
        academy: Academy,
        change: MembershipChange,
    },
    StudentMembershipChanged {
        student_id: i64,
        academy: Academy,
        change: MembershipChange,
    },
}
