use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Role;

/// The single wire event name every notification is delivered under.
///
/// Clients subscribe to one generic channel and use their own id plus
/// `affectedUsers`/`sourceEvent` to decide relevance and what to re-fetch.
/// One stable event name instead of N domain-specific ones trades a larger
/// payload for a much simpler client.
pub const UPDATE_REQUIRED_EVENT: &str = "update_required";

/// One user who must learn about a business event.
///
/// The role is carried for client-side filtering only; addressing is always
/// by user id once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedParty {
    pub user_id: i64,
    pub role: Role,
}

impl AffectedParty {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn student(user_id: i64) -> Self {
        Self::new(user_id, Role::Student)
    }

    pub fn teacher(user_id: i64) -> Self {
        Self::new(user_id, Role::Teacher)
    }

    pub fn principal(user_id: i64) -> Self {
        Self::new(user_id, Role::Principal)
    }
}

/// The canonical notification payload.
///
/// Transient: built once per business-event occurrence, serialized once, and
/// an identical copy is delivered to every resolved recipient. Never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEnvelope {
    /// Always `"update_required"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The business event that triggered this notification,
    /// e.g. `"enrollment_status_changed"`.
    pub source_event: String,
    /// Everyone this occurrence concerns, across all recipients.
    pub affected_users: Vec<AffectedParty>,
    /// When the envelope was built.
    pub timestamp: DateTime<Utc>,
    /// Optional human-readable note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UpdateEnvelope {
    pub fn new(
        source_event: impl Into<String>,
        affected_users: Vec<AffectedParty>,
        message: Option<String>,
    ) -> Self {
        Self {
            kind: UPDATE_REQUIRED_EVENT.to_string(),
            source_event: source_event.into(),
            affected_users,
            timestamp: Utc::now(),
            message,
        }
    }
}
