//! Crate-wide error taxonomy.
//!
//! Three failure classes exist and they are handled differently on purpose:
//!
//! - [`ValidationError`] — malformed input at a single-emit call boundary.
//!   This is the caller's bug: rejected immediately, never retried, and no
//!   transport call is made.
//! - [`StoreError`] — a relationship lookup failed during target resolution.
//!   Swallowed inside the resolver: the party is omitted and the partial
//!   list is returned.
//! - [`TransportError`] — the realtime transport rejected an emission.
//!   Propagated from single-emit calls; inside a batch it marks that entry
//!   skipped and the batch continues.
//!
//! There is no retry policy anywhere. Delivery is at-most-once and
//! best-effort: the envelope only signals "re-fetch your state", so a dropped
//! notification degrades to the client's next natural refresh.

use thiserror::Error;

pub use crate::store::StoreError;
pub use crate::transport::TransportError;

/// Malformed input at a single-emit call boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be positive, got {value}")]
    NonPositiveId { field: &'static str, value: i64 },

    #[error("event name must not be empty")]
    EmptyEventName,
}

/// Failure of one single-target emit call.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl DeliveryError {
    /// True when the failure was rejected before any transport call.
    pub fn is_validation(&self) -> bool {
        matches!(self, DeliveryError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, DeliveryError>;
