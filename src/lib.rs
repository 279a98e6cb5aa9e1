//! Real-time notification fan-out for the academy platform.
//!
//! Translates a committed domain mutation (enrollment approved, refund
//! requested, class created, membership changed) into the set of connected
//! users who must hear about it, and delivers one canonical
//! `update_required` envelope to each, with per-recipient failure isolation.
//!
//! Delivery is best-effort and at-most-once by design: the envelope only
//! signals "something changed, re-fetch", so a dropped notification degrades
//! to the client's next natural refresh, never to a correctness failure of
//! the triggering transaction.

// Domain layer
pub mod domain;
pub mod resolver;

// Delivery layer
pub mod delivery;
pub mod notifier;

// Collaborators (consumed through traits)
pub mod store;
pub mod transport;

// Supporting modules
pub mod config;
pub mod error;
pub mod telemetry;

pub use delivery::{BatchEntry, BatchReport, DeliveryService, RawBatchEntry, Target};
pub use error::{DeliveryError, ValidationError};
pub use notifier::{AffectedParty, EventNotifier, UpdateEnvelope, UPDATE_REQUIRED_EVENT};
pub use resolver::TargetResolver;
