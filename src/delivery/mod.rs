//! Low-level delivery primitive.
//!
//! Addresses one of four logical recipient-group kinds (user, role, academy,
//! class) and pushes an event + payload to the matching transport room.
//! Single-target emits reject malformed input with a typed error; batch
//! emission attempts every entry and isolates every failure.

mod service;
mod target;

pub use service::{
    BatchEntry, BatchReport, DeliveryService, DeliveryStatsSnapshot, EmitOutcome, EntryOutcome,
    RawBatchEntry, SkipReason,
};
pub use target::{Target, TargetParseError};
