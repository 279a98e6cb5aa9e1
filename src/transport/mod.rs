//! Room-capable realtime transport collaborator.
//!
//! The delivery service only needs one operation from the transport: push an
//! event with a JSON payload to a named room. Connection and subscription
//! lifecycle live entirely on the other side of this trait.

mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::{MemoryTransport, RecordedEmission};

/// Errors that can occur while emitting to a room.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The transport refused the emission (room closed, backpressure, ...).
    #[error("emission to {room} rejected: {reason}")]
    Rejected { room: String, reason: String },

    /// The transport itself is down.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Push-only interface to the realtime layer.
///
/// Implementations must be safe to call concurrently; the delivery service
/// may fan a batch out in parallel.
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Emit `event` with `payload` to every client joined to `room`.
    ///
    /// An empty room is a successful no-op, not an error.
    async fn emit(
        &self,
        room: &str,
        event: &str,
        payload: &serde_json::Value,
    ) -> Result<(), TransportError>;
}
