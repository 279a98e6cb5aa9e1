//! Recording in-memory transport using DashMap.
//!
//! Appends every emission to a per-room log instead of pushing it over a
//! socket. Tests assert against the log; per-room failure injection drives
//! the skip-and-continue paths of batch delivery.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};

use super::{RealtimeTransport, TransportError};

/// One emission captured by [`MemoryTransport`].
#[derive(Debug, Clone)]
pub struct RecordedEmission {
    pub room: String,
    pub event: String,
    pub payload: serde_json::Value,
    pub emitted_at: DateTime<Utc>,
}

/// In-memory transport that records emissions per room.
#[derive(Default)]
pub struct MemoryTransport {
    rooms: DashMap<String, Vec<RecordedEmission>>,
    failing_rooms: DashSet<String>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every emission to `room` fail with [`TransportError::Rejected`].
    pub fn fail_room(&self, room: impl Into<String>) {
        self.failing_rooms.insert(room.into());
    }

    /// All emissions captured for `room`, oldest first.
    pub fn emissions(&self, room: &str) -> Vec<RecordedEmission> {
        self.rooms
            .get(room)
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Total number of emissions across every room.
    pub fn total_emissions(&self) -> usize {
        self.rooms.iter().map(|entries| entries.len()).sum()
    }
}

#[async_trait]
impl RealtimeTransport for MemoryTransport {
    async fn emit(
        &self,
        room: &str,
        event: &str,
        payload: &serde_json::Value,
    ) -> Result<(), TransportError> {
        if self.failing_rooms.contains(room) {
            return Err(TransportError::Rejected {
                room: room.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        self.rooms
            .entry(room.to_string())
            .or_default()
            .push(RecordedEmission {
                room: room.to_string(),
                event: event.to_string(),
                payload: payload.clone(),
                emitted_at: Utc::now(),
            });
        Ok(())
    }
}
