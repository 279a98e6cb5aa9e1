use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::config::DeliveryConfig;
use crate::error::{DeliveryError, Result, ValidationError};
use crate::transport::{RealtimeTransport, TransportError};

use super::{Target, TargetParseError};

/// Batches up to this size are awaited sequentially; larger batches fan out
/// with bounded concurrency.
const SEQUENTIAL_BATCH_MAX: usize = 3;

/// One entry of a typed batch emission.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub target: Target,
    pub event: String,
    pub data: serde_json::Value,
}

/// One entry of an ad-hoc batch emission, addressed by the `type:id` grammar.
#[derive(Debug, Clone)]
pub struct RawBatchEntry {
    pub target: String,
    pub event: String,
    pub data: serde_json::Value,
}

/// Why a batch entry was skipped instead of delivered.
#[derive(Debug)]
pub enum SkipReason {
    /// The `type:id` string did not parse (raw batches only).
    MalformedTarget(TargetParseError),
    /// The target failed validation (non-positive id, empty event name).
    Invalid(ValidationError),
    /// The transport rejected the emission.
    Transport(TransportError),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MalformedTarget(e) => write!(f, "{e}"),
            SkipReason::Invalid(e) => write!(f, "{e}"),
            SkipReason::Transport(e) => write!(f, "{e}"),
        }
    }
}

/// Outcome of one batch entry.
#[derive(Debug)]
pub enum EmitOutcome {
    Delivered,
    Skipped(SkipReason),
}

impl EmitOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, EmitOutcome::Delivered)
    }
}

/// Outcome of one batch entry, keyed by the target as the caller wrote it.
#[derive(Debug)]
pub struct EntryOutcome {
    pub target: String,
    pub outcome: EmitOutcome,
}

/// Aggregated result of one batch emission. A batch call never fails as a
/// whole; this report is the only place per-entry failures surface.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub entries: Vec<EntryOutcome>,
}

impl BatchReport {
    pub fn delivered(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.is_delivered())
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.entries.len() - self.delivered()
    }

    pub fn all_delivered(&self) -> bool {
        self.skipped() == 0
    }
}

/// Counters for the delivery service.
#[derive(Debug, Default)]
struct DeliveryStats {
    /// Emissions that reached the transport and succeeded.
    emitted: AtomicU64,
    /// Emissions the transport rejected.
    failed: AtomicU64,
    /// Single-emit calls rejected before any transport call.
    rejected: AtomicU64,
    /// Batch calls processed.
    batches: AtomicU64,
    /// Batch entries skipped (malformed, invalid, or transport-rejected).
    batch_skipped: AtomicU64,
}

/// Snapshot of delivery statistics.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryStatsSnapshot {
    pub emitted: u64,
    pub failed: u64,
    pub rejected: u64,
    pub batches: u64,
    pub batch_skipped: u64,
}

/// Pushes events to logical recipient groups over the realtime transport.
///
/// Single-target emits validate first and return a typed error on malformed
/// input with zero transport calls. [`DeliveryService::emit_batch`] and
/// [`DeliveryService::emit_batch_raw`] instead attempt every entry and
/// isolate every failure, so one bad recipient can never suppress
/// notification to the rest.
pub struct DeliveryService {
    transport: Arc<dyn RealtimeTransport>,
    config: DeliveryConfig,
    stats: DeliveryStats,
}

impl DeliveryService {
    pub fn new(transport: Arc<dyn RealtimeTransport>) -> Self {
        Self::with_config(transport, DeliveryConfig::default())
    }

    pub fn with_config(transport: Arc<dyn RealtimeTransport>, config: DeliveryConfig) -> Self {
        Self {
            transport,
            config,
            stats: DeliveryStats::default(),
        }
    }

    pub fn stats(&self) -> DeliveryStatsSnapshot {
        DeliveryStatsSnapshot {
            emitted: self.stats.emitted.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
            batches: self.stats.batches.load(Ordering::Relaxed),
            batch_skipped: self.stats.batch_skipped.load(Ordering::Relaxed),
        }
    }

    /// Emit to a single user's room.
    pub async fn emit_to_user(
        &self,
        user_id: i64,
        event: &str,
        data: &serde_json::Value,
    ) -> Result<()> {
        self.emit(&Target::User(user_id), event, data).await
    }

    /// Emit to everyone in an academy's room.
    pub async fn emit_to_academy(
        &self,
        academy_id: i64,
        event: &str,
        data: &serde_json::Value,
    ) -> Result<()> {
        self.emit(&Target::Academy(academy_id), event, data).await
    }

    /// Emit to everyone in a class's room.
    pub async fn emit_to_class(
        &self,
        class_id: i64,
        event: &str,
        data: &serde_json::Value,
    ) -> Result<()> {
        self.emit(&Target::Class(class_id), event, data).await
    }

    /// Emit to everyone holding a role.
    pub async fn emit_to_role(
        &self,
        role: crate::domain::Role,
        event: &str,
        data: &serde_json::Value,
    ) -> Result<()> {
        self.emit(&Target::Role(role), event, data).await
    }

    /// Emit one event to one target.
    ///
    /// Validation failures are the caller's bug: they return before any
    /// transport call. Transport failures are awaited and returned to the
    /// caller; the batch loop is the caller that logs and continues.
    #[tracing::instrument(
        name = "delivery.emit",
        skip(self, data),
        fields(recipient = %target, event = %event)
    )]
    pub async fn emit(
        &self,
        target: &Target,
        event: &str,
        data: &serde_json::Value,
    ) -> Result<()> {
        if let Err(e) = self.validate(target, event) {
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(recipient = %target, event = %event, error = %e, "Rejected emit");
            return Err(DeliveryError::Validation(e));
        }

        let room = target.room_key();
        let started = Instant::now();
        let result = self.transport.emit(&room, event, data).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                self.stats.emitted.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    room = %room,
                    event = %event,
                    elapsed_ms = elapsed_ms,
                    "Emitted event"
                );
                Ok(())
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    room = %room,
                    event = %event,
                    elapsed_ms = elapsed_ms,
                    error = %e,
                    "Emission failed"
                );
                Err(DeliveryError::Transport(e))
            }
        }
    }

    /// Emit a batch of typed entries, attempting every one.
    ///
    /// Small batches are awaited sequentially, matching the common fan-out of
    /// a handful of recipients; larger batches fan out with concurrency
    /// bounded by [`DeliveryConfig::max_concurrent_emits`]. Entries share no
    /// mutable state, and no ordering is promised to clients either way.
    #[tracing::instrument(name = "delivery.emit_batch", skip(self, entries), fields(entry_count = entries.len()))]
    pub async fn emit_batch(&self, entries: &[BatchEntry]) -> BatchReport {
        self.stats.batches.fetch_add(1, Ordering::Relaxed);

        let outcomes = if entries.len() <= SEQUENTIAL_BATCH_MAX {
            let mut outcomes = Vec::with_capacity(entries.len());
            for entry in entries {
                outcomes.push(self.attempt_entry(entry).await);
            }
            outcomes
        } else {
            let concurrency = self.config.max_concurrent_emits.max(1);
            // Boxed so the higher-ranked closure type does not leak into the
            // async fn's future and break `Send` inference in callers
            // (rust-lang/rust#102211).
            let collect: futures::future::BoxFuture<'_, Vec<(usize, EntryOutcome)>> = Box::pin(
                stream::iter(entries.iter().enumerate())
                    .map(|(idx, entry)| async move { (idx, self.attempt_entry(entry).await) })
                    .buffer_unordered(concurrency)
                    .collect(),
            );
            let mut indexed: Vec<(usize, EntryOutcome)> = collect.await;
            indexed.sort_by_key(|(idx, _)| *idx);
            indexed.into_iter().map(|(_, outcome)| outcome).collect()
        };

        let report = BatchReport { entries: outcomes };
        self.stats
            .batch_skipped
            .fetch_add(report.skipped() as u64, Ordering::Relaxed);
        tracing::debug!(
            delivered = report.delivered(),
            skipped = report.skipped(),
            "Batch emission finished"
        );
        report
    }

    /// Emit a batch addressed by `type:id` strings.
    ///
    /// A malformed target, unknown type, or non-numeric id logs and skips
    /// that entry only; the call itself never fails.
    #[tracing::instrument(name = "delivery.emit_batch_raw", skip(self, entries), fields(entry_count = entries.len()))]
    pub async fn emit_batch_raw(&self, entries: &[RawBatchEntry]) -> BatchReport {
        let mut outcomes = Vec::with_capacity(entries.len());
        let mut parsed = Vec::with_capacity(entries.len());

        for entry in entries {
            match Target::from_str(&entry.target) {
                Ok(target) => parsed.push(BatchEntry {
                    target,
                    event: entry.event.clone(),
                    data: entry.data.clone(),
                }),
                Err(e) => {
                    tracing::warn!(recipient = %entry.target, error = %e, "Skipping malformed batch target");
                    self.stats.batch_skipped.fetch_add(1, Ordering::Relaxed);
                    outcomes.push(EntryOutcome {
                        target: entry.target.clone(),
                        outcome: EmitOutcome::Skipped(SkipReason::MalformedTarget(e)),
                    });
                }
            }
        }

        let report = self.emit_batch(&parsed).await;
        outcomes.extend(report.entries);
        BatchReport { entries: outcomes }
    }

    async fn attempt_entry(&self, entry: &BatchEntry) -> EntryOutcome {
        let target = entry.target.room_key();
        let outcome = match self.emit(&entry.target, &entry.event, &entry.data).await {
            Ok(()) => EmitOutcome::Delivered,
            Err(DeliveryError::Validation(e)) => EmitOutcome::Skipped(SkipReason::Invalid(e)),
            Err(DeliveryError::Transport(e)) => EmitOutcome::Skipped(SkipReason::Transport(e)),
        };
        EntryOutcome { target, outcome }
    }

    fn validate(&self, target: &Target, event: &str) -> std::result::Result<(), ValidationError> {
        target.validate()?;
        if event.is_empty() {
            return Err(ValidationError::EmptyEventName);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::transport::MemoryTransport;
    use serde_json::json;

    fn service() -> (Arc<MemoryTransport>, DeliveryService) {
        let transport = Arc::new(MemoryTransport::new());
        let service = DeliveryService::new(transport.clone());
        (transport, service)
    }

    #[tokio::test]
    async fn test_emit_to_user_reaches_user_room() {
        let (transport, service) = service();
        service
            .emit_to_user(8, "update_required", &json!({"k": "v"}))
            .await
            .expect("emit");

        let emissions = transport.emissions("user:8");
        assert_eq!(emissions.len(), 1);
        assert_eq!(emissions[0].event, "update_required");
        assert_eq!(service.stats().emitted, 1);
    }

    #[tokio::test]
    async fn test_invalid_id_rejected_with_zero_transport_calls() {
        let (transport, service) = service();
        let err = service
            .emit_to_user(0, "x", &json!({}))
            .await
            .expect_err("must reject");
        assert!(err.is_validation());
        assert_eq!(transport.total_emissions(), 0);
        assert_eq!(service.stats().rejected, 1);
        assert_eq!(service.stats().emitted, 0);
    }

    #[tokio::test]
    async fn test_empty_event_rejected_with_zero_transport_calls() {
        let (transport, service) = service();
        let err = service
            .emit_to_user(5, "", &json!({}))
            .await
            .expect_err("must reject");
        assert!(err.is_validation());
        assert_eq!(transport.total_emissions(), 0);
    }

    #[tokio::test]
    async fn test_role_academy_class_rooms() {
        let (transport, service) = service();
        service
            .emit_to_role(Role::Student, "e", &json!({}))
            .await
            .expect("emit");
        service.emit_to_academy(5, "e", &json!({})).await.expect("emit");
        service.emit_to_class(20, "e", &json!({})).await.expect("emit");

        assert_eq!(transport.emissions("role:STUDENT").len(), 1);
        assert_eq!(transport.emissions("academy:5").len(), 1);
        assert_eq!(transport.emissions("class:20").len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates_from_single_emit() {
        let (transport, service) = service();
        transport.fail_room("user:8");

        let err = service
            .emit_to_user(8, "e", &json!({}))
            .await
            .expect_err("must fail");
        assert!(!err.is_validation());
        assert_eq!(service.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_batch_raw_skips_malformed_and_delivers_rest() {
        let (transport, service) = service();
        let report = service
            .emit_batch_raw(&[
                RawBatchEntry {
                    target: "bogus".to_string(),
                    event: "e".to_string(),
                    data: json!({}),
                },
                RawBatchEntry {
                    target: "user:8".to_string(),
                    event: "e".to_string(),
                    data: json!({}),
                },
            ])
            .await;

        assert_eq!(report.delivered(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(transport.emissions("user:8").len(), 1);
        assert!(matches!(
            report.entries[0].outcome,
            EmitOutcome::Skipped(SkipReason::MalformedTarget(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_never_fails_even_when_all_entries_are_bad() {
        let (transport, service) = service();
        let report = service
            .emit_batch_raw(&[
                RawBatchEntry {
                    target: "bogus".to_string(),
                    event: "e".to_string(),
                    data: json!({}),
                },
                RawBatchEntry {
                    target: "group:1".to_string(),
                    event: "e".to_string(),
                    data: json!({}),
                },
                RawBatchEntry {
                    target: "user:eight".to_string(),
                    event: "e".to_string(),
                    data: json!({}),
                },
            ])
            .await;

        assert_eq!(report.delivered(), 0);
        assert_eq!(report.skipped(), 3);
        assert_eq!(transport.total_emissions(), 0);
    }

    #[tokio::test]
    async fn test_batch_isolates_transport_failure_per_entry() {
        let (transport, service) = service();
        transport.fail_room("user:2");

        let entries: Vec<BatchEntry> = [1, 2, 3]
            .iter()
            .map(|id| BatchEntry {
                target: Target::User(*id),
                event: "e".to_string(),
                data: json!({}),
            })
            .collect();
        let report = service.emit_batch(&entries).await;

        assert_eq!(report.delivered(), 2);
        assert_eq!(report.skipped(), 1);
        assert_eq!(transport.emissions("user:1").len(), 1);
        assert_eq!(transport.emissions("user:3").len(), 1);
    }

    #[tokio::test]
    async fn test_large_batch_fans_out_and_keeps_report_order() {
        let (transport, service) = service();
        let entries: Vec<BatchEntry> = (1..=10)
            .map(|id| BatchEntry {
                target: Target::User(id),
                event: "e".to_string(),
                data: json!({}),
            })
            .collect();
        let report = service.emit_batch(&entries).await;

        assert_eq!(report.delivered(), 10);
        assert_eq!(transport.total_emissions(), 10);
        let targets: Vec<&str> = report.entries.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets[0], "user:1");
        assert_eq!(targets[9], "user:10");
    }

    #[tokio::test]
    async fn test_batch_skips_invalid_target_without_transport_call() {
        let (transport, service) = service();
        let report = service
            .emit_batch(&[
                BatchEntry {
                    target: Target::User(0),
                    event: "e".to_string(),
                    data: json!({}),
                },
                BatchEntry {
                    target: Target::User(8),
                    event: "e".to_string(),
                    data: json!({}),
                },
            ])
            .await;

        assert_eq!(report.delivered(), 1);
        assert!(matches!(
            report.entries[0].outcome,
            EmitOutcome::Skipped(SkipReason::Invalid(_))
        ));
        assert_eq!(transport.total_emissions(), 1);
    }
}
