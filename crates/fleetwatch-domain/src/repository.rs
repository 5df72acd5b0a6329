use async_trait::async_trait;

use crate::error::DomainResult;
use crate::history::HistoryRecord;
use crate::telemetry::TelemetrySnapshot;
use crate::violation::ViolationRecord;

/// Keyed store holding the most recently observed snapshot per vehicle.
///
/// Implementations own their locking: concurrent `get`/`set` for different
/// calls must be safe. An absent entry means "first observation ever" and is
/// always treated as a change by the comparator.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CarStateStore: Send + Sync {
    async fn get(&self, car_id: &str) -> DomainResult<Option<TelemetrySnapshot>>;

    async fn set(&self, car_id: &str, snapshot: &TelemetrySnapshot) -> DomainResult<()>;
}

/// Publisher for raw telemetry snapshots, keyed by car id so a single
/// vehicle's events stay ordered within the broker's partitioning scheme.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TelemetryProducer: Send + Sync {
    async fn publish_telemetry(
        &self,
        car_id: &str,
        snapshot: &TelemetrySnapshot,
    ) -> DomainResult<()>;
}

/// Publisher for violation records, keyed by violation kind. All violations
/// of one kind share an ordering domain across vehicles; per-car ordering of
/// violations is deliberately not guaranteed.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ViolationProducer: Send + Sync {
    async fn publish_violation(&self, record: &ViolationRecord) -> DomainResult<()>;
}

/// Append-only persistence sink for consumed snapshots. No upsert, no dedup
/// key; duplicate rows after redelivery are acceptable.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TelemetryHistoryStore: Send + Sync {
    async fn append(&self, record: &HistoryRecord) -> DomainResult<()>;
}
