use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::telemetry::TelemetrySnapshot;

/// Append-only copy of a consumed snapshot. One record is written per
/// consumed message regardless of whether the state changed; the history
/// store is the durable system of record and is not deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub car_id: String,
    pub snapshot: TelemetrySnapshot,
    /// Broker receipt time of the message this record was produced from.
    pub received_at: DateTime<Utc>,
}
