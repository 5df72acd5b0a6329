use chrono::{DateTime, Utc};
use clickhouse::Row;
use fleetwatch_domain::HistoryRecord;
use serde::{Deserialize, Serialize};

/// One history row per consumed telemetry message. Columns mirror the
/// snapshot fields plus car id and broker receipt time; there is no
/// uniqueness constraint, redelivered messages simply produce more rows.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct TelemetryHistoryRow {
    pub car_id: String,
    pub brand: String,
    pub model: String,
    pub year_of_manufacture: i32,
    pub odo: i64,
    pub lat: f64,
    pub lon: f64,
    pub fuel: f64,
    pub fuel_type: String,
    pub speed: i32,
    pub engine_on: bool,
    pub locked: bool,
    pub activated: bool,
    pub rpm: i32,
    pub handbrake: bool,
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    pub recorded_at: DateTime<Utc>,
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    pub received_at: DateTime<Utc>,
}

impl From<&HistoryRecord> for TelemetryHistoryRow {
    fn from(record: &HistoryRecord) -> Self {
        let snapshot = &record.snapshot;
        Self {
            car_id: record.car_id.clone(),
            brand: snapshot.brand.clone(),
            model: snapshot.model.clone(),
            year_of_manufacture: snapshot.year_of_manufacture,
            odo: snapshot.odo,
            lat: snapshot.lat,
            lon: snapshot.lon,
            fuel: snapshot.fuel,
            fuel_type: snapshot.fuel_type.as_str().to_string(),
            speed: snapshot.speed,
            engine_on: snapshot.engine_on,
            locked: snapshot.locked,
            activated: snapshot.activated,
            rpm: snapshot.rpm,
            handbrake: snapshot.handbrake,
            recorded_at: snapshot.recorded_at,
            received_at: record.received_at,
        }
    }
}
