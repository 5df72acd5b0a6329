use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Absolute tolerance for floating-point telemetry fields (lat/lon/fuel).
/// Absorbs sensor jitter so a stationary vehicle does not look "changed"
/// on every report.
pub const FLOAT_TOLERANCE: f64 = 1e-6;

/// Fuel type reported by the vehicle. Closed set; unknown wire values are
/// rejected at deserialization time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FuelType {
    #[serde(rename = "diesel")]
    Diesel,
    #[serde(rename = "92")]
    Ai92,
    #[serde(rename = "95")]
    Ai95,
    #[serde(rename = "98")]
    Ai98,
}

impl FuelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Diesel => "diesel",
            FuelType::Ai92 => "92",
            FuelType::Ai95 => "95",
            FuelType::Ai98 => "98",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FuelType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diesel" => Ok(FuelType::Diesel),
            "92" => Ok(FuelType::Ai92),
            "95" => Ok(FuelType::Ai95),
            "98" => Ok(FuelType::Ai98),
            other => Err(DomainError::InvalidFuelType(other.to_string())),
        }
    }
}

/// One vehicle's instantaneous state as reported by the vehicle client.
///
/// Snapshots are immutable values; every transformation in the pipeline
/// produces a new snapshot rather than mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub brand: String,
    pub model: String,
    pub year_of_manufacture: i32,
    pub odo: i64,
    pub lat: f64,
    pub lon: f64,
    pub fuel: f64,
    pub fuel_type: FuelType,
    pub speed: i32,
    pub engine_on: bool,
    pub locked: bool,
    pub activated: bool,
    pub rpm: i32,
    pub handbrake: bool,
    /// Observation timestamp supplied by the vehicle (or stamped at ingestion
    /// when the vehicle omits it). Not part of the change comparison.
    pub recorded_at: DateTime<Utc>,
}

fn floats_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < FLOAT_TOLERANCE
}

/// Semantic change predicate between the previously cached snapshot and the
/// current one. This is the pipeline's sole deduplication mechanism: it gates
/// both cache writes and violation evaluation.
///
/// `None` previous state means "first observation ever" and is always a
/// change. All fields are compared exactly except lat/lon/fuel, which use an
/// absolute tolerance of [`FLOAT_TOLERANCE`]. `recorded_at` is excluded: the
/// comparator decides state equality, not observation-clock equality.
pub fn snapshot_changed(previous: Option<&TelemetrySnapshot>, current: &TelemetrySnapshot) -> bool {
    let Some(previous) = previous else {
        return true;
    };

    previous.brand != current.brand
        || previous.model != current.model
        || previous.year_of_manufacture != current.year_of_manufacture
        || previous.odo != current.odo
        || !floats_equal(previous.lat, current.lat)
        || !floats_equal(previous.lon, current.lon)
        || !floats_equal(previous.fuel, current.fuel)
        || previous.fuel_type != current.fuel_type
        || previous.speed != current.speed
        || previous.engine_on != current.engine_on
        || previous.locked != current.locked
        || previous.activated != current.activated
        || previous.rpm != current.rpm
        || previous.handbrake != current.handbrake
}
