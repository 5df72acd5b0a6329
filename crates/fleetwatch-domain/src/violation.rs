use serde::{Deserialize, Serialize};
use std::fmt;

use crate::telemetry::TelemetrySnapshot;

/// Policy thresholds for the rule engine. Externally configured; these are
/// never hardcoded into the rules themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationThresholds {
    pub speed_limit: i32,
    pub drift_rpm_limit: i32,
    pub low_fuel_limit: f64,
}

impl Default for ViolationThresholds {
    fn default() -> Self {
        Self {
            speed_limit: 110,
            drift_rpm_limit: 5000,
            low_fuel_limit: 2.0,
        }
    }
}

/// Severity tier of a speeding violation, derived from the margin over the
/// configured limit. The partition is non-overlapping:
/// margin < 20 → low, 20..=40 → medium, > 40 → high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedingTier {
    Low,
    Medium,
    High,
}

/// Violation classification. Doubles as the broker partition key for the
/// violations topic, so the wire strings are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationKind {
    #[serde(rename = "speeding_low")]
    SpeedingLow,
    #[serde(rename = "speeding_medium")]
    SpeedingMedium,
    #[serde(rename = "speeding_high")]
    SpeedingHigh,
    #[serde(rename = "drift")]
    Drift,
    #[serde(rename = "low_fuel")]
    LowFuel,
    #[serde(rename = "unauthorized_movement")]
    UnauthorizedMovement,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::SpeedingLow => "speeding_low",
            ViolationKind::SpeedingMedium => "speeding_medium",
            ViolationKind::SpeedingHigh => "speeding_high",
            ViolationKind::Drift => "drift",
            ViolationKind::LowFuel => "low_fuel",
            ViolationKind::UnauthorizedMovement => "unauthorized_movement",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strongly-typed supporting details, one closed variant per rule. Each
/// variant carries the measured values and the configured limit that tripped
/// the rule, for downstream audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ViolationDetails {
    Speeding {
        speed: i32,
        limit: i32,
        tier: SpeedingTier,
    },
    Drift {
        rpm: i32,
        limit: i32,
        handbrake: bool,
    },
    LowFuel {
        fuel: f64,
        limit: f64,
    },
    UnauthorizedMovement {
        speed: i32,
        engine_on: bool,
        locked: bool,
        activated: bool,
    },
}

/// A detected policy breach. Immutable; created only by
/// [`evaluate_violations`] and published at most once per triggering
/// snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub kind: ViolationKind,
    pub car_id: String,
    pub snapshot: TelemetrySnapshot,
    pub details: ViolationDetails,
}

fn speeding_tier(margin: i32) -> SpeedingTier {
    if margin > 40 {
        SpeedingTier::High
    } else if margin >= 20 {
        SpeedingTier::Medium
    } else {
        SpeedingTier::Low
    }
}

fn speeding_kind(tier: SpeedingTier) -> ViolationKind {
    match tier {
        SpeedingTier::Low => ViolationKind::SpeedingLow,
        SpeedingTier::Medium => ViolationKind::SpeedingMedium,
        SpeedingTier::High => ViolationKind::SpeedingHigh,
    }
}

/// Evaluate all violation rules against one snapshot.
///
/// Rules are independent; a single snapshot may trigger several of them.
/// Returns an empty vec when the snapshot is clean.
pub fn evaluate_violations(
    car_id: &str,
    snapshot: &TelemetrySnapshot,
    thresholds: &ViolationThresholds,
) -> Vec<ViolationRecord> {
    let mut violations = Vec::new();

    if snapshot.speed > thresholds.speed_limit {
        let tier = speeding_tier(snapshot.speed - thresholds.speed_limit);
        violations.push(ViolationRecord {
            kind: speeding_kind(tier),
            car_id: car_id.to_string(),
            snapshot: snapshot.clone(),
            details: ViolationDetails::Speeding {
                speed: snapshot.speed,
                limit: thresholds.speed_limit,
                tier,
            },
        });
    }

    if snapshot.rpm > thresholds.drift_rpm_limit && snapshot.handbrake {
        violations.push(ViolationRecord {
            kind: ViolationKind::Drift,
            car_id: car_id.to_string(),
            snapshot: snapshot.clone(),
            details: ViolationDetails::Drift {
                rpm: snapshot.rpm,
                limit: thresholds.drift_rpm_limit,
                handbrake: snapshot.handbrake,
            },
        });
    }

    if snapshot.fuel < thresholds.low_fuel_limit {
        violations.push(ViolationRecord {
            kind: ViolationKind::LowFuel,
            car_id: car_id.to_string(),
            snapshot: snapshot.clone(),
            details: ViolationDetails::LowFuel {
                fuel: snapshot.fuel,
                limit: thresholds.low_fuel_limit,
            },
        });
    }

    if !snapshot.activated && !snapshot.locked && snapshot.engine_on && snapshot.speed != 0 {
        violations.push(ViolationRecord {
            kind: ViolationKind::UnauthorizedMovement,
            car_id: car_id.to_string(),
            snapshot: snapshot.clone(),
            details: ViolationDetails::UnauthorizedMovement {
                speed: snapshot.speed,
                engine_on: snapshot.engine_on,
                locked: snapshot.locked,
                activated: snapshot.activated,
            },
        });
    }

    violations
}
