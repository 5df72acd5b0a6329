use chrono::{DateTime, Datelike, Utc};
use fleetwatch_domain::{
    evaluate_violations, snapshot_changed, CarStateStore, DomainResult, TelemetryProducer,
    TelemetrySnapshot, ViolationProducer, ViolationThresholds,
};
use garde::Validate;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

fn valid_manufacture_year(value: &i32, _ctx: &()) -> garde::Result {
    let max_year = Utc::now().year() + 1;
    if *value < 1900 || *value > max_year {
        return Err(garde::Error::new(format!(
            "must be between 1900 and {}",
            max_year
        )));
    }
    Ok(())
}

/// Validated ingress payload for one telemetry snapshot. The car identity is
/// never part of this input; it comes from the transport layer's
/// authenticated context.
#[derive(Debug, Clone, Validate)]
pub struct IngestTelemetryInput {
    #[garde(length(min = 1, max = 64))]
    pub brand: String,
    #[garde(length(min = 1, max = 64))]
    pub model: String,
    #[garde(custom(valid_manufacture_year))]
    pub year_of_manufacture: i32,
    #[garde(range(min = 0, max = 1_000_000))]
    pub odo: i64,
    #[garde(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[garde(range(min = -180.0, max = 180.0))]
    pub lon: f64,
    #[garde(range(min = 0.0, max = 100.0))]
    pub fuel: f64,
    /// Parsed against the closed FuelType enum after field validation.
    #[garde(skip)]
    pub fuel_type: String,
    #[garde(range(min = 0, max = 300))]
    pub speed: i32,
    #[garde(skip)]
    pub engine_on: bool,
    #[garde(skip)]
    pub locked: bool,
    #[garde(skip)]
    pub activated: bool,
    #[garde(range(min = 0, max = 10_000))]
    pub rpm: i32,
    #[garde(skip)]
    pub handbrake: bool,
    /// Observation timestamp; `None` means "stamp at ingestion".
    #[garde(skip)]
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Domain service behind the ingestion endpoint.
///
/// Flow per call:
/// 1. Validate all payload fields (no side effects on failure)
/// 2. Unconditionally publish the raw snapshot to the telemetry topic
/// 3. Read the cached state for the car
/// 4. If the snapshot changed: write the cache, evaluate violation rules and
///    publish each resulting record
///
/// The call succeeds once the raw publish succeeds; a failed violation
/// publish is logged at error level but does not fail the call.
pub struct TelemetryIngestionService {
    state_store: Arc<dyn CarStateStore>,
    telemetry_producer: Arc<dyn TelemetryProducer>,
    violation_producer: Arc<dyn ViolationProducer>,
    thresholds: ViolationThresholds,
}

impl TelemetryIngestionService {
    pub fn new(
        state_store: Arc<dyn CarStateStore>,
        telemetry_producer: Arc<dyn TelemetryProducer>,
        violation_producer: Arc<dyn ViolationProducer>,
        thresholds: ViolationThresholds,
    ) -> Self {
        Self {
            state_store,
            telemetry_producer,
            violation_producer,
            thresholds,
        }
    }

    #[instrument(skip(self, input), fields(car_id = %car_id))]
    pub async fn ingest(&self, car_id: &str, input: IngestTelemetryInput) -> DomainResult<()> {
        fleetwatch_domain::garde_support::validate_struct(&input)?;
        let fuel_type = input.fuel_type.parse()?;

        let snapshot = TelemetrySnapshot {
            brand: input.brand,
            model: input.model,
            year_of_manufacture: input.year_of_manufacture,
            odo: input.odo,
            lat: input.lat,
            lon: input.lon,
            fuel: input.fuel,
            fuel_type,
            speed: input.speed,
            engine_on: input.engine_on,
            locked: input.locked,
            activated: input.activated,
            rpm: input.rpm,
            handbrake: input.handbrake,
            recorded_at: input.recorded_at.unwrap_or_else(Utc::now),
        };

        self.telemetry_producer
            .publish_telemetry(car_id, &snapshot)
            .await?;

        let previous = self.state_store.get(car_id).await?;

        if snapshot_changed(previous.as_ref(), &snapshot) {
            self.state_store.set(car_id, &snapshot).await?;

            let violations = evaluate_violations(car_id, &snapshot, &self.thresholds);
            if !violations.is_empty() {
                info!(count = violations.len(), "Violations detected");
            }
            for violation in &violations {
                // The raw snapshot is already published and acknowledged, so
                // the call does not fail here. A lost violation event has no
                // local persistence to compensate for it, hence error level.
                if let Err(e) = self.violation_producer.publish_violation(violation).await {
                    error!(
                        kind = %violation.kind,
                        error = %e,
                        "Failed to publish violation record"
                    );
                }
            }
        } else {
            debug!("Snapshot unchanged, skipping cache write and rule evaluation");
        }

        debug!("Telemetry ingested successfully");
        Ok(())
    }
}
