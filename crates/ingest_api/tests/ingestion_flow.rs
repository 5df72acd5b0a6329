use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use fleetwatch_domain::{
    DomainResult, InMemoryCarStateStore, TelemetryProducer, TelemetrySnapshot, ViolationKind,
    ViolationProducer, ViolationRecord, ViolationThresholds,
};
use ingest_api::domain::{IngestTelemetryInput, TelemetryIngestionService};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Recording producer fakes, so a test can assert on the full publish history
/// across several ingest calls.
#[derive(Default)]
struct RecordingTelemetryProducer {
    published: Mutex<Vec<(String, TelemetrySnapshot)>>,
}

#[async_trait]
impl TelemetryProducer for RecordingTelemetryProducer {
    async fn publish_telemetry(
        &self,
        car_id: &str,
        snapshot: &TelemetrySnapshot,
    ) -> DomainResult<()> {
        self.published
            .lock()
            .await
            .push((car_id.to_string(), snapshot.clone()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingViolationProducer {
    published: Mutex<Vec<ViolationRecord>>,
}

#[async_trait]
impl ViolationProducer for RecordingViolationProducer {
    async fn publish_violation(&self, record: &ViolationRecord) -> DomainResult<()> {
        self.published.lock().await.push(record.clone());
        Ok(())
    }
}

fn input(speed: i32, minute: u32) -> IngestTelemetryInput {
    IngestTelemetryInput {
        brand: "Kia".to_string(),
        model: "Rio".to_string(),
        year_of_manufacture: 2021,
        odo: 54_320,
        lat: 55.751244,
        lon: 37.618423,
        fuel: 47.5,
        fuel_type: "95".to_string(),
        speed,
        engine_on: true,
        locked: false,
        activated: true,
        rpm: 2400,
        handbrake: false,
        recorded_at: Some(Utc.with_ymd_and_hms(2025, 6, 1, 12, minute, 0).unwrap()),
    }
}

#[tokio::test]
async fn test_repeated_identical_snapshots_publish_raw_but_evaluate_once() {
    let state_store = Arc::new(InMemoryCarStateStore::new());
    let telemetry_producer = Arc::new(RecordingTelemetryProducer::default());
    let violation_producer = Arc::new(RecordingViolationProducer::default());

    let service = TelemetryIngestionService::new(
        state_store.clone(),
        telemetry_producer.clone(),
        violation_producer.clone(),
        ViolationThresholds::default(),
    );

    // Same readings three times; only the timestamp differs.
    service.ingest("car-7", input(135, 0)).await.unwrap();
    service.ingest("car-7", input(135, 1)).await.unwrap();
    service.ingest("car-7", input(135, 2)).await.unwrap();

    // Every snapshot reaches the raw topic.
    assert_eq!(telemetry_producer.published.lock().await.len(), 3);

    // Rules fired only for the first, changed observation.
    let violations = violation_producer.published.lock().await;
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::SpeedingMedium);
    assert_eq!(violations[0].car_id, "car-7");
}

#[tokio::test]
async fn test_changed_snapshot_reevaluates_rules() {
    let state_store = Arc::new(InMemoryCarStateStore::new());
    let telemetry_producer = Arc::new(RecordingTelemetryProducer::default());
    let violation_producer = Arc::new(RecordingViolationProducer::default());

    let service = TelemetryIngestionService::new(
        state_store.clone(),
        telemetry_producer.clone(),
        violation_producer.clone(),
        ViolationThresholds::default(),
    );

    service.ingest("car-7", input(135, 0)).await.unwrap();
    service.ingest("car-7", input(180, 1)).await.unwrap();

    let violations = violation_producer.published.lock().await;
    assert_eq!(violations.len(), 2);
    assert_eq!(violations[0].kind, ViolationKind::SpeedingMedium);
    assert_eq!(violations[1].kind, ViolationKind::SpeedingHigh);
}

#[tokio::test]
async fn test_cars_are_deduplicated_independently() {
    let state_store = Arc::new(InMemoryCarStateStore::new());
    let telemetry_producer = Arc::new(RecordingTelemetryProducer::default());
    let violation_producer = Arc::new(RecordingViolationProducer::default());

    let service = TelemetryIngestionService::new(
        state_store.clone(),
        telemetry_producer.clone(),
        violation_producer.clone(),
        ViolationThresholds::default(),
    );

    service.ingest("car-a", input(135, 0)).await.unwrap();
    service.ingest("car-b", input(135, 0)).await.unwrap();

    // Identical readings on distinct cars both count as changed.
    assert_eq!(violation_producer.published.lock().await.len(), 2);
}
