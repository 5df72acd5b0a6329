use crate::traits::JetStreamPublisher;
use anyhow::Context;
use async_trait::async_trait;
use fleetwatch_domain::{DomainError, DomainResult, TelemetryProducer, TelemetrySnapshot};
use std::sync::Arc;
use tracing::{debug, info};

/// NATS JetStream producer for raw telemetry snapshots.
///
/// Publishes JSON payloads to `{base_subject}.{car_id}`, so the broker keeps
/// a single vehicle's events ordered within its subject.
pub struct NatsTelemetryProducer {
    jetstream: Arc<dyn JetStreamPublisher>,
    base_subject: String,
}

impl NatsTelemetryProducer {
    /// Build the producer after verifying the target stream is reachable.
    /// Fails fast at boot when the stream does not exist.
    pub async fn connect(
        jetstream: Arc<dyn JetStreamPublisher>,
        stream_name: &str,
        base_subject: String,
    ) -> anyhow::Result<Self> {
        jetstream
            .get_stream(stream_name)
            .await
            .with_context(|| format!("telemetry stream {} not available", stream_name))?;

        info!(
            stream = %stream_name,
            base_subject = %base_subject,
            "Created NatsTelemetryProducer"
        );
        Ok(Self {
            jetstream,
            base_subject,
        })
    }
}

#[async_trait]
impl TelemetryProducer for NatsTelemetryProducer {
    async fn publish_telemetry(
        &self,
        car_id: &str,
        snapshot: &TelemetrySnapshot,
    ) -> DomainResult<()> {
        let payload = serde_json::to_vec(snapshot)
            .map_err(|e| DomainError::MalformedPayload(e.to_string()))?;

        let subject = format!("{}.{}", self.base_subject, car_id);

        debug!(
            subject = %subject,
            car_id = %car_id,
            size_bytes = payload.len(),
            "Publishing telemetry snapshot"
        );

        self.jetstream
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish and acknowledge telemetry message")
            .map_err(DomainError::RepositoryError)?;

        debug!(subject = %subject, "Telemetry snapshot published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockJetStreamPublisher;
    use bytes::Bytes;
    use chrono::TimeZone;
    use fleetwatch_domain::FuelType;

    fn snapshot() -> TelemetrySnapshot {
        TelemetrySnapshot {
            brand: "Kia".to_string(),
            model: "Rio".to_string(),
            year_of_manufacture: 2021,
            odo: 100,
            lat: 55.0,
            lon: 37.0,
            fuel: 40.0,
            fuel_type: FuelType::Ai95,
            speed: 60,
            engine_on: true,
            locked: false,
            activated: true,
            rpm: 2000,
            handbrake: false,
            recorded_at: chrono::Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_connect_verifies_stream() {
        let mut mock = MockJetStreamPublisher::new();
        mock.expect_get_stream()
            .withf(|name: &str| name == "TELEMETRY")
            .times(1)
            .returning(|_| Ok(()));

        let producer =
            NatsTelemetryProducer::connect(Arc::new(mock), "TELEMETRY", "telemetry.raw".to_string())
                .await;
        assert!(producer.is_ok());
    }

    #[tokio::test]
    async fn test_connect_fails_fast_when_stream_missing() {
        let mut mock = MockJetStreamPublisher::new();
        mock.expect_get_stream()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("stream not found")));

        let producer =
            NatsTelemetryProducer::connect(Arc::new(mock), "TELEMETRY", "telemetry.raw".to_string())
                .await;
        assert!(producer.is_err());
    }

    #[tokio::test]
    async fn test_publish_keys_subject_by_car_id() {
        let mut mock = MockJetStreamPublisher::new();
        mock.expect_get_stream().returning(|_| Ok(()));
        mock.expect_publish()
            .withf(|subject: &String, payload: &Bytes| {
                subject == "telemetry.raw.car-42" && !payload.is_empty()
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let producer =
            NatsTelemetryProducer::connect(Arc::new(mock), "TELEMETRY", "telemetry.raw".to_string())
                .await
                .unwrap();

        let result = producer.publish_telemetry("car-42", &snapshot()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_publish_failure_maps_to_repository_error() {
        let mut mock = MockJetStreamPublisher::new();
        mock.expect_get_stream().returning(|_| Ok(()));
        mock.expect_publish()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("NATS publish failed")));

        let producer =
            NatsTelemetryProducer::connect(Arc::new(mock), "TELEMETRY", "telemetry.raw".to_string())
                .await
                .unwrap();

        let result = producer.publish_telemetry("car-42", &snapshot()).await;
        assert!(matches!(result, Err(DomainError::RepositoryError(_))));
    }
}
