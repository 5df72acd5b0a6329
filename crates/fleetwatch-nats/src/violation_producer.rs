use crate::traits::JetStreamPublisher;
use anyhow::Context;
use async_trait::async_trait;
use fleetwatch_domain::{DomainError, DomainResult, ViolationProducer, ViolationRecord};
use std::sync::Arc;
use tracing::{debug, info};

/// NATS JetStream producer for violation records.
///
/// Publishes JSON payloads to `{base_subject}.{kind}`: violations of one kind
/// share an ordering domain across all vehicles, a deliberate choice carried
/// over from the original pipeline.
pub struct NatsViolationProducer {
    jetstream: Arc<dyn JetStreamPublisher>,
    base_subject: String,
}

impl NatsViolationProducer {
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
            .with_context(|| format!("violations stream {} not available", stream_name))?;

        info!(
            stream = %stream_name,
            base_subject = %base_subject,
            "Created NatsViolationProducer"
        );
        Ok(Self {
            jetstream,
            base_subject,
        })
    }
}

#[async_trait]
impl ViolationProducer for NatsViolationProducer {
    async fn publish_violation(&self, record: &ViolationRecord) -> DomainResult<()> {
        let payload = serde_json::to_vec(record)
            .map_err(|e| DomainError::MalformedPayload(e.to_string()))?;

        let subject = format!("{}.{}", self.base_subject, record.kind.as_str());

        debug!(
            subject = %subject,
            car_id = %record.car_id,
            kind = %record.kind,
            "Publishing violation record"
        );

        self.jetstream
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish and acknowledge violation message")
            .map_err(DomainError::RepositoryError)?;

        debug!(subject = %subject, "Violation record published");
        Ok(())
    }
}
