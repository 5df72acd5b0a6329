use crate::traits::JetStreamConsumer;
use anyhow::{Context, Result};
use async_nats::jetstream::{self, Message};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Result of processing a batch of messages.
/// Provides fine-grained control over which messages to acknowledge vs reject.
#[derive(Debug)]
pub struct ProcessingResult {
    /// Messages that were successfully handled (or deliberately skipped) and
    /// should be acknowledged (Ack)
    pub ack: Vec<usize>,
    /// Messages to reject (Nak) for redelivery, with optional error details
    pub nak: Vec<(usize, Option<String>)>,
}

impl ProcessingResult {
    /// Create a result where all messages should be acknowledged
    pub fn ack_all(count: usize) -> Self {
        Self {
            ack: (0..count).collect(),
            nak: Vec::new(),
        }
    }

    /// Create a result where all messages should be rejected
    pub fn nak_all(count: usize, error: Option<String>) -> Self {
        Self {
            ack: Vec::new(),
            nak: (0..count).map(|i| (i, error.clone())).collect(),
        }
    }

    /// Create a result with specific ack/nak indices
    pub fn new(ack: Vec<usize>, nak: Vec<(usize, Option<String>)>) -> Self {
        Self { ack, nak }
    }
}

/// Type alias for the batch processor function.
/// Takes a slice of raw NATS messages and returns a ProcessingResult.
/// The processor is responsible for deserializing and processing the messages.
pub type BatchProcessor =
    Box<dyn Fn(&[Message]) -> BoxFuture<'static, Result<ProcessingResult>> + Send + Sync>;

/// Generic NATS JetStream pull consumer driving a batch processor.
///
/// Poll cycle: fetch up to `batch_size` messages within `max_wait`, hand the
/// batch to the processor, then acknowledge per the returned
/// [`ProcessingResult`]. Acknowledgment after the whole batch is the
/// consumption checkpoint, so a crash mid-batch redelivers the entire batch.
/// An empty fetch is not an error; the loop sleeps for `idle_sleep` and polls
/// again. Broker-level fetch errors are fatal and propagate to the caller so
/// the process can shut down in an orderly way.
pub struct NatsConsumer {
    consumer: Box<dyn crate::traits::PullConsumer>,
    batch_size: usize,
    max_wait: Duration,
    idle_sleep: Duration,
    processor: BatchProcessor,
}

impl NatsConsumer {
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        jetstream: Arc<dyn JetStreamConsumer>,
        stream_name: &str,
        consumer_name: &str,
        subject_filter: &str,
        batch_size: usize,
        max_wait_secs: u64,
        idle_sleep_ms: u64,
        processor: BatchProcessor,
    ) -> Result<Self> {
        debug!(
            stream = stream_name,
            consumer = consumer_name,
            subject = subject_filter,
            "Creating JetStream consumer"
        );

        // Create or get existing durable consumer
        let consumer = jetstream
            .create_consumer(
                jetstream::consumer::pull::Config {
                    name: Some(consumer_name.to_string()),
                    durable_name: Some(consumer_name.to_string()),
                    filter_subject: subject_filter.to_string(),
                    ack_policy: jetstream::consumer::AckPolicy::Explicit,
                    ..Default::default()
                },
                stream_name,
            )
            .await
            .context("Failed to create consumer")?;

        info!(
            stream = stream_name,
            consumer = consumer_name,
            "Consumer created successfully"
        );

        Ok(Self {
            consumer,
            batch_size,
            max_wait: Duration::from_secs(max_wait_secs),
            idle_sleep: Duration::from_millis(idle_sleep_ms),
            processor,
        })
    }

    /// Run the consumer loop until cancellation. The cancellation signal is
    /// checked at the top of each cycle; an in-flight batch always finishes
    /// before the loop exits.
    pub async fn run(&self, ctx: CancellationToken) -> Result<()> {
        info!("Starting consumer loop");

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!("Received shutdown signal, stopping consumer");
                    break;
                }
                result = self.fetch_and_process_batch() => {
                    match result {
                        Ok(0) => {
                            debug!(
                                idle_sleep_ms = self.idle_sleep.as_millis(),
                                "No new messages, sleeping before next poll"
                            );
                            tokio::select! {
                                _ = ctx.cancelled() => {
                                    info!("Received shutdown signal, stopping consumer");
                                    break;
                                }
                                _ = tokio::time::sleep(self.idle_sleep) => {}
                            }
                        }
                        Ok(count) => {
                            debug!(message_count = count, "Processed message batch");
                        }
                        Err(e) => {
                            error!(error = %e, "Broker-level error while fetching batch");
                            return Err(e);
                        }
                    }
                }
            }
        }

        info!("Consumer stopped gracefully");
        Ok(())
    }

    /// Fetch one batch, process it and acknowledge. Returns the number of
    /// messages fetched (0 on poll timeout).
    async fn fetch_and_process_batch(&self) -> Result<usize> {
        debug!(
            batch_size = self.batch_size,
            max_wait_secs = self.max_wait.as_secs(),
            "Fetching message batch"
        );

        let raw_messages = self
            .consumer
            .fetch_messages(self.batch_size, self.max_wait)
            .await?;

        if raw_messages.is_empty() {
            return Ok(0);
        }

        debug!(message_count = raw_messages.len(), "Received message batch");

        // Process batch using the custom processor
        // The processor is responsible for deserialization and business logic
        let processing_result = match (self.processor)(&raw_messages).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Processor returned error, rejecting all messages");
                ProcessingResult::nak_all(raw_messages.len(), Some(e.to_string()))
            }
        };

        // Process acknowledgments
        let ack_count = processing_result.ack.len();
        for idx in processing_result.ack {
            if let Some(msg) = raw_messages.get(idx) {
                if let Err(e) = msg.ack().await {
                    error!(
                        error = %e,
                        message_index = idx,
                        "Failed to acknowledge message"
                    );
                }
            } else {
                warn!(
                    message_index = idx,
                    batch_size = raw_messages.len(),
                    "Invalid ack index in ProcessingResult"
                );
            }
        }

        if ack_count > 0 {
            debug!(ack_count, "Acknowledged messages");
        }

        // Process rejections
        for (idx, error_msg) in processing_result.nak {
            if let Some(msg) = raw_messages.get(idx) {
                if let Some(err) = &error_msg {
                    error!(
                        message_index = idx,
                        subject = %msg.subject,
                        error = %err,
                        "Rejecting message due to processing error"
                    );
                }
                if let Err(e) = msg
                    .ack_with(jetstream::AckKind::Nak(None))
                    .await
                {
                    error!(
                        error = %e,
                        message_index = idx,
                        "Failed to reject message"
                    );
                }
            } else {
                warn!(
                    message_index = idx,
                    batch_size = raw_messages.len(),
                    "Invalid nak index in ProcessingResult"
                );
            }
        }

        Ok(raw_messages.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_all_covers_every_index() {
        let result = ProcessingResult::ack_all(3);
        assert_eq!(result.ack, vec![0, 1, 2]);
        assert!(result.nak.is_empty());
    }

    #[test]
    fn test_nak_all_carries_error_details() {
        let result = ProcessingResult::nak_all(2, Some("boom".to_string()));
        assert!(result.ack.is_empty());
        assert_eq!(result.nak.len(), 2);
        assert_eq!(result.nak[0], (0, Some("boom".to_string())));
    }
}
