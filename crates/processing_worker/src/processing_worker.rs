use crate::domain::TelemetryProcessingService;
use crate::nats::create_telemetry_processor;
use fleetwatch_domain::{CarStateStore, TelemetryHistoryStore};
use fleetwatch_nats::{NatsClient, NatsConsumer};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct ProcessingWorkerConfig {
    pub telemetry_stream: String,
    pub telemetry_subject: String,
    pub consumer_name: String,
    pub nats_batch_size: usize,
    pub nats_batch_wait_secs: u64,
    pub nats_idle_sleep_ms: u64,
}

/// Consumer side of the pipeline: drains the raw telemetry stream, refreshes
/// the hot cache and appends every snapshot to history.
pub struct ProcessingWorker {
    telemetry_consumer: NatsConsumer,
}

impl ProcessingWorker {
    pub async fn new(
        state_store: Arc<dyn CarStateStore>,
        history_store: Arc<dyn TelemetryHistoryStore>,
        nats_client: Arc<NatsClient>,
        config: ProcessingWorkerConfig,
    ) -> anyhow::Result<Self> {
        info!("Initializing processing worker module");

        let processing_service = Arc::new(TelemetryProcessingService::new(
            state_store,
            history_store,
        ));

        let processor = create_telemetry_processor(processing_service);
        let consumer_client = nats_client.create_consumer_client();
        let telemetry_consumer = NatsConsumer::new(
            consumer_client,
            &config.telemetry_stream,
            &config.consumer_name,
            &config.telemetry_subject,
            config.nats_batch_size,
            config.nats_batch_wait_secs,
            config.nats_idle_sleep_ms,
            processor,
        )
        .await?;

        info!("Processing worker initialized");

        Ok(Self { telemetry_consumer })
    }

    pub fn into_runner_process(
        self,
    ) -> impl FnOnce(
        CancellationToken,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
    > {
        let consumer = self.telemetry_consumer;
        move |ctx| Box::pin(async move { consumer.run(ctx).await })
    }
}
