use crate::domain::TelemetryIngestionService;
use crate::grpc::{run_ingest_grpc_server, GrpcServerConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Ingress module: owns the gRPC surface and the ingestion domain service.
pub struct IngestApi {
    ingestion_service: Arc<TelemetryIngestionService>,
    config: GrpcServerConfig,
}

impl IngestApi {
    pub fn new(ingestion_service: Arc<TelemetryIngestionService>, config: GrpcServerConfig) -> Self {
        debug!("Initializing ingest API module");
        Self {
            ingestion_service,
            config,
        }
    }

    pub fn into_runner_process(
        self,
    ) -> impl FnOnce(
        CancellationToken,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
    > {
        move |ctx| {
            Box::pin(async move {
                run_ingest_grpc_server(self.config, self.ingestion_service, ctx).await
            })
        }
    }
}
