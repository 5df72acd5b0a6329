mod config;
mod telemetry;

use config::ServiceConfig;
use fleetwatch_clickhouse::{ClickHouseClient, ClickHouseHistoryRepository};
use fleetwatch_domain::{CarStateStore, TelemetryHistoryStore, ViolationThresholds};
use fleetwatch_nats::{NatsClient, NatsTelemetryProducer, NatsViolationProducer};
use fleetwatch_redis::{RedisCarStateStore, RedisConfig};
use fleetwatch_runner::Runner;
use ingest_api::domain::TelemetryIngestionService;
use ingest_api::grpc::GrpcServerConfig;
use ingest_api::IngestApi;
use processing_worker::{ProcessingWorker, ProcessingWorkerConfig};
use std::sync::Arc;
use std::time::Duration;
use telemetry::init_telemetry;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&config.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting fleetwatch-all-in-one service");
    debug!("Configuration: {:?}", config);

    let nats_client = match initialize_nats(&config).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to initialize NATS: {}", e);
            std::process::exit(1);
        }
    };

    let (ingest_state_store, worker_state_store) = match initialize_redis(&config).await {
        Ok(stores) => stores,
        Err(e) => {
            error!("Failed to initialize Redis: {}", e);
            std::process::exit(1);
        }
    };

    let history_store = match initialize_clickhouse(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to initialize ClickHouse: {}", e);
            std::process::exit(1);
        }
    };

    // Producers verify their stream at boot, so a missing stream fails here
    // rather than on the first request.
    let publisher_client = nats_client.create_publisher_client();
    let telemetry_producer = match NatsTelemetryProducer::connect(
        publisher_client.clone(),
        &config.telemetry_stream,
        config.telemetry_base_subject.clone(),
    )
    .await
    {
        Ok(producer) => Arc::new(producer),
        Err(e) => {
            error!("Failed to create telemetry producer: {}", e);
            std::process::exit(1);
        }
    };
    let violation_producer = match NatsViolationProducer::connect(
        publisher_client,
        &config.violations_stream,
        config.violations_base_subject.clone(),
    )
    .await
    {
        Ok(producer) => Arc::new(producer),
        Err(e) => {
            error!("Failed to create violation producer: {}", e);
            std::process::exit(1);
        }
    };

    let thresholds = ViolationThresholds {
        speed_limit: config.speed_limit,
        drift_rpm_limit: config.drift_rpm_limit,
        low_fuel_limit: config.low_fuel_limit,
    };

    let ingestion_service = Arc::new(TelemetryIngestionService::new(
        ingest_state_store,
        telemetry_producer,
        violation_producer,
        thresholds,
    ));
    let ingest_api = IngestApi::new(
        ingestion_service,
        GrpcServerConfig {
            host: config.grpc_host.clone(),
            port: config.grpc_port,
        },
    );

    let processing_worker = match ProcessingWorker::new(
        worker_state_store,
        history_store,
        nats_client.clone(),
        ProcessingWorkerConfig {
            telemetry_stream: config.telemetry_stream.clone(),
            telemetry_subject: config.telemetry_consumer_subject.clone(),
            consumer_name: config.consumer_name.clone(),
            nats_batch_size: config.nats_batch_size,
            nats_batch_wait_secs: config.nats_batch_wait_secs,
            nats_idle_sleep_ms: config.nats_idle_sleep_ms,
        },
    )
    .await
    {
        Ok(worker) => worker,
        Err(e) => {
            error!("Failed to initialize processing worker: {}", e);
            std::process::exit(1);
        }
    };

    let runner = Runner::new()
        .with_named_process("ingest_api", ingest_api.into_runner_process())
        .with_named_process("processing_worker", processing_worker.into_runner_process())
        .with_closer({
            let nats_for_close = Arc::clone(&nats_client);
            move || async move {
                info!("Running cleanup tasks...");
                nats_for_close.close().await;
                info!("Cleanup complete");
                Ok(())
            }
        })
        .with_closer_timeout(Duration::from_secs(10));

    if let Err(e) = runner.run().await {
        error!("Service exiting with error: {:#}", e);
        std::process::exit(1);
    }
    info!("Service exiting normally");
}

async fn initialize_nats(config: &ServiceConfig) -> anyhow::Result<Arc<NatsClient>> {
    info!("Initializing NATS...");
    let client = Arc::new(
        NatsClient::connect(
            &config.nats_url,
            Duration::from_secs(config.startup_timeout_secs),
        )
        .await?,
    );
    client
        .ensure_stream(
            &config.telemetry_stream,
            &config.telemetry_base_subject,
            "Raw vehicle telemetry keyed by car id",
        )
        .await?;
    client
        .ensure_stream(
            &config.violations_stream,
            &config.violations_base_subject,
            "Detected violations keyed by violation kind",
        )
        .await?;
    Ok(client)
}

/// Two independent caches in distinct keyspaces: ingestion writes never
/// expire under `redis_key_prefix`, worker writes live under
/// `consumer_cache_key_prefix` with a TTL so a silent car eventually falls
/// out of the hot cache. Neither side sees the other's entries.
async fn initialize_redis(
    config: &ServiceConfig,
) -> anyhow::Result<(Arc<dyn CarStateStore>, Arc<dyn CarStateStore>)> {
    info!("Initializing Redis...");
    let ingest_store = RedisCarStateStore::connect(&RedisConfig {
        url: config.redis_url.clone(),
        key_prefix: config.redis_key_prefix.clone(),
        ttl_secs: None,
    })
    .await?;
    let worker_store = RedisCarStateStore::connect(&RedisConfig {
        url: config.redis_url.clone(),
        key_prefix: config.consumer_cache_key_prefix.clone(),
        ttl_secs: Some(config.consumer_cache_ttl_secs),
    })
    .await?;
    Ok((Arc::new(ingest_store), Arc::new(worker_store)))
}

async fn initialize_clickhouse(
    config: &ServiceConfig,
) -> anyhow::Result<Arc<dyn TelemetryHistoryStore>> {
    info!("Initializing ClickHouse...");
    let client = ClickHouseClient::new(
        &config.clickhouse_url,
        &config.clickhouse_database,
        &config.clickhouse_username,
        &config.clickhouse_password,
    );
    client.ping().await?;
    Ok(Arc::new(ClickHouseHistoryRepository::new(
        client,
        config.clickhouse_history_table.clone(),
    )))
}
