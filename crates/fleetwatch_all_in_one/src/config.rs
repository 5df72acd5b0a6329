use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // NATS configuration
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// JetStream stream name for raw telemetry
    #[serde(default = "default_telemetry_stream")]
    pub telemetry_stream: String,

    /// Base subject for raw telemetry; the car id is appended per message
    #[serde(default = "default_telemetry_base_subject")]
    pub telemetry_base_subject: String,

    /// Subject pattern for the consumer filter
    #[serde(default = "default_telemetry_consumer_subject")]
    pub telemetry_consumer_subject: String,

    /// JetStream stream name for violation records
    #[serde(default = "default_violations_stream")]
    pub violations_stream: String,

    /// Base subject for violations; the violation kind is appended per message
    #[serde(default = "default_violations_base_subject")]
    pub violations_base_subject: String,

    /// Durable consumer name for the processing worker
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,

    /// Batch size for the telemetry consumer
    #[serde(default = "default_nats_batch_size")]
    pub nats_batch_size: usize,

    /// Max wait time per batch fetch in seconds
    #[serde(default = "default_nats_batch_wait_secs")]
    pub nats_batch_wait_secs: u64,

    /// Sleep between empty fetches in milliseconds
    #[serde(default = "default_nats_idle_sleep_ms")]
    pub nats_idle_sleep_ms: u64,

    /// Startup timeout for initialization operations in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    // Redis configuration
    /// Redis URL for the car state cache
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Key prefix for the ingestion-side cache
    #[serde(default = "default_redis_key_prefix")]
    pub redis_key_prefix: String,

    /// Key prefix for the consumer-side cache. Must differ from the
    /// ingestion prefix: the two caches carry independent expiry policies
    /// and must not see each other's writes.
    #[serde(default = "default_consumer_cache_key_prefix")]
    pub consumer_cache_key_prefix: String,

    /// TTL in seconds for cache entries written by the processing worker.
    /// Entries written at ingestion time never expire.
    #[serde(default = "default_consumer_cache_ttl_secs")]
    pub consumer_cache_ttl_secs: u64,

    // ClickHouse configuration
    /// ClickHouse HTTP URL
    #[serde(default = "default_clickhouse_url")]
    pub clickhouse_url: String,

    /// ClickHouse database name
    #[serde(default = "default_clickhouse_database")]
    pub clickhouse_database: String,

    /// ClickHouse username
    #[serde(default = "default_clickhouse_username")]
    pub clickhouse_username: String,

    /// ClickHouse password
    #[serde(default = "default_clickhouse_password")]
    pub clickhouse_password: String,

    /// ClickHouse table for telemetry history
    #[serde(default = "default_clickhouse_history_table")]
    pub clickhouse_history_table: String,

    // gRPC configuration
    /// gRPC server host
    #[serde(default = "default_grpc_host")]
    pub grpc_host: String,

    /// gRPC server port
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,

    // Violation rule thresholds
    /// Speed limit in km/h
    #[serde(default = "default_speed_limit")]
    pub speed_limit: i32,

    /// RPM ceiling for drift detection
    #[serde(default = "default_drift_rpm_limit")]
    pub drift_rpm_limit: i32,

    /// Fuel level below which a low fuel violation fires
    #[serde(default = "default_low_fuel_limit")]
    pub low_fuel_limit: f64,
}

fn default_log_level() -> String {
    "info".to_string()
}

// NATS defaults
fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_telemetry_stream() -> String {
    "TELEMETRY".to_string()
}

fn default_telemetry_base_subject() -> String {
    "telemetry.raw".to_string()
}

fn default_telemetry_consumer_subject() -> String {
    "telemetry.raw.>".to_string()
}

fn default_violations_stream() -> String {
    "VIOLATIONS".to_string()
}

fn default_violations_base_subject() -> String {
    "telemetry.violations".to_string()
}

fn default_consumer_name() -> String {
    "fleetwatch-processing-worker".to_string()
}

fn default_nats_batch_size() -> usize {
    1
}

fn default_nats_batch_wait_secs() -> u64 {
    15
}

fn default_nats_idle_sleep_ms() -> u64 {
    500
}

fn default_startup_timeout_secs() -> u64 {
    30
}

// Redis defaults
fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_key_prefix() -> String {
    "car:state:".to_string()
}

fn default_consumer_cache_key_prefix() -> String {
    "car:current:".to_string()
}

fn default_consumer_cache_ttl_secs() -> u64 {
    86_400
}

// ClickHouse defaults
fn default_clickhouse_url() -> String {
    "http://localhost:8123".to_string()
}

fn default_clickhouse_database() -> String {
    "fleetwatch".to_string()
}

fn default_clickhouse_username() -> String {
    "fleetwatch".to_string()
}

fn default_clickhouse_password() -> String {
    "fleetwatch".to_string()
}

fn default_clickhouse_history_table() -> String {
    "telemetry_history".to_string()
}

// gRPC defaults
fn default_grpc_host() -> String {
    "0.0.0.0".to_string()
}

fn default_grpc_port() -> u16 {
    50051
}

// Rule threshold defaults
fn default_speed_limit() -> i32 {
    110
}

fn default_drift_rpm_limit() -> i32 {
    5000
}

fn default_low_fuel_limit() -> f64 {
    2.0
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("FLEETWATCH"))
            .build()?
            .try_deserialize()
    }
}
