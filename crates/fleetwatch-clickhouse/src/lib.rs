mod client;
mod config;
mod history_repository;
mod models;

pub use client::ClickHouseClient;
pub use config::ClickHouseConfig;
pub use history_repository::ClickHouseHistoryRepository;
pub use models::TelemetryHistoryRow;
