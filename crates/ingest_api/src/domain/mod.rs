mod telemetry_ingestion_service;

pub use telemetry_ingestion_service::{IngestTelemetryInput, TelemetryIngestionService};
