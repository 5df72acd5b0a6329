mod telemetry_processing_service;

pub use telemetry_processing_service::TelemetryProcessingService;
