mod error;
mod server;
mod telemetry_handler;

pub use error::domain_error_to_status;
pub use server::{run_ingest_grpc_server, GrpcServerConfig};
pub use telemetry_handler::TelemetryServiceHandler;
