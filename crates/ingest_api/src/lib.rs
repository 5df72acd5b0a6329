pub mod domain;
pub mod grpc;
pub mod ingest_api;

pub use ingest_api::IngestApi;
