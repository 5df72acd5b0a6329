pub mod domain;
pub mod nats;
pub mod processing_worker;

pub use processing_worker::{ProcessingWorker, ProcessingWorkerConfig};
