mod client;
mod consumer;
mod telemetry_producer;
mod traits;
mod violation_producer;

pub use client::{NatsClient, NatsJetStreamConsumer, NatsJetStreamPublisher, NatsPullConsumer};
pub use consumer::{BatchProcessor, NatsConsumer, ProcessingResult};
pub use telemetry_producer::NatsTelemetryProducer;
pub use traits::{JetStreamConsumer, JetStreamPublisher, PullConsumer};
pub use violation_producer::NatsViolationProducer;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use traits::MockJetStreamConsumer;
#[cfg(any(test, feature = "testing"))]
pub use traits::MockJetStreamPublisher;
#[cfg(any(test, feature = "testing"))]
pub use traits::MockPullConsumer;
