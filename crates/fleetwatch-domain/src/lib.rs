pub mod error;
pub mod garde_support;
pub mod history;
pub mod in_memory_car_state_store;
pub mod repository;
pub mod telemetry;
pub mod violation;

pub use error::{DomainError, DomainResult};
pub use history::HistoryRecord;
pub use in_memory_car_state_store::InMemoryCarStateStore;
pub use repository::{CarStateStore, TelemetryHistoryStore, TelemetryProducer, ViolationProducer};
pub use telemetry::{snapshot_changed, FuelType, TelemetrySnapshot, FLOAT_TOLERANCE};
pub use violation::{
    evaluate_violations, SpeedingTier, ViolationDetails, ViolationKind, ViolationRecord,
    ViolationThresholds,
};

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use repository::MockCarStateStore;
#[cfg(any(test, feature = "testing"))]
pub use repository::MockTelemetryHistoryStore;
#[cfg(any(test, feature = "testing"))]
pub use repository::MockTelemetryProducer;
#[cfg(any(test, feature = "testing"))]
pub use repository::MockViolationProducer;
