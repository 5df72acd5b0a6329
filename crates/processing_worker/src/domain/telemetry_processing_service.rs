use chrono::{DateTime, Utc};
use fleetwatch_domain::{
    snapshot_changed, CarStateStore, DomainResult, HistoryRecord, TelemetryHistoryStore,
    TelemetrySnapshot,
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Domain service behind the stream consumer.
///
/// Per snapshot: refresh the hot cache when the readings changed, then append
/// to history unconditionally. The cache is best effort here; a failed read
/// or write is logged and processing continues, because the history append is
/// the part with durability requirements.
pub struct TelemetryProcessingService {
    state_store: Arc<dyn CarStateStore>,
    history_store: Arc<dyn TelemetryHistoryStore>,
}

impl TelemetryProcessingService {
    pub fn new(
        state_store: Arc<dyn CarStateStore>,
        history_store: Arc<dyn TelemetryHistoryStore>,
    ) -> Self {
        Self {
            state_store,
            history_store,
        }
    }

    #[instrument(skip(self, snapshot), fields(car_id = %car_id))]
    pub async fn process(
        &self,
        car_id: &str,
        snapshot: TelemetrySnapshot,
        received_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let previous = match self.state_store.get(car_id).await {
            Ok(previous) => previous,
            Err(e) => {
                // A cache miss and a cache failure look the same downstream:
                // the snapshot counts as changed and gets written back.
                warn!(error = %e, "Cache read failed, treating snapshot as changed");
                None
            }
        };

        if snapshot_changed(previous.as_ref(), &snapshot) {
            if let Err(e) = self.state_store.set(car_id, &snapshot).await {
                warn!(error = %e, "Cache write failed, continuing with history append");
            } else {
                debug!("Cached state refreshed");
            }
        } else {
            debug!("Snapshot unchanged, cache left as is");
        }

        let record = HistoryRecord {
            car_id: car_id.to_string(),
            snapshot,
            received_at,
        };
        self.history_store.append(&record).await?;

        debug!("History record appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fleetwatch_domain::{
        DomainError, FuelType, MockCarStateStore, MockTelemetryHistoryStore,
    };

    fn test_snapshot(speed: i32) -> TelemetrySnapshot {
        TelemetrySnapshot {
            brand: "Kia".to_string(),
            model: "Rio".to_string(),
            year_of_manufacture: 2021,
            odo: 54_320,
            lat: 55.751244,
            lon: 37.618423,
            fuel: 47.5,
            fuel_type: FuelType::Ai95,
            speed,
            engine_on: true,
            locked: false,
            activated: true,
            rpm: 2400,
            handbrake: false,
            recorded_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_changed_snapshot_refreshes_cache_and_appends_history() {
        let mut state_store = MockCarStateStore::new();
        let mut history_store = MockTelemetryHistoryStore::new();

        state_store.expect_get().times(1).returning(|_| Ok(None));
        state_store
            .expect_set()
            .withf(|car_id: &str, snapshot: &TelemetrySnapshot| {
                car_id == "car-1" && snapshot.speed == 62
            })
            .times(1)
            .returning(|_, _| Ok(()));
        history_store
            .expect_append()
            .withf(|record: &HistoryRecord| record.car_id == "car-1")
            .times(1)
            .returning(|_| Ok(()));

        let service =
            TelemetryProcessingService::new(Arc::new(state_store), Arc::new(history_store));
        let result = service
            .process("car-1", test_snapshot(62), Utc::now())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_unchanged_snapshot_still_appends_history() {
        let mut state_store = MockCarStateStore::new();
        let mut history_store = MockTelemetryHistoryStore::new();

        // No expect_set: a cache write would panic.
        let cached = test_snapshot(62);
        state_store
            .expect_get()
            .times(1)
            .return_once(move |_| Ok(Some(cached)));
        history_store
            .expect_append()
            .times(1)
            .returning(|_| Ok(()));

        let service =
            TelemetryProcessingService::new(Arc::new(state_store), Arc::new(history_store));
        let result = service
            .process("car-1", test_snapshot(62), Utc::now())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_cache_read_failure_is_not_fatal() {
        let mut state_store = MockCarStateStore::new();
        let mut history_store = MockTelemetryHistoryStore::new();

        state_store.expect_get().times(1).returning(|_| {
            Err(DomainError::RepositoryError(anyhow::anyhow!(
                "cache unreachable"
            )))
        });
        state_store.expect_set().times(1).returning(|_, _| Ok(()));
        history_store
            .expect_append()
            .times(1)
            .returning(|_| Ok(()));

        let service =
            TelemetryProcessingService::new(Arc::new(state_store), Arc::new(history_store));
        let result = service
            .process("car-1", test_snapshot(62), Utc::now())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_cache_write_failure_is_not_fatal() {
        let mut state_store = MockCarStateStore::new();
        let mut history_store = MockTelemetryHistoryStore::new();

        state_store.expect_get().times(1).returning(|_| Ok(None));
        state_store.expect_set().times(1).returning(|_, _| {
            Err(DomainError::RepositoryError(anyhow::anyhow!(
                "cache unreachable"
            )))
        });
        history_store
            .expect_append()
            .times(1)
            .returning(|_| Ok(()));

        let service =
            TelemetryProcessingService::new(Arc::new(state_store), Arc::new(history_store));
        let result = service
            .process("car-1", test_snapshot(62), Utc::now())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_history_failure_propagates() {
        let mut state_store = MockCarStateStore::new();
        let mut history_store = MockTelemetryHistoryStore::new();

        state_store.expect_get().times(1).returning(|_| Ok(None));
        state_store.expect_set().times(1).returning(|_, _| Ok(()));
        history_store.expect_append().times(1).returning(|_| {
            Err(DomainError::RepositoryError(anyhow::anyhow!(
                "insert failed"
            )))
        });

        let service =
            TelemetryProcessingService::new(Arc::new(state_store), Arc::new(history_store));
        let result = service
            .process("car-1", test_snapshot(62), Utc::now())
            .await;
        assert!(matches!(result, Err(DomainError::RepositoryError(_))));
    }

    #[tokio::test]
    async fn test_redelivered_snapshot_skips_cache_but_appends_again() {
        // A redelivery of the same message must not rewrite the cache, but
        // the history table has no uniqueness and records every delivery.
        let mut state_store = MockCarStateStore::new();
        let mut history_store = MockTelemetryHistoryStore::new();

        let mut first = true;
        state_store.expect_get().times(2).returning(move |_| {
            if first {
                first = false;
                Ok(None)
            } else {
                Ok(Some(test_snapshot(62)))
            }
        });
        state_store.expect_set().times(1).returning(|_, _| Ok(()));
        history_store
            .expect_append()
            .times(2)
            .returning(|_| Ok(()));

        let service =
            TelemetryProcessingService::new(Arc::new(state_store), Arc::new(history_store));
        service
            .process("car-1", test_snapshot(62), Utc::now())
            .await
            .unwrap();
        service
            .process("car-1", test_snapshot(62), Utc::now())
            .await
            .unwrap();
    }
}
