use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::DomainResult;
use crate::repository::CarStateStore;
use crate::telemetry::TelemetrySnapshot;

/// In-memory implementation of CarStateStore using a RwLock'd HashMap.
/// Used by tests and single-process deployments without Redis.
pub struct InMemoryCarStateStore {
    states: Arc<RwLock<HashMap<String, TelemetrySnapshot>>>,
}

impl InMemoryCarStateStore {
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryCarStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CarStateStore for InMemoryCarStateStore {
    async fn get(&self, car_id: &str) -> DomainResult<Option<TelemetrySnapshot>> {
        let states = self.states.read().await;
        Ok(states.get(car_id).cloned())
    }

    async fn set(&self, car_id: &str, snapshot: &TelemetrySnapshot) -> DomainResult<()> {
        let mut states = self.states.write().await;
        states.insert(car_id.to_string(), snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::FuelType;
    use chrono::TimeZone;

    fn snapshot(speed: i32) -> TelemetrySnapshot {
        TelemetrySnapshot {
            brand: "Kia".to_string(),
            model: "Rio".to_string(),
            year_of_manufacture: 2021,
            odo: 10,
            lat: 55.0,
            lon: 37.0,
            fuel: 40.0,
            fuel_type: FuelType::Ai92,
            speed,
            engine_on: true,
            locked: false,
            activated: true,
            rpm: 2000,
            handbrake: false,
            recorded_at: chrono::Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = InMemoryCarStateStore::new();
        assert!(store.get("car-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = InMemoryCarStateStore::new();
        store.set("car-1", &snapshot(50)).await.unwrap();
        assert_eq!(store.get("car-1").await.unwrap(), Some(snapshot(50)));
    }

    #[tokio::test]
    async fn test_set_overwrites_previous_state() {
        let store = InMemoryCarStateStore::new();
        store.set("car-1", &snapshot(50)).await.unwrap();
        store.set("car-1", &snapshot(70)).await.unwrap();
        assert_eq!(store.get("car-1").await.unwrap().unwrap().speed, 70);
    }

    #[tokio::test]
    async fn test_concurrent_writers_do_not_corrupt() {
        let store = Arc::new(InMemoryCarStateStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.set(&format!("car-{}", i % 4), &snapshot(i)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        for i in 0..4 {
            assert!(store.get(&format!("car-{}", i)).await.unwrap().is_some());
        }
    }
}
