use anyhow::Context;
use async_trait::async_trait;
use fleetwatch_domain::{CarStateStore, DomainError, DomainResult, TelemetrySnapshot};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

use crate::config::RedisConfig;

/// Redis implementation of CarStateStore.
///
/// Values are JSON snapshots under `{key_prefix}{car_id}`. The connection
/// manager multiplexes concurrent get/set calls; Redis itself serializes
/// writes per key, so callers need no extra locking. TTL policy is owned by
/// whichever component constructs the store: the ingestion side keeps entries
/// forever, the consumer side expires them after 24 hours.
pub struct RedisCarStateStore {
    connection: ConnectionManager,
    key_prefix: String,
    ttl_secs: Option<u64>,
}

impl RedisCarStateStore {
    /// Connect and ping the server; fails fast at boot when Redis is
    /// unreachable.
    pub async fn connect(config: &RedisConfig) -> anyhow::Result<Self> {
        info!(url = %config.url, prefix = %config.key_prefix, "Connecting to Redis");

        let client = redis::Client::open(config.url.as_str())
            .context("Invalid Redis URL")?;
        let mut connection = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        redis::cmd("PING")
            .query_async::<()>(&mut connection)
            .await
            .context("Redis ping failed")?;

        info!("Successfully connected to Redis");
        Ok(Self {
            connection,
            key_prefix: config.key_prefix.clone(),
            ttl_secs: config.ttl_secs,
        })
    }

    fn key(&self, car_id: &str) -> String {
        format!("{}{}", self.key_prefix, car_id)
    }
}

#[async_trait]
impl CarStateStore for RedisCarStateStore {
    async fn get(&self, car_id: &str) -> DomainResult<Option<TelemetrySnapshot>> {
        let key = self.key(car_id);
        let mut connection = self.connection.clone();

        let value: Option<String> = connection
            .get(&key)
            .await
            .context("Failed to read car state from Redis")
            .map_err(DomainError::RepositoryError)?;

        let Some(value) = value else {
            debug!(car_id = %car_id, "No cached state for car");
            return Ok(None);
        };

        let snapshot = serde_json::from_str(&value)
            .map_err(|e| DomainError::MalformedPayload(e.to_string()))?;
        Ok(Some(snapshot))
    }

    async fn set(&self, car_id: &str, snapshot: &TelemetrySnapshot) -> DomainResult<()> {
        let key = self.key(car_id);
        let value = serde_json::to_string(snapshot)
            .map_err(|e| DomainError::MalformedPayload(e.to_string()))?;
        let mut connection = self.connection.clone();

        match self.ttl_secs {
            Some(ttl) => {
                let _: () = connection
                    .set_ex(&key, value, ttl)
                    .await
                    .context("Failed to write car state to Redis")
                    .map_err(DomainError::RepositoryError)?;
            }
            None => {
                let _: () = connection
                    .set(&key, value)
                    .await
                    .context("Failed to write car state to Redis")
                    .map_err(DomainError::RepositoryError)?;
            }
        }

        debug!(car_id = %car_id, key = %key, "Car state cached");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_uses_configured_prefix() {
        let config = RedisConfig {
            key_prefix: "car:state:".to_string(),
            ..Default::default()
        };
        // Key formatting is pure; no connection needed.
        assert_eq!(format!("{}{}", config.key_prefix, "car-7"), "car:state:car-7");
    }

    #[test]
    fn test_default_config_has_no_ttl() {
        let config = RedisConfig::default();
        assert!(config.ttl_secs.is_none());
        assert_eq!(config.key_prefix, "car:state:");
    }
}
