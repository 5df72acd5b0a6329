use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    /// Key prefix, joined with the car id: `{key_prefix}{car_id}`.
    pub key_prefix: String,
    /// Entry TTL in seconds. `None` keeps entries forever (ingestion-side
    /// policy); the consumer-side store uses a 24-hour TTL.
    pub ttl_secs: Option<u64>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            key_prefix: "car:state:".to_string(),
            ttl_secs: None,
        }
    }
}
