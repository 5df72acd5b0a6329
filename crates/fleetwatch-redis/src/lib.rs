mod car_state_store;
mod config;

pub use car_state_store::RedisCarStateStore;
pub use config::RedisConfig;
