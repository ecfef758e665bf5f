pub mod health;
pub mod redis;

pub use health::{HealthChecker, HealthTarget};
pub use self::redis::RedisQueueStore;
