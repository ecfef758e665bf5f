use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::{
    models::{message::ServerContext, retry::RetryConfig},
    queue::WorkerConfig,
};

/// Process configuration, read from the environment after loading `.env`.
#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_server_name")]
    pub server_name: String,
    #[serde(default)]
    pub server_url: String,

    /// Durable queue backend. The in-memory store is used when unset.
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_queue_key_prefix")]
    pub queue_key_prefix: String,

    /// Retries for queue backend writes, not for deliveries.
    #[serde(default = "default_max_retries")]
    pub max_retry_attempts: u32,
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub retry_backoff_multiplier: f64,
    #[serde(default = "default_retry_jitter")]
    pub retry_jitter: f64,

    #[serde(default = "default_poll_interval_ms")]
    pub worker_poll_interval_ms: u64,
    #[serde(default = "default_batch_size")]
    pub worker_batch_size: usize,
    #[serde(default = "default_concurrency")]
    pub worker_concurrency: usize,
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_seconds: u64,

    #[serde(default = "default_health_interval_secs")]
    pub health_check_interval_seconds: u64,
    #[serde(default = "default_completed_retention_secs")]
    pub completed_retention_seconds: u64,

    #[serde(default = "default_server_port")]
    pub server_port: u16,
}

fn default_server_name() -> String {
    "notification-core".to_string()
}

fn default_queue_key_prefix() -> String {
    "notifications:queue".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_retry_delay_ms() -> u64 {
    100
}

fn default_max_retry_delay_ms() -> u64 {
    2_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_retry_jitter() -> f64 {
    0.1
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_batch_size() -> usize {
    50
}

fn default_concurrency() -> usize {
    8
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_health_interval_secs() -> u64 {
    300
}

fn default_completed_retention_secs() -> u64 {
    86_400
}

fn default_server_port() -> u16 {
    8080
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;
        Ok(config)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retry_attempts,
            initial_delay: Duration::from_millis(self.initial_retry_delay_ms),
            max_delay: Duration::from_millis(self.max_retry_delay_ms),
            backoff_factor: self.retry_backoff_multiplier,
            jitter: self.retry_jitter,
            retry_condition: None,
        }
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            poll_interval: Duration::from_millis(self.worker_poll_interval_ms),
            batch_size: self.worker_batch_size,
            concurrency: self.worker_concurrency,
            send_timeout: Duration::from_secs(self.send_timeout_seconds),
        }
    }

    pub fn server_context(&self) -> ServerContext {
        ServerContext {
            name: self.server_name.clone(),
            url: self.server_url.clone(),
        }
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_seconds)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_seconds.max(1))
    }

    pub fn completed_retention(&self) -> Duration {
        Duration::from_secs(self.completed_retention_seconds)
    }
}
