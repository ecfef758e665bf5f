use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::error::NotificationError;

/// Decides whether a delivery error is worth another attempt.
pub type RetryCondition = Arc<dyn Fn(&NotificationError) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    /// Fraction of the delay applied as random jitter in both directions. `0.0` disables it.
    pub jitter: f64,
    pub retry_condition: Option<RetryCondition>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
            jitter: 0.0,
            retry_condition: None,
        }
    }
}

impl Debug for RetryConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RetryConfig")
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_factor", &self.backoff_factor)
            .field("jitter", &self.jitter)
            .field("retry_condition", &self.retry_condition.is_some())
            .finish()
    }
}

impl RetryConfig {
    pub fn with_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&NotificationError) -> bool + Send + Sync + 'static,
    {
        self.retry_condition = Some(Arc::new(condition));
        self
    }

    /// Only retries errors the provider marked retryable, see [`NotificationError::is_retryable`].
    pub fn honour_error_hints(self) -> Self {
        self.with_condition(|err| err.is_retryable())
    }

    /// Without a condition every error is retried until `max_retries` is used up.
    pub fn is_retryable(&self, error: &NotificationError) -> bool {
        match &self.retry_condition {
            Some(condition) => condition(error),
            None => true,
        }
    }

    /// Delay before the next attempt after `attempts` failures:
    /// `initial_delay * backoff_factor^(attempts - 1)`, capped at `max_delay`.
    pub fn backoff_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        let delay = Duration::try_from_secs_f64(secs).unwrap_or(self.max_delay);
        delay.min(self.max_delay)
    }
}

/// Serializable per-notification override of a provider's retry defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryOverride {
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub initial_delay_ms: Option<u64>,
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
    #[serde(default)]
    pub backoff_factor: Option<f64>,
}

impl RetryOverride {
    /// Applies the overridden fields on top of `base`, keeping its retry condition.
    pub fn apply(&self, base: &RetryConfig) -> RetryConfig {
        let mut config = base.clone();
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(initial_delay_ms) = self.initial_delay_ms {
            config.initial_delay = Duration::from_millis(initial_delay_ms);
        }
        if let Some(max_delay_ms) = self.max_delay_ms {
            config.max_delay = Duration::from_millis(max_delay_ms);
        }
        if let Some(backoff_factor) = self.backoff_factor {
            config.backoff_factor = backoff_factor;
        }
        config
    }
}
