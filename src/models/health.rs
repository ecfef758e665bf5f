use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Latest health check of one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    pub provider: String,
    pub healthy: bool,
    pub response_time_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    pub last_checked: DateTime<Utc>,
}

impl HealthCheckResult {
    pub fn healthy(provider: impl Into<String>, response_time: Duration) -> Self {
        Self {
            provider: provider.into(),
            healthy: true,
            response_time_ms: response_time.as_millis() as u64,
            status_code: None,
            last_error: None,
            last_checked: Utc::now(),
        }
    }

    pub fn unhealthy(provider: impl Into<String>, response_time: Duration, error: String) -> Self {
        Self {
            provider: provider.into(),
            healthy: false,
            response_time_ms: response_time.as_millis() as u64,
            status_code: None,
            last_error: Some(error),
            last_checked: Utc::now(),
        }
    }

    pub fn with_status_code(mut self, status_code: Option<u16>) -> Self {
        self.status_code = status_code;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub checks: HashMap<String, HealthCheckResult>,
}
