use std::{collections::HashMap, sync::Arc, time::{Duration, Instant}};

use chrono::Utc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    models::{
        health::{HealthCheckResult, HealthReport, HealthStatus},
        provider::Settings,
    },
    providers::{DeliveryContext, Provider},
};

/// A provider together with the settings it should be checked with.
#[derive(Clone)]
pub struct HealthTarget {
    pub provider: Arc<dyn Provider>,
    pub settings: Settings,
}

/// Checks providers with `test_connection` and remembers the latest result per provider name.
#[derive(Clone, Default)]
pub struct HealthChecker {
    results: Arc<RwLock<HashMap<String, HealthCheckResult>>>,
}

impl HealthChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn check_health(
        &self,
        ctx: &DeliveryContext,
        provider: &dyn Provider,
        settings: &Settings,
    ) -> HealthCheckResult {
        let start = Instant::now();
        let outcome = ctx
            .run("test_connection", provider.test_connection(ctx, settings))
            .await;
        let elapsed = start.elapsed();

        let result = match outcome {
            Ok(()) => {
                debug!(
                    provider = provider.name(),
                    response_time_ms = elapsed.as_millis() as u64,
                    "Provider health check passed"
                );
                HealthCheckResult::healthy(provider.name(), elapsed)
            }
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "Provider health check failed");
                HealthCheckResult::unhealthy(provider.name(), elapsed, e.to_string())
                    .with_status_code(e.status_code())
            }
        };

        self.results
            .write()
            .await
            .insert(result.provider.clone(), result.clone());

        result
    }

    /// Latest result per provider name. Entries are replaced, never expired.
    pub async fn get_health_status(&self) -> HashMap<String, HealthCheckResult> {
        self.results.read().await.clone()
    }

    pub async fn overall_status(&self) -> HealthStatus {
        let results = self.results.read().await;
        determine_overall_status(&results)
    }

    pub async fn report(&self) -> HealthReport {
        let checks = self.get_health_status().await;
        HealthReport {
            status: determine_overall_status(&checks),
            timestamp: Utc::now(),
            checks,
        }
    }

    /// Checks every target once per `interval` until `token` is cancelled.
    pub async fn run(&self, interval: Duration, targets: Vec<HealthTarget>, token: CancellationToken) {
        info!(
            interval_secs = interval.as_secs(),
            targets = targets.len(),
            "Health checker starting"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = token.cancelled() => break,
            }

            for target in &targets {
                let ctx = DeliveryContext::new(token.child_token(), interval);
                self.check_health(&ctx, target.provider.as_ref(), &target.settings)
                    .await;
            }
        }

        info!("Health checker stopped");
    }
}

/// Healthy when every check passed, unhealthy when every check failed,
/// degraded in between. No checks at all counts as healthy.
fn determine_overall_status(checks: &HashMap<String, HealthCheckResult>) -> HealthStatus {
    let failing = checks.values().filter(|result| !result.healthy).count();

    if failing == 0 {
        HealthStatus::Healthy
    } else if failing == checks.len() {
        HealthStatus::Unhealthy
    } else {
        HealthStatus::Degraded
    }
}
