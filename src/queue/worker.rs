//! Background worker that drains the retry queue.

use std::{collections::HashMap, sync::Arc, time::Duration};

use futures_util::{StreamExt, stream};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    error::Result,
    models::{queue::QueueItem, retry::{RetryConfig, RetryOverride}},
    providers::{DeliveryContext, Provider, ProviderRegistry},
    queue::RetryQueue,
};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
    /// Items claimed per poll.
    pub batch_size: usize,
    /// Deliveries in flight at once.
    pub concurrency: usize,
    pub send_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 50,
            concurrency: 8,
            send_timeout: Duration::from_secs(30),
        }
    }
}

/// Per-notification retry overrides, shared between dispatchers and the worker.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicies {
    overrides: Arc<RwLock<HashMap<Uuid, RetryOverride>>>,
}

impl RetryPolicies {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, notification_id: Uuid, retry: RetryOverride) {
        self.overrides.write().await.insert(notification_id, retry);
    }

    pub async fn remove(&self, notification_id: Uuid) {
        self.overrides.write().await.remove(&notification_id);
    }

    /// The provider's defaults with the notification's override applied on top.
    pub async fn resolve(&self, notification_id: Uuid, provider: &dyn Provider) -> RetryConfig {
        let base = provider.default_retry_config();
        match self.overrides.read().await.get(&notification_id) {
            Some(retry) => retry.apply(&base),
            None => base,
        }
    }
}

pub struct RetryWorker {
    queue: RetryQueue,
    registry: Arc<ProviderRegistry>,
    policies: RetryPolicies,
    config: WorkerConfig,
    cancellation_token: CancellationToken,
}

impl RetryWorker {
    pub fn new(
        queue: RetryQueue,
        registry: Arc<ProviderRegistry>,
        policies: RetryPolicies,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            registry,
            policies,
            config,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Ties the worker to an externally owned shutdown token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn shutdown(&self) {
        self.cancellation_token.cancel();
    }

    /// Polls the queue until cancelled.
    pub async fn run(&self) {
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            concurrency = self.config.concurrency,
            "Retry worker starting"
        );
        if self.registry.is_empty() {
            warn!("No providers registered, queued items stay pending until one is");
        }

        loop {
            if self.cancellation_token.is_cancelled() {
                break;
            }

            let pause = match self.process_due().await {
                Ok(processed) if processed >= self.config.batch_size => continue,
                Ok(_) => self.config.poll_interval,
                Err(e) => {
                    error!(error = %e, "Retry worker failed to poll queue");
                    self.config.poll_interval.max(Duration::from_secs(5))
                }
            };

            tokio::select! {
                () = tokio::time::sleep(pause) => {}
                () = self.cancellation_token.cancelled() => break,
            }
        }

        info!("Retry worker stopped");
    }

    /// Claims one batch of due items and attempts each of them. Returns how many were claimed.
    /// Nothing is claimed while the registry is empty.
    pub async fn process_due(&self) -> Result<usize> {
        if self.registry.is_empty() {
            return Ok(0);
        }

        let items = self.queue.dequeue(self.config.batch_size.max(1)).await?;
        let claimed = items.len();
        if claimed == 0 {
            return Ok(0);
        }

        stream::iter(items)
            .for_each_concurrent(self.config.concurrency.max(1), |item| async move {
                let id = item.id;
                if let Err(e) = self.attempt(item).await {
                    error!(queue_item_id = %id, error = %e, "Failed to record retry attempt");
                }
            })
            .await;

        Ok(claimed)
    }

    async fn attempt(&self, item: QueueItem) -> Result<()> {
        let provider = match self.registry.get(item.provider_type) {
            Ok(provider) => provider,
            Err(e) => {
                warn!(
                    queue_item_id = %item.id,
                    provider_type = %item.provider_type,
                    "No provider for queued notification"
                );
                let config = RetryConfig::default().with_condition(|_| false);
                self.queue.mark_failed(item.id, &e, &config).await?;
                return Ok(());
            }
        };

        let mut config = self.policies.resolve(item.notification_id, provider.as_ref()).await;
        if !provider.supports_retry() {
            config = config.with_condition(|_| false);
        }

        let ctx = DeliveryContext::new(
            self.cancellation_token.child_token(),
            self.config.send_timeout,
        );

        debug!(
            queue_item_id = %item.id,
            provider = provider.name(),
            attempt = item.attempt_count + 1,
            "Retrying queued notification"
        );

        let sent = ctx
            .run(
                "send_notification",
                provider.send_notification(&ctx, &item.settings, &item.message),
            )
            .await;

        match sent {
            Ok(receipt) => {
                debug!(
                    queue_item_id = %item.id,
                    message_id = receipt.message_id.as_deref().unwrap_or_default(),
                    "Provider accepted queued notification"
                );
                self.queue.mark_success(item.id).await?;
            }
            Err(e) => {
                self.queue.mark_failed(item.id, &e, &config).await?;
            }
        }
        Ok(())
    }
}
