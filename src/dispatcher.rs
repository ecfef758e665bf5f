//! Per-notification delivery: render, gate on capabilities, send, or hand off to the retry queue.

use std::{sync::Arc, time::{Duration, Instant}};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    bus::EventHandler,
    error::{NotificationError, Result},
    models::{
        event::NotificationEvent,
        message::{DispatchOutcome, NotificationMessage, NotificationResult, ServerContext},
        notification::NotificationConfig,
        queue::QueueItem,
        retry::RetryConfig,
    },
    providers::{DeliveryContext, Provider},
    queue::RetryQueue,
    templates::{TemplateEngine, defaults::resolve_template},
};

pub struct NotificationDispatcher {
    config: NotificationConfig,
    provider: Arc<dyn Provider>,
    engine: TemplateEngine,
    queue: RetryQueue,
    server: ServerContext,
    retry_config: RetryConfig,
    send_timeout: Duration,
    cancellation_token: CancellationToken,
}

impl NotificationDispatcher {
    pub fn new(
        config: NotificationConfig,
        provider: Arc<dyn Provider>,
        queue: RetryQueue,
        server: ServerContext,
    ) -> Self {
        let base = provider.default_retry_config();
        let retry_config = match &config.retry {
            Some(retry) => retry.apply(&base),
            None => base,
        };

        Self {
            config,
            provider,
            engine: TemplateEngine::new(),
            queue,
            server,
            retry_config,
            send_timeout: Duration::from_secs(30),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn config(&self) -> &NotificationConfig {
        &self.config
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    /// Renders `event` for this notification and tries to deliver it once.
    ///
    /// A retryable failure is handed to the retry queue and reported as
    /// [`DispatchOutcome::Queued`]. Only rendering and queue errors come back as `Err`.
    pub async fn dispatch(&self, event: &NotificationEvent) -> Result<DispatchOutcome> {
        if !self.config.accepts(event) {
            debug!(
                notification = %self.config.name,
                event_type = %event.event_type,
                "Notification does not accept event"
            );
            return Ok(DispatchOutcome::Skipped);
        }

        let message = NotificationMessage::from_event(event, &self.server);
        let template = resolve_template(event.event_type, &self.config.templates);
        let rendered = self.engine.render(Some(template), &message)?;

        if !self.provider.capabilities().supports(event.event_type) {
            debug!(
                notification = %self.config.name,
                provider = self.provider.name(),
                event_type = %event.event_type,
                "Provider does not support event, skipping"
            );
            return Ok(DispatchOutcome::Skipped);
        }

        let outgoing = NotificationMessage {
            subject: rendered.subject,
            message: rendered.body,
            body_html: rendered.body_html,
            ..message
        };

        let ctx = DeliveryContext::new(self.cancellation_token.child_token(), self.send_timeout);
        let start = Instant::now();
        let sent = ctx
            .run(
                "send_notification",
                self.provider
                    .send_notification(&ctx, &self.config.settings, &outgoing),
            )
            .await;
        let elapsed = start.elapsed();

        let error = match sent {
            Ok(receipt) => {
                info!(
                    notification = %self.config.name,
                    provider = self.provider.name(),
                    event_type = %event.event_type,
                    duration_ms = elapsed.as_millis() as u64,
                    "Notification sent"
                );
                return Ok(DispatchOutcome::Sent(NotificationResult::succeeded(
                    elapsed, receipt,
                )));
            }
            Err(e) => e,
        };

        let result = NotificationResult::failed(elapsed, &error);

        if !self.should_retry(&error) {
            warn!(
                notification = %self.config.name,
                provider = self.provider.name(),
                event_type = %event.event_type,
                error = %error,
                "Notification failed"
            );
            return Ok(DispatchOutcome::Failed(result));
        }

        let item = QueueItem::new(
            self.config.id,
            outgoing,
            self.config.settings.clone(),
            self.config.provider_type,
            self.retry_config.max_retries,
            self.queue.now(),
        )
        .with_last_error(error.to_string());
        let id = self.queue.enqueue(item).await?;

        warn!(
            notification = %self.config.name,
            provider = self.provider.name(),
            event_type = %event.event_type,
            queue_item_id = %id,
            error = %error,
            "Notification failed, queued for retry"
        );

        Ok(DispatchOutcome::Queued(id))
    }

    fn should_retry(&self, error: &NotificationError) -> bool {
        self.provider.supports_retry()
            && self.retry_config.max_retries > 0
            && self.retry_config.is_retryable(error)
    }
}

#[async_trait]
impl EventHandler for NotificationDispatcher {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn handle(&self, event: &NotificationEvent) -> Result<()> {
        match self.dispatch(event).await? {
            DispatchOutcome::Failed(result) => Err(NotificationError::Provider {
                message: result.error.unwrap_or_else(|| "delivery failed".to_string()),
                status_code: result.status_code,
                retryable: false,
            }),
            DispatchOutcome::Skipped | DispatchOutcome::Sent(_) | DispatchOutcome::Queued(_) => {
                Ok(())
            }
        }
    }
}
