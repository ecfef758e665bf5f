//! The contract every delivery channel implements.
//!
//! Concrete channels (SMTP, chat webhooks, push gateways) live outside this
//! crate and are plugged in through [`ProviderRegistry`].

pub mod registry;

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{NotificationError, Result},
    models::{
        message::{NotificationMessage, SendReceipt},
        provider::{ConfigField, NotificationType, ProviderCapabilities, Settings},
        retry::RetryConfig,
    },
};

pub use registry::{ProviderInfo, ProviderRegistry};

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn notification_type(&self) -> NotificationType;

    fn config_fields(&self) -> Vec<ConfigField>;

    /// Default validation only checks that required fields are filled.
    fn validate_config(&self, settings: &Settings) -> Result<()> {
        settings.check_required(&self.config_fields())
    }

    /// Delivers one rendered message. Implementations should stop early when
    /// `ctx` is cancelled; the caller enforces the timeout either way.
    async fn send_notification(
        &self,
        ctx: &DeliveryContext,
        settings: &Settings,
        message: &NotificationMessage,
    ) -> Result<SendReceipt>;

    async fn test_connection(&self, ctx: &DeliveryContext, settings: &Settings) -> Result<()>;

    fn capabilities(&self) -> ProviderCapabilities;

    fn supports_retry(&self) -> bool {
        true
    }

    fn default_retry_config(&self) -> RetryConfig {
        RetryConfig::default()
    }
}

impl std::fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name())
            .field("type", &self.notification_type())
            .finish()
    }
}

/// Cancellation and deadline handed to every provider call.
#[derive(Debug, Clone)]
pub struct DeliveryContext {
    token: CancellationToken,
    timeout: Duration,
}

impl DeliveryContext {
    pub fn new(token: CancellationToken, timeout: Duration) -> Self {
        Self { token, timeout }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(CancellationToken::new(), timeout)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Child context sharing this deadline, cancelled together with the parent.
    pub fn child(&self) -> Self {
        Self::new(self.token.child_token(), self.timeout)
    }

    /// Runs `operation` until it finishes, the timeout elapses or the token is
    /// cancelled, whichever comes first.
    pub async fn run<T, F>(&self, operation: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.token.is_cancelled() {
            return Err(NotificationError::Cancelled);
        }

        tokio::select! {
            () = self.token.cancelled() => Err(NotificationError::Cancelled),
            result = tokio::time::timeout(self.timeout, future) => match result {
                Ok(outcome) => outcome,
                Err(_) => Err(NotificationError::Timeout(format!(
                    "{} exceeded {}ms",
                    operation,
                    self.timeout.as_millis()
                ))),
            },
        }
    }
}
