//! Wires configured notifications, providers, the event bus and the retry queue together.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::{
    bus::{EventBus, EventHandler},
    clients::health::{HealthChecker, HealthTarget},
    error::{NotificationError, Result},
    models::{
        event::{EventType, NotificationEvent},
        health::HealthReport,
        message::{DispatchOutcome, ServerContext},
        notification::NotificationConfig,
    },
    dispatcher::NotificationDispatcher,
    providers::{DeliveryContext, ProviderRegistry},
    queue::{RetryPolicies, RetryQueue, RetryWorker, WorkerConfig},
    templates::validation::validate_template,
};

struct Registration {
    dispatcher: Arc<NotificationDispatcher>,
    events: Vec<EventType>,
}

pub struct NotificationService {
    registry: Arc<ProviderRegistry>,
    bus: Arc<EventBus>,
    queue: RetryQueue,
    policies: RetryPolicies,
    health: HealthChecker,
    server: ServerContext,
    send_timeout: Duration,
    cancellation_token: CancellationToken,
    notifications: RwLock<HashMap<Uuid, Registration>>,
}

impl NotificationService {
    pub fn new(registry: ProviderRegistry, queue: RetryQueue, server: ServerContext) -> Self {
        Self {
            registry: Arc::new(registry),
            bus: Arc::new(EventBus::new()),
            queue,
            policies: RetryPolicies::new(),
            health: HealthChecker::new(),
            server,
            send_timeout: Duration::from_secs(30),
            cancellation_token: CancellationToken::new(),
            notifications: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Cancelling `token` aborts in-flight sends started by this service.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn queue(&self) -> &RetryQueue {
        &self.queue
    }

    pub fn health(&self) -> &HealthChecker {
        &self.health
    }

    /// Validates `config` and subscribes it for every event it wants.
    /// A notification with the same id is replaced.
    pub async fn add_notification(&self, config: NotificationConfig) -> Result<Uuid> {
        let provider = self.registry.get(config.provider_type)?;
        provider.validate_config(&config.settings)?;

        if !config.templates.is_empty() && !provider.capabilities().supports_custom_templates {
            return Err(NotificationError::validation(
                "templates",
                format!("{} does not support custom templates", provider.name()),
            ));
        }
        for (event_type, template) in &config.templates {
            if template.event_type != *event_type {
                return Err(NotificationError::validation(
                    "templates",
                    format!(
                        "template '{}' is for {}, not {}",
                        template.name, template.event_type, event_type
                    ),
                ));
            }
            validate_template(Some(template))?;
        }

        let id = config.id;
        let events = config.subscribed_events();
        let name = config.name.clone();
        let retry = config.retry.clone();
        let dispatcher = Arc::new(
            NotificationDispatcher::new(config, provider, self.queue.clone(), self.server.clone())
                .with_send_timeout(self.send_timeout)
                .with_cancellation(self.cancellation_token.child_token()),
        );

        // Held until the new registration is inserted: one subscription set per id.
        let mut notifications = self.notifications.write().await;
        if let Some(previous) = notifications.remove(&id) {
            self.unsubscribe(previous).await;
        }

        match retry {
            Some(retry) => self.policies.set(id, retry).await,
            None => self.policies.remove(id).await,
        }

        for event_type in &events {
            self.bus.subscribe(*event_type, dispatcher.clone()).await;
        }
        notifications.insert(id, Registration { dispatcher, events: events.clone() });
        drop(notifications);

        info!(
            notification_id = %id,
            notification = %name,
            events = events.len(),
            "Notification registered"
        );
        Ok(id)
    }

    /// Unsubscribes a notification. Returns whether it was registered.
    pub async fn remove_notification(&self, id: Uuid) -> bool {
        let mut notifications = self.notifications.write().await;
        let Some(registration) = notifications.remove(&id) else {
            return false;
        };
        self.unsubscribe(registration).await;
        self.policies.remove(id).await;
        drop(notifications);

        info!(notification_id = %id, "Notification removed");
        true
    }

    async fn unsubscribe(&self, registration: Registration) {
        let handler: Arc<dyn EventHandler> = registration.dispatcher;
        for event_type in registration.events {
            self.bus.unsubscribe(event_type, &handler).await;
        }
    }

    pub async fn get_notification(&self, id: Uuid) -> Option<NotificationConfig> {
        self.notifications
            .read()
            .await
            .get(&id)
            .map(|registration| registration.dispatcher.config().clone())
    }

    pub async fn notifications(&self) -> Vec<NotificationConfig> {
        let mut configs: Vec<NotificationConfig> = self
            .notifications
            .read()
            .await
            .values()
            .map(|registration| registration.dispatcher.config().clone())
            .collect();
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        configs
    }

    pub async fn publish(&self, event: &NotificationEvent) -> Result<()> {
        self.bus.publish(event).await
    }

    /// Sends a test event through one notification, bypassing the bus.
    pub async fn test_notification(&self, id: Uuid) -> Result<DispatchOutcome> {
        let dispatcher = self
            .notifications
            .read()
            .await
            .get(&id)
            .map(|registration| registration.dispatcher.clone())
            .ok_or_else(|| NotificationError::NotFound(format!("notification {}", id)))?;

        dispatcher
            .dispatch(&NotificationEvent::new(EventType::Test))
            .await
    }

    /// One health target per registered notification.
    pub async fn health_targets(&self) -> Result<Vec<HealthTarget>> {
        let notifications = self.notifications.read().await;
        let mut targets = Vec::with_capacity(notifications.len());
        for registration in notifications.values() {
            let config = registration.dispatcher.config();
            targets.push(HealthTarget {
                provider: self.registry.get(config.provider_type)?,
                settings: config.settings.clone(),
            });
        }
        Ok(targets)
    }

    /// Checks every registered notification's provider once.
    pub async fn check_all_health(&self) -> Result<HealthReport> {
        for target in self.health_targets().await? {
            let ctx = DeliveryContext::new(self.cancellation_token.child_token(), self.send_timeout);
            self.health
                .check_health(&ctx, target.provider.as_ref(), &target.settings)
                .await;
        }
        Ok(self.health.report().await)
    }

    pub fn worker(&self, config: WorkerConfig) -> RetryWorker {
        RetryWorker::new(
            self.queue.clone(),
            self.registry.clone(),
            self.policies.clone(),
            config,
        )
        .with_cancellation(self.cancellation_token.child_token())
    }
}
