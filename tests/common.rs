#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use notification_core::{
    error::{NotificationError, Result},
    models::{
        event::{EventType, Movie, NotificationEvent, Quality},
        message::{NotificationMessage, SendReceipt},
        provider::{ConfigField, FieldType, NotificationType, ProviderCapabilities, Settings},
        retry::RetryConfig,
    },
    providers::{DeliveryContext, Provider},
    queue::{ManualClock, MemoryQueueStore, RetryQueue},
};

/// Scriptable provider that records every message it is asked to send.
pub struct MockProvider {
    name: String,
    notification_type: NotificationType,
    capabilities: ProviderCapabilities,
    supports_retry: bool,
    retry_config: RetryConfig,
    delay: Duration,
    script: Mutex<VecDeque<Result<SendReceipt>>>,
    fallback_error: Option<NotificationError>,
    connection_error: Option<NotificationError>,
    attempts: Mutex<Vec<NotificationMessage>>,
    calls: AtomicU32,
}

impl MockProvider {
    pub fn new(notification_type: NotificationType) -> Self {
        Self {
            name: format!("mock-{}", notification_type),
            notification_type,
            capabilities: ProviderCapabilities {
                supports_custom_templates: true,
                ..ProviderCapabilities::all_events()
            },
            supports_retry: true,
            retry_config: fast_retry(3),
            delay: Duration::ZERO,
            script: Mutex::new(VecDeque::new()),
            fallback_error: None,
            connection_error: None,
            attempts: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_capabilities(mut self, capabilities: ProviderCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn without_retry(mut self) -> Self {
        self.supports_retry = false;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queues the outcome of the next unscripted send.
    pub fn then(self, outcome: Result<SendReceipt>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(outcome);
        self
    }

    /// Every send without a scripted outcome fails with `error`.
    pub fn failing_with(mut self, error: NotificationError) -> Self {
        self.fallback_error = Some(error);
        self
    }

    pub fn with_connection_error(mut self, error: NotificationError) -> Self {
        self.connection_error = Some(error);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn attempts(&self) -> Vec<NotificationMessage> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn notification_type(&self) -> NotificationType {
        self.notification_type
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        vec![ConfigField::new("url", "URL", FieldType::Url).required()]
    }

    async fn send_notification(
        &self,
        _ctx: &DeliveryContext,
        _settings: &Settings,
        message: &NotificationMessage,
    ) -> Result<SendReceipt> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.attempts.lock().unwrap().push(message.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(outcome) = self.script.lock().unwrap().pop_front() {
            return outcome;
        }
        match &self.fallback_error {
            Some(error) => Err(error.clone()),
            None => Ok(SendReceipt::with_id(format!("msg-{}", call))),
        }
    }

    async fn test_connection(&self, _ctx: &DeliveryContext, _settings: &Settings) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.connection_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }

    fn supports_retry(&self) -> bool {
        self.supports_retry
    }

    fn default_retry_config(&self) -> RetryConfig {
        self.retry_config.clone()
    }
}

pub fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(80),
        ..Default::default()
    }
}

pub fn settings() -> Settings {
    Settings::new().with("url", "https://hooks.example.com/notify")
}

pub fn dune() -> Movie {
    Movie {
        id: 1,
        title: "Dune".to_string(),
        year: 2021,
        tmdb_id: 438631,
        overview: "Paul Atreides leads nomadic tribes.".to_string(),
        genres: vec!["Science Fiction".to_string(), "Adventure".to_string()],
        ..Default::default()
    }
}

pub fn movie_event(event_type: EventType) -> NotificationEvent {
    NotificationEvent::new(event_type)
        .with_movie(dune())
        .with_quality(Quality {
            name: "Bluray-1080p".to_string(),
            resolution: 1080,
            ..Default::default()
        })
        .with_timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap())
}

/// In-memory queue driven by a clock the test controls.
pub fn manual_queue() -> (RetryQueue, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let queue = RetryQueue::with_clock(Arc::new(MemoryQueueStore::new()), clock.clone());
    (queue, clock)
}
