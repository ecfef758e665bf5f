use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    event::{EventType, HealthLevel, NotificationEvent},
    provider::{NotificationType, Settings},
    retry::RetryOverride,
    template::NotificationTemplate,
};

/// A user-configured destination: which provider, its settings and which events it wants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationConfig {
    pub id: Uuid,
    pub name: String,
    pub provider_type: NotificationType,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub on_grab: bool,
    #[serde(default)]
    pub on_download: bool,
    #[serde(default)]
    pub on_upgrade: bool,
    #[serde(default)]
    pub on_rename: bool,
    #[serde(default)]
    pub on_movie_added: bool,
    #[serde(default)]
    pub on_movie_delete: bool,
    #[serde(default)]
    pub on_movie_file_delete: bool,
    #[serde(default)]
    pub on_health_issue: bool,
    /// Health events at warning level are only delivered when set.
    #[serde(default)]
    pub include_health_warnings: bool,
    #[serde(default)]
    pub on_application_update: bool,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub retry: Option<RetryOverride>,
    /// Custom templates, taking precedence over the built-in defaults.
    #[serde(default)]
    pub templates: HashMap<EventType, NotificationTemplate>,
}

fn enabled_by_default() -> bool {
    true
}

impl NotificationConfig {
    pub fn new(name: impl Into<String>, provider_type: NotificationType, settings: Settings) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            provider_type,
            settings,
            on_grab: false,
            on_download: false,
            on_upgrade: false,
            on_rename: false,
            on_movie_added: false,
            on_movie_delete: false,
            on_movie_file_delete: false,
            on_health_issue: false,
            include_health_warnings: false,
            on_application_update: false,
            enabled: true,
            retry: None,
            templates: HashMap::new(),
        }
    }

    /// Subscribes to every event type.
    pub fn subscribe_all(mut self) -> Self {
        self.on_grab = true;
        self.on_download = true;
        self.on_upgrade = true;
        self.on_rename = true;
        self.on_movie_added = true;
        self.on_movie_delete = true;
        self.on_movie_file_delete = true;
        self.on_health_issue = true;
        self.include_health_warnings = true;
        self.on_application_update = true;
        self
    }

    pub fn with_template(mut self, template: NotificationTemplate) -> Self {
        self.templates.insert(template.event_type, template);
        self
    }

    pub fn with_retry(mut self, retry: RetryOverride) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn subscribes_to(&self, event_type: EventType) -> bool {
        match event_type {
            EventType::Grab => self.on_grab,
            EventType::Download => self.on_download,
            EventType::Upgrade => self.on_upgrade,
            EventType::Rename => self.on_rename,
            EventType::MovieAdded => self.on_movie_added,
            EventType::MovieDelete => self.on_movie_delete,
            EventType::MovieFileDelete => self.on_movie_file_delete,
            EventType::Health => self.on_health_issue,
            EventType::ApplicationUpdate => self.on_application_update,
            EventType::Test => true,
        }
    }

    pub fn subscribed_events(&self) -> Vec<EventType> {
        EventType::ALL
            .into_iter()
            .filter(|event_type| self.subscribes_to(*event_type))
            .collect()
    }

    /// Event-level filters that go beyond the subscription flags.
    pub fn accepts(&self, event: &NotificationEvent) -> bool {
        if !self.enabled || !self.subscribes_to(event.event_type) {
            return false;
        }

        match (&event.health, event.event_type) {
            (Some(health), EventType::Health) if health.level == HealthLevel::Warning => {
                self.include_health_warnings
            }
            _ => true,
        }
    }
}
