use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::{
    error::{NotificationError, Result},
    models::event::EventType,
};

/// Channel identifier used to select a provider implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Email,
    Discord,
    Slack,
    Telegram,
    Pushover,
    Pushbullet,
    Gotify,
    Ntfy,
    Webhook,
    Apprise,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Email => "email",
            NotificationType::Discord => "discord",
            NotificationType::Slack => "slack",
            NotificationType::Telegram => "telegram",
            NotificationType::Pushover => "pushover",
            NotificationType::Pushbullet => "pushbullet",
            NotificationType::Gotify => "gotify",
            NotificationType::Ntfy => "ntfy",
            NotificationType::Webhook => "webhook",
            NotificationType::Apprise => "apprise",
        }
    }
}

impl Display for NotificationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_value(JsonValue::String(s.to_lowercase()))
            .map_err(|_| NotificationError::UnknownProvider(s.to_string()))
    }
}

/// Which events a provider is able to deliver, plus feature flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCapabilities {
    pub on_grab: bool,
    pub on_download: bool,
    pub on_upgrade: bool,
    pub on_rename: bool,
    pub on_movie_added: bool,
    pub on_movie_delete: bool,
    pub on_movie_file_delete: bool,
    pub on_health_issue: bool,
    pub on_application_update: bool,
    pub supports_custom_templates: bool,
    pub supports_rich_content: bool,
}

impl ProviderCapabilities {
    /// Every event type enabled, no optional features.
    pub fn all_events() -> Self {
        Self {
            on_grab: true,
            on_download: true,
            on_upgrade: true,
            on_rename: true,
            on_movie_added: true,
            on_movie_delete: true,
            on_movie_file_delete: true,
            on_health_issue: true,
            on_application_update: true,
            supports_custom_templates: false,
            supports_rich_content: false,
        }
    }

    /// Test events are always deliverable.
    pub fn supports(&self, event_type: EventType) -> bool {
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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Password,
    Number,
    Checkbox,
    Select,
    Url,
    Textarea,
}

/// Describes one settings field a provider expects, for building config forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigField {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ConfigField {
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type,
            required: false,
            default_value: None,
            help_text: None,
            options: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<JsonValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_help(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|option| option.to_string()).collect();
        self
    }
}

/// Provider-specific settings of a configured notification, kept as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(pub Map<String, JsonValue>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(JsonValue::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(JsonValue::as_bool)
    }

    /// Non-empty string value or a validation error naming the field.
    pub fn require_str(&self, key: &str) -> Result<&str> {
        match self.get_str(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(NotificationError::validation(key, "is required")),
        }
    }

    /// Checks that every required field is present and non-empty.
    pub fn check_required(&self, fields: &[ConfigField]) -> Result<()> {
        for field in fields.iter().filter(|field| field.required) {
            let present = match self.0.get(&field.name) {
                None | Some(JsonValue::Null) => false,
                Some(JsonValue::String(value)) => !value.trim().is_empty(),
                Some(_) => true,
            };
            if !present {
                return Err(NotificationError::validation(&field.name, "is required"));
            }
        }
        Ok(())
    }
}
