use serde::{Deserialize, Serialize};

use crate::models::event::EventType;

/// Raw subject/body markup for one event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationTemplate {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub event_type: EventType,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub body_html: Option<String>,
    /// Used when the rendered subject comes out blank.
    #[serde(default)]
    pub default_subject: String,
    /// Used when the rendered body comes out blank.
    #[serde(default)]
    pub default_body: String,
}

fn default_version() -> u32 {
    1
}

impl NotificationTemplate {
    pub fn new(
        name: impl Into<String>,
        event_type: EventType,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            event_type,
            subject: subject.into(),
            body: body.into(),
            body_html: None,
            default_subject: event_type.title().to_string(),
            default_body: String::new(),
        }
    }

    pub fn with_body_html(mut self, body_html: impl Into<String>) -> Self {
        self.body_html = Some(body_html.into());
        self
    }

    pub fn with_defaults(mut self, subject: impl Into<String>, body: impl Into<String>) -> Self {
        self.default_subject = subject.into();
        self.default_body = body.into();
        self
    }
}

/// Markup-free output of rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedTemplate {
    pub subject: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_html: Option<String>,
}
