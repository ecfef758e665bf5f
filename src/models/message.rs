use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::{
    error::NotificationError,
    models::event::{
        EventType, HealthIssue, Movie, MovieFile, NotificationEvent, Quality, ReleaseInfo,
        RenameInfo, UpdateInfo,
    },
};

/// Identity of the server emitting notifications, exposed as `{server}` and `{serverUrl}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerContext {
    pub name: String,
    pub url: String,
}

/// Dispatch-time projection of an event for one configured notification.
///
/// Snapshotted into queue items, so it must stay serializable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    pub event_type: EventType,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub movie: Option<Movie>,
    #[serde(default)]
    pub movie_file: Option<MovieFile>,
    #[serde(default)]
    pub quality: Option<Quality>,
    #[serde(default)]
    pub health: Option<HealthIssue>,
    #[serde(default)]
    pub update: Option<UpdateInfo>,
    #[serde(default)]
    pub release: Option<ReleaseInfo>,
    #[serde(default)]
    pub rename: Option<RenameInfo>,
    #[serde(default)]
    pub download_client: Option<String>,
    #[serde(default)]
    pub download_id: Option<String>,
    #[serde(default)]
    pub source_title: Option<String>,
    #[serde(default)]
    pub is_upgrade: bool,
    #[serde(default)]
    pub data: HashMap<String, JsonValue>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_test: bool,
    #[serde(default)]
    pub server_name: String,
    #[serde(default)]
    pub server_url: String,
    /// Filled in by the dispatcher after rendering.
    #[serde(default)]
    pub body_html: Option<String>,
}

impl NotificationMessage {
    pub fn from_event(event: &NotificationEvent, server: &ServerContext) -> Self {
        Self {
            event_type: event.event_type,
            subject: event.event_type.title().to_string(),
            message: describe(event),
            movie: event.movie.clone(),
            movie_file: event.movie_file.clone(),
            quality: event.quality.clone(),
            health: event.health.clone(),
            update: event.update.clone(),
            release: event.release.clone(),
            rename: event.rename.clone(),
            download_client: event.download_client.clone(),
            download_id: event.download_id.clone(),
            source_title: event.source_title.clone(),
            is_upgrade: event.is_upgrade,
            data: event.data.clone(),
            timestamp: event.timestamp,
            is_test: event.event_type == EventType::Test,
            server_name: server.name.clone(),
            server_url: server.url.clone(),
            body_html: None,
        }
    }
}

fn describe(event: &NotificationEvent) -> String {
    let movie = event
        .movie
        .as_ref()
        .map(Movie::label)
        .unwrap_or_else(|| "Unknown movie".to_string());

    match event.event_type {
        EventType::Grab => {
            let release = event
                .release
                .as_ref()
                .map(|release| release.title.clone())
                .or_else(|| event.source_title.clone())
                .unwrap_or_else(|| movie.clone());
            format!("Grabbed {}", release)
        }
        EventType::Download => format!("Imported {}", movie),
        EventType::Upgrade => format!("Upgraded {}", movie),
        EventType::Rename => format!("Renamed files for {}", movie),
        EventType::MovieAdded => format!("Added {}", movie),
        EventType::MovieDelete => format!("Deleted {}", movie),
        EventType::MovieFileDelete => format!("Deleted file for {}", movie),
        EventType::Health => event
            .health
            .as_ref()
            .map(|health| health.message.clone())
            .unwrap_or_else(|| "Health check issue".to_string()),
        EventType::ApplicationUpdate => match &event.update {
            Some(update) if !update.message.is_empty() => update.message.clone(),
            Some(update) => format!(
                "Updated from {} to {}",
                update.previous_version, update.new_version
            ),
            None => "Application updated".to_string(),
        },
        EventType::Test => "This is a test notification".to_string(),
    }
}

/// Identifier returned by a provider after a successful send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message_id: Option<String>,
}

impl SendReceipt {
    pub fn with_id(message_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResult {
    pub success: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn succeeded(duration: Duration, receipt: SendReceipt) -> Self {
        Self {
            success: true,
            duration_ms: duration.as_millis() as u64,
            message_id: receipt.message_id,
            status_code: None,
            error: None,
        }
    }

    pub fn failed(duration: Duration, error: &NotificationError) -> Self {
        Self {
            success: false,
            duration_ms: duration.as_millis() as u64,
            message_id: None,
            status_code: error.status_code(),
            error: Some(error.to_string()),
        }
    }
}

/// What a dispatcher did with one event.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The notification does not handle this event.
    Skipped,
    Sent(NotificationResult),
    /// Direct delivery failed and a retry was scheduled.
    Queued(Uuid),
    /// Direct delivery failed permanently.
    Failed(NotificationResult),
}
