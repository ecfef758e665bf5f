use std::{
    collections::HashMap,
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::NotificationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    Grab,
    Download,
    Upgrade,
    Rename,
    MovieAdded,
    MovieDelete,
    MovieFileDelete,
    Health,
    ApplicationUpdate,
    Test,
}

impl EventType {
    pub const ALL: [EventType; 10] = [
        EventType::Grab,
        EventType::Download,
        EventType::Upgrade,
        EventType::Rename,
        EventType::MovieAdded,
        EventType::MovieDelete,
        EventType::MovieFileDelete,
        EventType::Health,
        EventType::ApplicationUpdate,
        EventType::Test,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Grab => "grab",
            EventType::Download => "download",
            EventType::Upgrade => "upgrade",
            EventType::Rename => "rename",
            EventType::MovieAdded => "movieAdded",
            EventType::MovieDelete => "movieDelete",
            EventType::MovieFileDelete => "movieFileDelete",
            EventType::Health => "health",
            EventType::ApplicationUpdate => "applicationUpdate",
            EventType::Test => "test",
        }
    }

    /// Human readable title, used as the default message subject.
    pub fn title(&self) -> &'static str {
        match self {
            EventType::Grab => "Movie Grabbed",
            EventType::Download => "Movie Downloaded",
            EventType::Upgrade => "Movie Upgraded",
            EventType::Rename => "Movie Renamed",
            EventType::MovieAdded => "Movie Added",
            EventType::MovieDelete => "Movie Deleted",
            EventType::MovieFileDelete => "Movie File Deleted",
            EventType::Health => "Health Check",
            EventType::ApplicationUpdate => "Application Updated",
            EventType::Test => "Test Notification",
        }
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|event_type| event_type.as_str() == s)
            .ok_or_else(|| NotificationError::InvalidInput(format!("unknown event type '{}'", s)))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    pub year: i32,
    #[serde(default)]
    pub tmdb_id: i64,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub runtime: u32,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default)]
    pub has_file: bool,
    #[serde(default)]
    pub studio: Option<String>,
    #[serde(default)]
    pub certification: Option<String>,
}

impl Movie {
    /// "Title (Year)", or just the title when the year is unknown.
    pub fn label(&self) -> String {
        if self.year > 0 {
            format!("{} ({})", self.title, self.year)
        } else {
            self.title.clone()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieFile {
    pub id: i64,
    pub path: String,
    #[serde(default)]
    pub relative_path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub date_added: Option<DateTime<Utc>>,
    #[serde(default)]
    pub release_group: Option<String>,
    #[serde(default)]
    pub edition: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quality {
    pub name: String,
    #[serde(default)]
    pub resolution: u32,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub revision: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    Ok,
    Notice,
    #[default]
    Warning,
    Error,
}

impl HealthLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthLevel::Ok => "ok",
            HealthLevel::Notice => "notice",
            HealthLevel::Warning => "warning",
            HealthLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthIssue {
    #[serde(rename = "type")]
    pub check_type: String,
    pub source: String,
    #[serde(default)]
    pub level: HealthLevel,
    pub message: String,
    #[serde(default)]
    pub wiki_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    pub previous_version: String,
    pub new_version: String,
    #[serde(default)]
    pub message: String,
}

/// Release details attached to grab events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
    pub title: String,
    #[serde(default)]
    pub indexer: String,
    #[serde(default)]
    pub release_group: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameInfo {
    pub previous_path: String,
    pub new_path: String,
}

/// Something that happened upstream. Consumed read-only by dispatchers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub event_type: EventType,
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
    /// Loosely typed values exposed to templates as `data.<key>`.
    #[serde(default)]
    pub data: HashMap<String, JsonValue>,
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            movie: None,
            movie_file: None,
            quality: None,
            health: None,
            update: None,
            release: None,
            rename: None,
            download_client: None,
            download_id: None,
            source_title: None,
            is_upgrade: false,
            data: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_movie(mut self, movie: Movie) -> Self {
        self.movie = Some(movie);
        self
    }

    pub fn with_movie_file(mut self, movie_file: MovieFile) -> Self {
        self.movie_file = Some(movie_file);
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_health(mut self, health: HealthIssue) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_update(mut self, update: UpdateInfo) -> Self {
        self.update = Some(update);
        self
    }

    pub fn with_release(mut self, release: ReleaseInfo) -> Self {
        self.release = Some(release);
        self
    }

    pub fn with_rename(mut self, rename: RenameInfo) -> Self {
        self.rename = Some(rename);
        self
    }

    pub fn with_download(mut self, client: impl Into<String>, download_id: impl Into<String>) -> Self {
        self.download_client = Some(client.into());
        self.download_id = Some(download_id.into());
        self
    }

    pub fn with_source_title(mut self, source_title: impl Into<String>) -> Self {
        self.source_title = Some(source_title.into());
        self
    }

    pub fn with_upgrade(mut self, is_upgrade: bool) -> Self {
        self.is_upgrade = is_upgrade;
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
