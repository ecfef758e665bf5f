use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    message::NotificationMessage,
    provider::{NotificationType, Settings},
    status::QueueItemStatus,
};

/// One pending or finished retry unit.
///
/// Carries a snapshot of the rendered message and provider settings so a retry
/// delivers exactly what the first attempt tried to, even if the notification
/// was edited in the meantime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: Uuid,
    pub notification_id: Uuid,
    pub message: NotificationMessage,
    pub settings: Settings,
    pub provider_type: NotificationType,
    pub attempt_count: u32,
    pub next_attempt: DateTime<Utc>,
    pub max_retries: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    pub status: QueueItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QueueItem {
    pub fn new(
        notification_id: Uuid,
        message: NotificationMessage,
        settings: Settings,
        provider_type: NotificationType,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            notification_id,
            message,
            settings,
            provider_type,
            attempt_count: 0,
            next_attempt: now,
            max_retries,
            last_error: None,
            status: QueueItemStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_last_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(error.into());
        self
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == QueueItemStatus::Pending && self.next_attempt <= now
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub failed: u64,
    pub completed: u64,
    pub total: u64,
}

impl QueueStats {
    pub fn record(&mut self, status: QueueItemStatus) {
        match status {
            QueueItemStatus::Pending => self.pending += 1,
            QueueItemStatus::Processing => self.processing += 1,
            QueueItemStatus::Failed => self.failed += 1,
            QueueItemStatus::Completed => self.completed += 1,
        }
        self.total += 1;
    }

    pub fn from_statuses(statuses: impl IntoIterator<Item = QueueItemStatus>) -> Self {
        let mut stats = Self::default();
        for status in statuses {
            stats.record(status);
        }
        stats
    }
}
