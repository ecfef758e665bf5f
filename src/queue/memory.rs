use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::{NotificationError, Result},
    models::{
        queue::{QueueItem, QueueStats},
        status::QueueItemStatus,
    },
    queue::QueueStore,
};

/// Process-local queue store. Claims happen under a single lock.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    items: Mutex<HashMap<Uuid, QueueItem>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn insert(&self, item: &QueueItem) -> Result<()> {
        let mut items = self.items.lock().await;
        if items.contains_key(&item.id) {
            return Err(NotificationError::Queue(format!(
                "queue item {} already exists",
                item.id
            )));
        }
        items.insert(item.id, item.clone());
        Ok(())
    }

    async fn claim_due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<QueueItem>> {
        let mut items = self.items.lock().await;

        let mut due: Vec<(DateTime<Utc>, Uuid)> = items
            .values()
            .filter(|item| item.is_due(now))
            .map(|item| (item.next_attempt, item.id))
            .collect();
        due.sort();
        due.truncate(limit);

        let mut claimed = Vec::with_capacity(due.len());
        for (_, id) in due {
            if let Some(item) = items.get_mut(&id) {
                item.status = QueueItemStatus::Processing;
                item.updated_at = now;
                claimed.push(item.clone());
            }
        }
        Ok(claimed)
    }

    async fn get(&self, id: Uuid) -> Result<Option<QueueItem>> {
        Ok(self.items.lock().await.get(&id).cloned())
    }

    async fn save(&self, item: &QueueItem) -> Result<()> {
        let mut items = self.items.lock().await;
        match items.get_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(())
            }
            None => Err(NotificationError::NotFound(format!("queue item {}", item.id))),
        }
    }

    async fn list(&self, status: Option<QueueItemStatus>) -> Result<Vec<QueueItem>> {
        let items = self.items.lock().await;
        let mut listed: Vec<QueueItem> = items
            .values()
            .filter(|item| status.is_none_or(|status| item.status == status))
            .cloned()
            .collect();
        listed.sort_by_key(|item| item.created_at);
        Ok(listed)
    }

    async fn remove(&self, id: Uuid) -> Result<bool> {
        Ok(self.items.lock().await.remove(&id).is_some())
    }

    async fn stats(&self) -> Result<QueueStats> {
        let items = self.items.lock().await;
        Ok(QueueStats::from_statuses(items.values().map(|item| item.status)))
    }
}
