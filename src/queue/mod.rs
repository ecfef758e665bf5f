//! Retry queue with exponential backoff over a pluggable store.

pub mod memory;
pub mod worker;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::{NotificationError, Result},
    models::{
        queue::{QueueItem, QueueStats},
        retry::RetryConfig,
        status::QueueItemStatus,
    },
    utils::apply_jitter,
};

pub use memory::MemoryQueueStore;
pub use worker::{RetryPolicies, RetryWorker, WorkerConfig};

/// `at + by`, saturating at the latest representable instant.
pub fn add_duration(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(by)
        .ok()
        .and_then(|by| at.checked_add_signed(by))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = add_duration(*now, by);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Storage backend for queue items.
///
/// `claim_due` must be atomic with respect to other callers: an item returned
/// to one caller is never returned to another until it is saved back as pending.
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn insert(&self, item: &QueueItem) -> Result<()>;

    /// Moves up to `limit` pending items with `next_attempt <= now` to
    /// processing and returns them, earliest first.
    async fn claim_due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<QueueItem>>;

    async fn get(&self, id: Uuid) -> Result<Option<QueueItem>>;

    /// Persists an item, rescheduling it when its status is pending.
    async fn save(&self, item: &QueueItem) -> Result<()>;

    async fn list(&self, status: Option<QueueItemStatus>) -> Result<Vec<QueueItem>>;

    async fn remove(&self, id: Uuid) -> Result<bool>;

    async fn stats(&self) -> Result<QueueStats>;
}

#[derive(Clone)]
pub struct RetryQueue {
    store: Arc<dyn QueueStore>,
    clock: Arc<dyn Clock>,
}

impl RetryQueue {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn QueueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn enqueue(&self, mut item: QueueItem) -> Result<Uuid> {
        item.status = QueueItemStatus::Pending;
        item.updated_at = self.clock.now();
        self.store.insert(&item).await?;

        info!(
            queue_item_id = %item.id,
            notification_id = %item.notification_id,
            provider_type = %item.provider_type,
            next_attempt = %item.next_attempt,
            "Notification queued for retry"
        );

        Ok(item.id)
    }

    /// Claims up to `limit` items that are due now.
    pub async fn dequeue(&self, limit: usize) -> Result<Vec<QueueItem>> {
        let items = self.store.claim_due(self.clock.now(), limit).await?;
        if !items.is_empty() {
            debug!(claimed = items.len(), "Claimed due queue items");
        }
        Ok(items)
    }

    pub async fn mark_success(&self, id: Uuid) -> Result<QueueItem> {
        let mut item = self.active_item(id).await?;
        item.status = QueueItemStatus::Completed;
        item.updated_at = self.clock.now();
        self.store.save(&item).await?;

        info!(
            queue_item_id = %id,
            notification_id = %item.notification_id,
            attempt_count = item.attempt_count,
            "Queued notification delivered"
        );

        Ok(item)
    }

    /// Records a failed attempt and either reschedules the item with backoff
    /// or, when the error is permanent or retries are exhausted, marks it failed.
    pub async fn mark_failed(
        &self,
        id: Uuid,
        error: &NotificationError,
        config: &RetryConfig,
    ) -> Result<QueueItem> {
        let mut item = self.active_item(id).await?;
        let now = self.clock.now();

        item.attempt_count += 1;
        item.last_error = Some(error.to_string());
        item.updated_at = now;

        if !config.is_retryable(error) || item.attempt_count >= item.max_retries {
            item.status = QueueItemStatus::Failed;
            self.store.save(&item).await?;

            warn!(
                queue_item_id = %id,
                notification_id = %item.notification_id,
                attempt_count = item.attempt_count,
                max_retries = item.max_retries,
                error = %error,
                "Queued notification failed permanently"
            );
            return Ok(item);
        }

        let delay = apply_jitter(config.backoff_delay(item.attempt_count), config.jitter)
            .min(config.max_delay);
        item.next_attempt = add_duration(now, delay);
        item.status = QueueItemStatus::Pending;
        self.store.save(&item).await?;

        debug!(
            queue_item_id = %id,
            attempt_count = item.attempt_count,
            delay_ms = delay.as_millis() as u64,
            next_attempt = %item.next_attempt,
            "Queued notification rescheduled"
        );

        Ok(item)
    }

    pub async fn get_queue_stats(&self) -> Result<QueueStats> {
        self.store.stats().await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<QueueItem>> {
        self.store.get(id).await
    }

    /// Items in `status`, or all of them, oldest first.
    pub async fn list(&self, status: Option<QueueItemStatus>) -> Result<Vec<QueueItem>> {
        self.store.list(status).await
    }

    pub async fn list_failed(&self) -> Result<Vec<QueueItem>> {
        self.list(Some(QueueItemStatus::Failed)).await
    }

    /// Puts a permanently failed item back in line with a fresh attempt budget.
    pub async fn requeue_failed(&self, id: Uuid) -> Result<QueueItem> {
        let mut item = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| NotificationError::NotFound(format!("queue item {}", id)))?;

        if item.status != QueueItemStatus::Failed {
            return Err(NotificationError::Queue(format!(
                "queue item {} is {}, only failed items can be requeued",
                id, item.status
            )));
        }

        let now = self.clock.now();
        item.status = QueueItemStatus::Pending;
        item.attempt_count = 0;
        item.next_attempt = now;
        item.updated_at = now;
        self.store.save(&item).await?;

        info!(queue_item_id = %id, "Failed notification requeued");
        Ok(item)
    }

    /// Deletes completed items last touched more than `older_than` ago.
    pub async fn purge_completed(&self, older_than: Duration) -> Result<usize> {
        let cutoff = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|age| self.clock.now().checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut purged = 0;

        for item in self.store.list(Some(QueueItemStatus::Completed)).await? {
            if item.updated_at < cutoff && self.store.remove(item.id).await? {
                purged += 1;
            }
        }

        if purged > 0 {
            info!(purged, "Purged completed queue items");
        }
        Ok(purged)
    }

    async fn active_item(&self, id: Uuid) -> Result<QueueItem> {
        let item = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| NotificationError::NotFound(format!("queue item {}", id)))?;

        if item.status.is_terminal() {
            return Err(NotificationError::Queue(format!(
                "queue item {} is already {}",
                id, item.status
            )));
        }
        Ok(item)
    }
}
