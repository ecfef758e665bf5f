use std::{sync::LazyLock, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client, Script, aio::MultiplexedConnection};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::{NotificationError, Result},
    models::{
        queue::{QueueItem, QueueStats},
        retry::RetryConfig,
        status::QueueItemStatus,
    },
    queue::QueueStore,
    utils::retry_with_backoff,
};

/// Pops up to `ARGV[2]` due ids from `KEYS[1]` and returns
/// `{id, score, payload}` for each, payload read from the hash `KEYS[2]`.
static CLAIM_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
local entries = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'WITHSCORES', 'LIMIT', 0, ARGV[2])
local claimed = {}
for i = 1, #entries, 2 do
  redis.call('ZREM', KEYS[1], entries[i])
  table.insert(claimed, {entries[i], entries[i + 1], redis.call('HGET', KEYS[2], entries[i])})
end
return claimed
",
    )
});

/// Durable queue store.
///
/// Items live as JSON in the hash `{prefix}:items`. Pending items are also
/// indexed in the sorted set `{prefix}:due`, scored by `next_attempt` in
/// milliseconds. Claiming pops ids from the sorted set inside one Lua script,
/// so concurrent workers never receive the same id. An id whose processing
/// write fails is put back with its original score.
#[derive(Clone)]
pub struct RedisQueueStore {
    connection: MultiplexedConnection,
    items_key: String,
    due_key: String,
    retry_config: RetryConfig,
}

impl RedisQueueStore {
    pub async fn connect(redis_url: &str, key_prefix: &str) -> Result<Self> {
        info!("Connecting to Redis...");

        let client = Client::open(redis_url)
            .map_err(|e| NotificationError::Queue(format!("Failed to create redis client: {}", e)))?;

        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| NotificationError::Queue(format!("Failed to connect to redis: {}", e)))?;

        let _: String = connection.ping().await?;

        info!(key_prefix, "Redis connection established");

        Ok(Self::from_connection(connection, key_prefix))
    }

    pub fn from_connection(connection: MultiplexedConnection, key_prefix: &str) -> Self {
        Self {
            connection,
            items_key: format!("{}:items", key_prefix),
            due_key: format!("{}:due", key_prefix),
            retry_config: RetryConfig {
                max_retries: 3,
                initial_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(2),
                jitter: 0.1,
                ..Default::default()
            },
        }
    }

    /// Retry policy for backend writes.
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Drops every key owned by this store.
    pub async fn clear(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(vec![self.items_key.clone(), self.due_key.clone()])
            .await?;
        Ok(())
    }

    async fn write(&self, item: &QueueItem) -> Result<()> {
        let payload = serde_json::to_string(item)?;
        let id = item.id.to_string();
        let score = item.next_attempt.timestamp_millis();
        let pending = item.status == QueueItemStatus::Pending;

        retry_with_backoff(&self.retry_config, || {
            let mut conn = self.connection.clone();
            let payload = payload.clone();
            let id = id.clone();

            async move {
                let mut pipe = redis::pipe();
                pipe.atomic().hset(&self.items_key, &id, payload).ignore();
                if pending {
                    pipe.zadd(&self.due_key, &id, score).ignore();
                } else {
                    pipe.zrem(&self.due_key, &id).ignore();
                }
                pipe.query_async::<()>(&mut conn).await
            }
        })
        .await?;

        Ok(())
    }

    /// Puts popped ids back into the due index with their original scores.
    async fn reindex(&self, entries: &[(f64, String)]) {
        if entries.is_empty() {
            return;
        }

        let result = retry_with_backoff(&self.retry_config, || {
            let mut conn = self.connection.clone();
            async move { conn.zadd_multiple::<_, _, _, ()>(&self.due_key, entries).await }
        })
        .await;

        if let Err(e) = result {
            error!(error = %e, count = entries.len(), "Failed to return queue items to the due index");
        }
    }

    async fn load(&self, id: &str) -> Result<Option<QueueItem>> {
        let mut conn = self.connection.clone();
        let payload: Option<String> = conn.hget(&self.items_key, id).await?;
        payload
            .map(|payload| serde_json::from_str(&payload).map_err(NotificationError::from))
            .transpose()
    }

    async fn load_all(&self) -> Result<Vec<QueueItem>> {
        let mut conn = self.connection.clone();
        let payloads: Vec<String> = conn.hvals(&self.items_key).await?;

        let mut items = Vec::with_capacity(payloads.len());
        for payload in payloads {
            match serde_json::from_str::<QueueItem>(&payload) {
                Ok(item) => items.push(item),
                Err(e) => warn!(error = %e, "Skipping unreadable queue item"),
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn insert(&self, item: &QueueItem) -> Result<()> {
        let mut conn = self.connection.clone();
        let payload = serde_json::to_string(item)?;

        let created: bool = conn
            .hset_nx(&self.items_key, item.id.to_string(), payload)
            .await?;
        if !created {
            return Err(NotificationError::Queue(format!(
                "queue item {} already exists",
                item.id
            )));
        }

        if item.status == QueueItemStatus::Pending {
            conn.zadd::<_, _, _, ()>(
                &self.due_key,
                item.id.to_string(),
                item.next_attempt.timestamp_millis(),
            )
            .await?;
        }
        Ok(())
    }

    async fn claim_due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<QueueItem>> {
        let mut conn = self.connection.clone();
        let entries: Vec<(String, f64, Option<String>)> = CLAIM_SCRIPT
            .key(&self.due_key)
            .key(&self.items_key)
            .arg(now.timestamp_millis())
            .arg(limit)
            .invoke_async(&mut conn)
            .await?;

        let mut claimed = Vec::with_capacity(entries.len());
        let mut entries = entries.into_iter();
        while let Some((id, score, payload)) = entries.next() {
            let Some(payload) = payload else {
                warn!(queue_item_id = %id, "Due index pointed at a missing queue item");
                continue;
            };
            let mut item = match serde_json::from_str::<QueueItem>(&payload) {
                Ok(item) => item,
                Err(e) => {
                    warn!(queue_item_id = %id, error = %e, "Dropping unreadable queue item from the due index");
                    continue;
                }
            };

            item.status = QueueItemStatus::Processing;
            item.updated_at = now;
            if let Err(e) = self.write(&item).await {
                let unclaimed: Vec<(f64, String)> = std::iter::once((score, id))
                    .chain(entries.by_ref().map(|(id, score, _)| (score, id)))
                    .collect();
                warn!(
                    error = %e,
                    released = unclaimed.len(),
                    claimed = claimed.len(),
                    "Failed to mark queue item processing, releasing the rest of the batch"
                );
                self.reindex(&unclaimed).await;

                if claimed.is_empty() {
                    return Err(e);
                }
                break;
            }
            claimed.push(item);
        }
        Ok(claimed)
    }

    async fn get(&self, id: Uuid) -> Result<Option<QueueItem>> {
        self.load(&id.to_string()).await
    }

    async fn save(&self, item: &QueueItem) -> Result<()> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.hexists(&self.items_key, item.id.to_string()).await?;
        if !exists {
            return Err(NotificationError::NotFound(format!("queue item {}", item.id)));
        }
        self.write(item).await
    }

    async fn list(&self, status: Option<QueueItemStatus>) -> Result<Vec<QueueItem>> {
        let mut items: Vec<QueueItem> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|item| status.is_none_or(|status| item.status == status))
            .collect();
        items.sort_by_key(|item| item.created_at);
        Ok(items)
    }

    async fn remove(&self, id: Uuid) -> Result<bool> {
        let mut conn = self.connection.clone();
        let id = id.to_string();
        let (removed, _): (i64, i64) = redis::pipe()
            .atomic()
            .hdel(&self.items_key, &id)
            .zrem(&self.due_key, &id)
            .query_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    async fn stats(&self) -> Result<QueueStats> {
        let items = self.load_all().await?;
        Ok(QueueStats::from_statuses(items.iter().map(|item| item.status)))
    }
}
