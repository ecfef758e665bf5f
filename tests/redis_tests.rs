//! Integration tests against a live Redis. Run with `--ignored` and `REDIS_URL` set.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{TimeZone, Utc};
use notification_core::{
    clients::redis::RedisQueueStore,
    error::NotificationError,
    models::{
        event::EventType,
        message::{NotificationMessage, ServerContext},
        provider::NotificationType,
        queue::QueueItem,
        retry::RetryConfig,
        status::QueueItemStatus,
    },
    queue::{Clock, ManualClock, QueueStore, RetryQueue},
};
use redis::AsyncCommands;
use uuid::Uuid;

use crate::common::{movie_event, settings};

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

async fn store_with_prefix() -> Result<(RedisQueueStore, String)> {
    let prefix = format!("notification-core-test:{}", Uuid::new_v4());
    let store = RedisQueueStore::connect(&redis_url(), &prefix).await?;
    store.clear().await?;
    Ok((store, prefix))
}

async fn store() -> Result<RedisQueueStore> {
    Ok(store_with_prefix().await?.0)
}

async fn raw_connection() -> Result<redis::aio::MultiplexedConnection> {
    let client = redis::Client::open(redis_url())?;
    Ok(client.get_multiplexed_async_connection().await?)
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()))
}

fn queue_item(queue: &RetryQueue) -> QueueItem {
    QueueItem::new(
        Uuid::new_v4(),
        NotificationMessage::from_event(&movie_event(EventType::Grab), &ServerContext::default()),
        settings(),
        NotificationType::Webhook,
        3,
        queue.now(),
    )
}

/// Test: Items survive a round trip through Redis and are claimed once
#[tokio::test]
#[ignore = "requires a running Redis"]
async fn test_redis_enqueue_and_claim() -> Result<()> {
    let store = store().await?;
    let queue = RetryQueue::with_clock(Arc::new(store.clone()), clock());

    let id = queue.enqueue(queue_item(&queue)).await?;
    let stored = queue.get(id).await?.expect("item stored");
    assert_eq!(stored.message.event_type, EventType::Grab);

    let claimed = queue.dequeue(10).await?;
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].status, QueueItemStatus::Processing);
    assert!(queue.dequeue(10).await?.is_empty());

    store.clear().await?;
    Ok(())
}

/// Test: Duplicate ids are rejected by the store
#[tokio::test]
#[ignore = "requires a running Redis"]
async fn test_redis_rejects_duplicate_insert() -> Result<()> {
    let store = store().await?;
    let queue = RetryQueue::with_clock(Arc::new(store.clone()), clock());
    let item = queue_item(&queue);

    store.insert(&item).await?;
    assert!(matches!(store.insert(&item).await, Err(NotificationError::Queue(_))));

    store.clear().await?;
    Ok(())
}

/// Test: Backoff reschedules the item in the due index
#[tokio::test]
#[ignore = "requires a running Redis"]
async fn test_redis_backoff_and_stats() -> Result<()> {
    let store = store().await?;
    let clock = clock();
    let queue = RetryQueue::with_clock(Arc::new(store.clone()), clock.clone());

    let id = queue.enqueue(queue_item(&queue)).await?;
    queue.dequeue(1).await?;
    queue
        .mark_failed(id, &NotificationError::transient("503"), &RetryConfig::default())
        .await?;

    assert!(queue.dequeue(10).await?.is_empty());
    clock.advance(Duration::from_secs(1));
    assert_eq!(queue.dequeue(10).await?.len(), 1);

    queue.mark_success(id).await?;
    let stats = queue.get_queue_stats().await?;
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.total, 1);

    assert!(store.remove(id).await?);
    assert!(queue.get(id).await?.is_none());

    store.clear().await?;
    Ok(())
}

/// Test: Concurrent claimers never receive the same item
#[tokio::test]
#[ignore = "requires a running Redis"]
async fn test_redis_concurrent_claims_are_exclusive() -> Result<()> {
    let store = store().await?;
    let queue = RetryQueue::with_clock(Arc::new(store.clone()), clock());
    for _ in 0..20 {
        queue.enqueue(queue_item(&queue)).await?;
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue(20).await })
        })
        .collect();

    let mut seen = std::collections::HashSet::new();
    for handle in handles {
        for item in handle.await?? {
            assert!(seen.insert(item.id), "Item {} claimed twice", item.id);
        }
    }
    assert_eq!(seen.len(), 20);

    store.clear().await?;
    Ok(())
}

/// Test: A corrupt or missing entry in the due index does not hold back the rest of the batch
#[tokio::test]
#[ignore = "requires a running Redis"]
async fn test_redis_claim_skips_unreadable_items() -> Result<()> {
    let (store, prefix) = store_with_prefix().await?;
    let clock = clock();
    let queue = RetryQueue::with_clock(Arc::new(store.clone()), clock.clone());

    let due_key = format!("{}:due", prefix);
    let items_key = format!("{}:items", prefix);
    let early = clock.now().timestamp_millis() - 1000;
    let mut conn = raw_connection().await?;
    conn.hset::<_, _, _, ()>(&items_key, "corrupt", "{not json").await?;
    conn.zadd::<_, _, _, ()>(&due_key, "corrupt", early).await?;
    conn.zadd::<_, _, _, ()>(&due_key, "missing", early).await?;

    let first = queue.enqueue(queue_item(&queue)).await?;
    let second = queue.enqueue(queue_item(&queue)).await?;

    let claimed = queue.dequeue(10).await?;
    let mut ids: Vec<Uuid> = claimed.iter().map(|item| item.id).collect();
    ids.sort();
    let mut expected = vec![first, second];
    expected.sort();
    assert_eq!(ids, expected);
    assert!(claimed.iter().all(|item| item.status == QueueItemStatus::Processing));

    let remaining: i64 = conn.zcard(&due_key).await?;
    assert_eq!(remaining, 0, "Unreadable ids leave the due index");
    assert!(queue.dequeue(10).await?.is_empty());

    store.clear().await?;
    Ok(())
}

/// Test: A claim limit leaves the remaining due items in the index, earliest first
#[tokio::test]
#[ignore = "requires a running Redis"]
async fn test_redis_claim_respects_limit_and_order() -> Result<()> {
    let store = store().await?;
    let clock = clock();
    let queue = RetryQueue::with_clock(Arc::new(store.clone()), clock.clone());

    let first = queue.enqueue(queue_item(&queue)).await?;
    clock.advance(Duration::from_secs(1));
    let second = queue.enqueue(queue_item(&queue)).await?;
    clock.advance(Duration::from_secs(1));
    let third = queue.enqueue(queue_item(&queue)).await?;

    let batch = queue.dequeue(2).await?;
    assert_eq!(
        batch.iter().map(|item| item.id).collect::<Vec<_>>(),
        vec![first, second]
    );

    let rest = queue.dequeue(10).await?;
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].id, third);

    let stats = queue.get_queue_stats().await?;
    assert_eq!(stats.processing, 3);
    assert_eq!(stats.pending, 0);

    store.clear().await?;
    Ok(())
}
