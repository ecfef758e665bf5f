use std::{sync::Arc, time::Duration};

use anyhow::Result;
use notification_core::{
    error::NotificationError,
    models::{
        event::EventType,
        message::{NotificationMessage, SendReceipt, ServerContext},
        provider::NotificationType,
        queue::QueueItem,
        retry::RetryOverride,
        status::QueueItemStatus,
    },
    providers::ProviderRegistry,
    queue::{Clock, RetryPolicies, RetryQueue, RetryWorker, WorkerConfig},
};
use uuid::Uuid;

use crate::common::{MockProvider, manual_queue, movie_event, settings};

fn worker_config() -> WorkerConfig {
    WorkerConfig {
        poll_interval: Duration::from_millis(10),
        batch_size: 10,
        concurrency: 4,
        send_timeout: Duration::from_secs(1),
    }
}

async fn queue_webhook(queue: &RetryQueue, notification_id: Uuid, max_retries: u32) -> Result<Uuid> {
    let mut message =
        NotificationMessage::from_event(&movie_event(EventType::Download), &ServerContext::default());
    message.subject = "Downloaded: Dune".to_string();

    let item = QueueItem::new(
        notification_id,
        message,
        settings(),
        NotificationType::Webhook,
        max_retries,
        queue.now(),
    );
    Ok(queue.enqueue(item).await?)
}

fn worker_for(queue: &RetryQueue, provider: Arc<MockProvider>, policies: RetryPolicies) -> RetryWorker {
    RetryWorker::new(
        queue.clone(),
        Arc::new(ProviderRegistry::new().with(provider)),
        policies,
        worker_config(),
    )
}

/// Test: A due item is delivered with its snapshot and marked completed
#[tokio::test]
async fn test_worker_delivers_queued_item() -> Result<()> {
    let (queue, _clock) = manual_queue();
    let provider = Arc::new(MockProvider::new(NotificationType::Webhook));
    let id = queue_webhook(&queue, Uuid::new_v4(), 3).await?;
    let worker = worker_for(&queue, provider.clone(), RetryPolicies::new());

    let processed = worker.process_due().await?;

    assert_eq!(processed, 1);
    assert_eq!(provider.attempts()[0].subject, "Downloaded: Dune");
    let item = queue.get(id).await?.expect("item kept after delivery");
    assert_eq!(item.status, QueueItemStatus::Completed);
    assert_eq!(worker.process_due().await?, 0, "Completed items are not retried");
    Ok(())
}

/// Test: A provider that keeps failing exhausts the retry budget
#[tokio::test]
async fn test_worker_gives_up_after_max_retries() -> Result<()> {
    let (queue, clock) = manual_queue();
    let provider = Arc::new(
        MockProvider::new(NotificationType::Webhook)
            .failing_with(NotificationError::from_status(502, "bad gateway")),
    );
    let id = queue_webhook(&queue, Uuid::new_v4(), 3).await?;
    let worker = worker_for(&queue, provider.clone(), RetryPolicies::new());

    for _ in 0..5 {
        worker.process_due().await?;
        clock.advance(Duration::from_secs(1));
    }

    let item = queue.get(id).await?.expect("item kept after failure");
    assert_eq!(item.status, QueueItemStatus::Failed);
    assert_eq!(item.attempt_count, 3);
    assert_eq!(provider.calls(), 3);
    assert!(item.last_error.unwrap_or_default().contains("bad gateway"));
    Ok(())
}

/// Test: A later success completes an item that failed before
#[tokio::test]
async fn test_worker_recovers_after_transient_failure() -> Result<()> {
    let (queue, clock) = manual_queue();
    let provider = Arc::new(
        MockProvider::new(NotificationType::Webhook)
            .then(Err(NotificationError::transient("connection reset")))
            .then(Ok(SendReceipt::with_id("abc"))),
    );
    let id = queue_webhook(&queue, Uuid::new_v4(), 3).await?;
    let worker = worker_for(&queue, provider.clone(), RetryPolicies::new());

    worker.process_due().await?;
    let item = queue.get(id).await?.expect("item exists");
    assert_eq!(item.status, QueueItemStatus::Pending);
    assert_eq!(item.attempt_count, 1);

    assert_eq!(worker.process_due().await?, 0, "Backoff has not elapsed");
    clock.advance(Duration::from_millis(10));
    assert_eq!(worker.process_due().await?, 1);

    let item = queue.get(id).await?.expect("item exists");
    assert_eq!(item.status, QueueItemStatus::Completed);
    assert_eq!(provider.calls(), 2);
    Ok(())
}

/// Test: Items for an unregistered provider type fail permanently
#[tokio::test]
async fn test_worker_fails_unknown_provider() -> Result<()> {
    let (queue, _clock) = manual_queue();
    let id = queue_webhook(&queue, Uuid::new_v4(), 5).await?;
    let worker = worker_for(
        &queue,
        Arc::new(MockProvider::new(NotificationType::Slack)),
        RetryPolicies::new(),
    );

    worker.process_due().await?;

    let item = queue.get(id).await?.expect("item exists");
    assert_eq!(item.status, QueueItemStatus::Failed);
    assert_eq!(item.attempt_count, 1);
    assert!(item.last_error.unwrap_or_default().contains("No provider registered"));
    Ok(())
}

/// Test: A worker with no providers at all leaves queued items pending
#[tokio::test]
async fn test_worker_without_providers_leaves_items_pending() -> Result<()> {
    let (queue, _clock) = manual_queue();
    let id = queue_webhook(&queue, Uuid::new_v4(), 5).await?;
    let worker = Arc::new(RetryWorker::new(
        queue.clone(),
        Arc::new(ProviderRegistry::new()),
        RetryPolicies::new(),
        worker_config(),
    ));

    assert_eq!(worker.process_due().await?, 0);

    let runner = worker.clone();
    let handle = tokio::spawn(async move { runner.run().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    worker.shutdown();
    tokio::time::timeout(Duration::from_secs(1), handle).await??;

    let item = queue.get(id).await?.expect("item exists");
    assert_eq!(item.status, QueueItemStatus::Pending);
    assert_eq!(item.attempt_count, 0);
    assert!(item.last_error.is_none());
    Ok(())
}

/// Test: Providers that opt out of retry fail on the first queued attempt
#[tokio::test]
async fn test_worker_respects_supports_retry() -> Result<()> {
    let (queue, _clock) = manual_queue();
    let provider = Arc::new(
        MockProvider::new(NotificationType::Webhook)
            .without_retry()
            .failing_with(NotificationError::transient("timeout")),
    );
    let id = queue_webhook(&queue, Uuid::new_v4(), 5).await?;
    let worker = worker_for(&queue, provider, RetryPolicies::new());

    worker.process_due().await?;

    let item = queue.get(id).await?.expect("item exists");
    assert_eq!(item.status, QueueItemStatus::Failed);
    Ok(())
}

/// Test: Per-notification overrides change the backoff used by the worker
#[tokio::test]
async fn test_worker_uses_notification_override() -> Result<()> {
    let (queue, clock) = manual_queue();
    let provider = Arc::new(
        MockProvider::new(NotificationType::Webhook)
            .failing_with(NotificationError::transient("unavailable")),
    );
    let notification_id = Uuid::new_v4();
    let policies = RetryPolicies::new();
    policies
        .set(
            notification_id,
            RetryOverride {
                initial_delay_ms: Some(5000),
                max_delay_ms: Some(60_000),
                ..Default::default()
            },
        )
        .await;
    let id = queue_webhook(&queue, notification_id, 5).await?;
    let worker = worker_for(&queue, provider, policies);

    let before = clock.now();
    worker.process_due().await?;

    let item = queue.get(id).await?.expect("item exists");
    assert_eq!((item.next_attempt - before).num_milliseconds(), 5000);
    Ok(())
}

/// Test: The polling loop drains the queue and stops on shutdown
#[tokio::test]
async fn test_worker_run_and_shutdown() -> Result<()> {
    let (queue, _clock) = manual_queue();
    let provider = Arc::new(MockProvider::new(NotificationType::Webhook));
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(queue_webhook(&queue, Uuid::new_v4(), 3).await?);
    }

    let worker = Arc::new(worker_for(&queue, provider.clone(), RetryPolicies::new()));
    let runner = worker.clone();
    let handle = tokio::spawn(async move { runner.run().await });

    tokio::time::timeout(Duration::from_secs(5), async {
        while queue.get_queue_stats().await.map(|s| s.completed).unwrap_or(0) < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;

    worker.shutdown();
    tokio::time::timeout(Duration::from_secs(1), handle).await??;

    assert_eq!(provider.calls(), 3);
    for id in ids {
        let item = queue.get(id).await?.expect("item exists");
        assert_eq!(item.status, QueueItemStatus::Completed);
    }
    Ok(())
}
