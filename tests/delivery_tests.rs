use std::time::Duration;

use anyhow::Result;
use notification_core::{error::NotificationError, providers::DeliveryContext};

/// Test: Operations slower than the deadline fail with a timeout
#[tokio::test]
async fn test_slow_operations_time_out() -> Result<()> {
    let ctx = DeliveryContext::with_timeout(Duration::from_millis(20));

    let result: notification_core::Result<()> = ctx
        .run("send", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

    assert!(matches!(result, Err(NotificationError::Timeout(_))));
    Ok(())
}

/// Test: A cancelled context never starts the operation
#[tokio::test]
async fn test_cancelled_context_short_circuits() -> Result<()> {
    let ctx = DeliveryContext::with_timeout(Duration::from_secs(5));
    ctx.token().cancel();

    let result = ctx.run("send", async { Ok(1) }).await;
    assert!(matches!(result, Err(NotificationError::Cancelled)));
    Ok(())
}

/// Test: Cancelling the parent also cancels child contexts mid-flight
#[tokio::test]
async fn test_child_context_follows_parent() -> Result<()> {
    let parent = DeliveryContext::with_timeout(Duration::from_secs(5));
    let child = parent.child();

    let token = parent.token().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let result: notification_core::Result<()> = child
        .run("send", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

    assert!(matches!(result, Err(NotificationError::Cancelled)));
    assert!(child.is_cancelled());
    Ok(())
}

/// Test: Fast operations pass their value through
#[tokio::test]
async fn test_fast_operations_pass_through() -> Result<()> {
    let ctx = DeliveryContext::with_timeout(Duration::from_secs(1));
    assert_eq!(ctx.run("send", async { Ok(7) }).await?, 7);
    Ok(())
}
