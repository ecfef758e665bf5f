//! In-process publish/subscribe for notification events.

use std::{collections::HashMap, panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use futures_util::{FutureExt, future::join_all};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{
    error::{HandlerErrors, HandlerFailure, NotificationError, Result},
    models::event::{EventType, NotificationEvent},
};

#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Label used when reporting this handler's failures.
    fn name(&self) -> &str;

    async fn handle(&self, event: &NotificationEvent) -> Result<()>;
}

#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<EventType, Vec<Arc<dyn EventHandler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, event_type: EventType, handler: Arc<dyn EventHandler>) {
        debug!(event_type = %event_type, handler = handler.name(), "Handler subscribed");
        self.handlers
            .write()
            .await
            .entry(event_type)
            .or_default()
            .push(handler);
    }

    /// Removes `handler` (matched by identity). Returns whether it was subscribed.
    pub async fn unsubscribe(&self, event_type: EventType, handler: &Arc<dyn EventHandler>) -> bool {
        let mut handlers = self.handlers.write().await;
        let Some(subscribed) = handlers.get_mut(&event_type) else {
            return false;
        };

        let before = subscribed.len();
        subscribed.retain(|existing| !same_handler(existing, handler));
        let removed = subscribed.len() != before;

        if subscribed.is_empty() {
            handlers.remove(&event_type);
        }

        if removed {
            debug!(event_type = %event_type, handler = handler.name(), "Handler unsubscribed");
        }
        removed
    }

    pub async fn subscriber_count(&self, event_type: EventType) -> usize {
        self.handlers
            .read()
            .await
            .get(&event_type)
            .map_or(0, Vec::len)
    }

    /// Delivers `event` to every handler subscribed to its type, concurrently.
    ///
    /// A handler that errors or panics does not prevent the others from
    /// running; all failures come back together as [`NotificationError::Handlers`].
    pub async fn publish(&self, event: &NotificationEvent) -> Result<()> {
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .handlers
            .read()
            .await
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        if handlers.is_empty() {
            debug!(event_type = %event.event_type, "No handlers subscribed");
            return Ok(());
        }

        debug!(
            event_type = %event.event_type,
            handler_count = handlers.len(),
            "Publishing event"
        );

        let runs = handlers.iter().map(|handler| async move {
            let outcome = AssertUnwindSafe(handler.handle(event)).catch_unwind().await;
            let error = match outcome {
                Ok(Ok(())) => return None,
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("handler panicked: {}", panic_message(panic.as_ref())),
            };
            warn!(
                event_type = %event.event_type,
                handler = handler.name(),
                error = %error,
                "Event handler failed"
            );
            Some(HandlerFailure {
                handler: handler.name().to_string(),
                error,
            })
        });

        let failures: Vec<HandlerFailure> = join_all(runs).await.into_iter().flatten().collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotificationError::Handlers(HandlerErrors(failures)))
        }
    }
}

fn same_handler(a: &Arc<dyn EventHandler>, b: &Arc<dyn EventHandler>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
