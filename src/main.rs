use std::{sync::Arc, time::Duration};

use anyhow::{Error, Result};
use notification_core::{
    api::run_api_server,
    clients::redis::RedisQueueStore,
    config::Config,
    providers::ProviderRegistry,
    queue::{MemoryQueueStore, QueueStore, RetryQueue},
    service::NotificationService,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = Config::load()?;
    info!(server = %config.server_name, "Starting notification worker");

    let store: Arc<dyn QueueStore> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisQueueStore::connect(url, &config.queue_key_prefix)
                .await?
                .with_retry_config(config.retry_config()),
        ),
        None => {
            warn!("REDIS_URL not set, queued retries will not survive a restart");
            Arc::new(MemoryQueueStore::new())
        }
    };

    let shutdown = CancellationToken::new();

    // Channel providers are registered by the embedding application.
    let service = Arc::new(
        NotificationService::new(
            ProviderRegistry::new(),
            RetryQueue::new(store),
            config.server_context(),
        )
        .with_send_timeout(config.send_timeout())
        .with_cancellation(shutdown.clone()),
    );

    let worker = service.worker(config.worker_config());
    let worker_handle = tokio::spawn(async move { worker.run().await });

    let health_service = service.clone();
    let health_interval = config.health_check_interval();
    let health_token = shutdown.clone();
    let health_handle = tokio::spawn(async move {
        match health_service.health_targets().await {
            Ok(targets) => {
                health_service
                    .health()
                    .run(health_interval, targets, health_token)
                    .await
            }
            Err(e) => error!(error = %e, "Failed to collect health check targets"),
        }
    });

    let purge_service = service.clone();
    let retention = config.completed_retention();
    let purge_token = shutdown.clone();
    let purge_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(3600));
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = purge_token.cancelled() => break,
            }
            if let Err(e) = purge_service.queue().purge_completed(retention).await {
                warn!(error = %e, "Failed to purge completed queue items");
            }
        }
    });

    let api_handle = tokio::spawn(run_api_server(
        service.clone(),
        config.server_port,
        shutdown.clone(),
    ));

    wait_for_shutdown_signal().await;
    info!("Shutdown signal received, stopping");
    shutdown.cancel();

    for handle in [worker_handle, health_handle, purge_handle] {
        if let Err(e) = handle.await {
            error!(error = %e, "Background task ended abnormally");
        }
    }
    match api_handle.await {
        Ok(Err(e)) => error!(error = %e, "Status server failed"),
        Err(e) => error!(error = %e, "Status server task ended abnormally"),
        Ok(Ok(())) => {}
    }

    info!("Notification worker stopped");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "notification_core=info,notification_worker=info,tower_http=info".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
