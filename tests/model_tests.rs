use anyhow::Result;
use notification_core::{
    error::{HandlerErrors, HandlerFailure, NotificationError},
    models::{
        event::{EventType, HealthIssue, HealthLevel, Movie, NotificationEvent, UpdateInfo},
        message::{NotificationMessage, ServerContext},
        notification::NotificationConfig,
        provider::{ConfigField, FieldType, NotificationType, ProviderCapabilities, Settings},
        retry::{RetryConfig, RetryOverride},
    },
};
use tokio_test::{assert_err, assert_ok};

/// Test: Event types parse from and serialize to their wire names
#[tokio::test]
async fn test_event_type_wire_names() -> Result<()> {
    for event_type in EventType::ALL {
        let parsed: EventType = event_type.as_str().parse()?;
        assert_eq!(parsed, event_type);
        assert_eq!(
            serde_json::to_string(&event_type)?,
            format!("\"{}\"", event_type.as_str())
        );
    }
    assert_err!("movieExploded".parse::<EventType>());
    Ok(())
}

/// Test: Messages carry the event summary and server identity
#[tokio::test]
async fn test_message_from_event() -> Result<()> {
    let event = NotificationEvent::new(EventType::Download).with_movie(Movie {
        title: "Dune".to_string(),
        year: 2021,
        ..Default::default()
    });
    let server = ServerContext {
        name: "Radarr".to_string(),
        url: "http://localhost:7878".to_string(),
    };

    let message = NotificationMessage::from_event(&event, &server);

    assert_eq!(message.subject, "Movie Downloaded");
    assert_eq!(message.message, "Imported Dune (2021)");
    assert_eq!(message.server_name, "Radarr");
    assert!(!message.is_test);
    Ok(())
}

/// Test: Update messages fall back to the version pair
#[tokio::test]
async fn test_update_message_uses_versions() -> Result<()> {
    let event = NotificationEvent::new(EventType::ApplicationUpdate).with_update(UpdateInfo {
        previous_version: "5.1.0".to_string(),
        new_version: "5.2.0".to_string(),
        message: String::new(),
    });

    let message = NotificationMessage::from_event(&event, &ServerContext::default());

    assert_eq!(message.message, "Updated from 5.1.0 to 5.2.0");
    Ok(())
}

/// Test: Health warnings only reach notifications that opted in
#[tokio::test]
async fn test_health_warnings_need_opt_in() -> Result<()> {
    let mut config = NotificationConfig::new("ops", NotificationType::Slack, Settings::new());
    config.on_health_issue = true;

    let warning = NotificationEvent::new(EventType::Health).with_health(HealthIssue {
        check_type: "DownloadClientCheck".to_string(),
        source: "DownloadClientCheck".to_string(),
        level: HealthLevel::Warning,
        message: "No download client is available".to_string(),
        wiki_url: None,
    });
    assert!(!config.accepts(&warning));

    config.include_health_warnings = true;
    assert!(config.accepts(&warning));
    Ok(())
}

/// Test: Every notification listens for test events, disabled ones accept nothing
#[tokio::test]
async fn test_subscriptions_and_enabled_flag() -> Result<()> {
    let quiet = NotificationConfig::new("quiet", NotificationType::Email, Settings::new());
    assert_eq!(quiet.subscribed_events(), vec![EventType::Test]);

    let mut off =
        NotificationConfig::new("off", NotificationType::Email, Settings::new()).subscribe_all();
    off.enabled = false;
    assert!(!off.accepts(&NotificationEvent::new(EventType::Grab)));
    Ok(())
}

/// Test: Test events are supported by every provider capability set
#[tokio::test]
async fn test_capabilities_always_allow_test() -> Result<()> {
    let capabilities = ProviderCapabilities::default();
    assert!(capabilities.supports(EventType::Test));
    assert!(!capabilities.supports(EventType::Grab));
    assert!(ProviderCapabilities::all_events().supports(EventType::Grab));
    Ok(())
}

/// Test: Blank required settings are reported by field name
#[tokio::test]
async fn test_required_settings() -> Result<()> {
    let fields = vec![
        ConfigField::new("webhookUrl", "Webhook URL", FieldType::Url).required(),
        ConfigField::new("username", "Username", FieldType::Text),
    ];

    let err = assert_err!(Settings::new().with("webhookUrl", "  ").check_required(&fields));
    assert_eq!(err.to_string(), "Validation error: webhookUrl: is required");

    let settings = Settings::new().with("webhookUrl", "https://example.com/hook");
    assert_ok!(settings.check_required(&fields));
    Ok(())
}

/// Test: Notification types parse case-insensitively
#[tokio::test]
async fn test_notification_type_parsing() -> Result<()> {
    assert_eq!("Discord".parse::<NotificationType>()?, NotificationType::Discord);
    assert_err!("carrier-pigeon".parse::<NotificationType>());
    Ok(())
}

/// Test: Backoff doubles from the initial delay and saturates at the cap
#[tokio::test]
async fn test_backoff_delays() -> Result<()> {
    let config = RetryConfig::default();
    let delays: Vec<u64> = (1..=8)
        .map(|attempt| config.backoff_delay(attempt).as_secs())
        .collect();

    assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 60, 60]);
    assert_eq!(config.backoff_delay(u32::MAX), config.max_delay);
    Ok(())
}

/// Test: Without a condition every error is retryable
#[tokio::test]
async fn test_default_retry_condition_retries_everything() -> Result<()> {
    let config = RetryConfig::default();

    assert!(config.is_retryable(&NotificationError::transient("flaky")));
    assert!(config.is_retryable(&NotificationError::permanent("rejected")));
    assert!(config.is_retryable(&NotificationError::validation("webhookUrl", "bad")));
    assert!(config.is_retryable(&NotificationError::from_status(400, "bad request")));
    Ok(())
}

/// Test: Error hints and custom conditions are opt-in
#[tokio::test]
async fn test_retry_conditions_are_opt_in() -> Result<()> {
    let hints = RetryConfig::default().honour_error_hints();
    assert!(!hints.is_retryable(&NotificationError::permanent("rejected")));
    assert!(!hints.is_retryable(&NotificationError::from_status(400, "bad request")));
    assert!(hints.is_retryable(&NotificationError::from_status(503, "unavailable")));
    assert!(hints.is_retryable(&NotificationError::Cancelled));

    let never = RetryConfig::default().with_condition(|_| false);
    assert!(!never.is_retryable(&NotificationError::transient("flaky")));
    Ok(())
}

/// Test: Overrides replace only the fields they set
#[tokio::test]
async fn test_retry_override_keeps_unset_fields() -> Result<()> {
    let base = RetryConfig::default();
    let config = RetryOverride {
        max_retries: Some(2),
        ..Default::default()
    }
    .apply(&base);

    assert_eq!(config.max_retries, 2);
    assert_eq!(config.initial_delay, base.initial_delay);
    assert_eq!(config.max_delay, base.max_delay);
    Ok(())
}

/// Test: Status codes decide the retryable hint of provider errors
#[tokio::test]
async fn test_status_code_hints() -> Result<()> {
    assert!(NotificationError::from_status(503, "unavailable").is_retryable());
    assert!(NotificationError::from_status(429, "slow down").is_retryable());
    assert!(NotificationError::from_status(408, "timeout").is_retryable());
    assert!(!NotificationError::from_status(401, "unauthorized").is_retryable());
    assert_eq!(
        NotificationError::from_status(404, "gone").status_code(),
        Some(404)
    );
    Ok(())
}

/// Test: Aggregated handler errors list every failure
#[tokio::test]
async fn test_handler_errors_display() -> Result<()> {
    let errors = HandlerErrors(vec![
        HandlerFailure {
            handler: "email".to_string(),
            error: "smtp down".to_string(),
        },
        HandlerFailure {
            handler: "discord".to_string(),
            error: "panicked".to_string(),
        },
    ]);

    assert_eq!(errors.len(), 2);
    assert_eq!(
        errors.to_string(),
        "2 handler(s) failed; email: smtp down; discord: panicked"
    );
    Ok(())
}
