use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use tracing::info;

use crate::{
    error::{NotificationError, Result},
    models::provider::{ConfigField, NotificationType, ProviderCapabilities},
    providers::Provider,
};

/// Provider metadata for configuration screens.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub name: String,
    pub provider_type: NotificationType,
    pub config_fields: Vec<ConfigField>,
    pub capabilities: ProviderCapabilities,
    pub supports_retry: bool,
}

/// Maps a channel type to its provider implementation.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<NotificationType, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider` under its own type, replacing any previous one.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let provider_type = provider.notification_type();
        info!(provider = provider.name(), provider_type = %provider_type, "Provider registered");
        self.providers.insert(provider_type, provider);
    }

    pub fn with(mut self, provider: Arc<dyn Provider>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, provider_type: NotificationType) -> Result<Arc<dyn Provider>> {
        self.providers
            .get(&provider_type)
            .cloned()
            .ok_or_else(|| NotificationError::UnknownProvider(provider_type.to_string()))
    }

    pub fn contains(&self, provider_type: NotificationType) -> bool {
        self.providers.contains_key(&provider_type)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn types(&self) -> Vec<NotificationType> {
        self.providers.keys().copied().collect()
    }

    pub fn info(&self) -> Vec<ProviderInfo> {
        let mut infos: Vec<ProviderInfo> = self
            .providers
            .values()
            .map(|provider| ProviderInfo {
                name: provider.name().to_string(),
                provider_type: provider.notification_type(),
                config_fields: provider.config_fields(),
                capabilities: provider.capabilities(),
                supports_retry: provider.supports_retry(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }
}
