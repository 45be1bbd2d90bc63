use crate::config::{RelayConfig, VendorConfig};
use chat_relay_sdk::{
    openai::{OpenAIChatProvider, OpenAIChatProviderOptions},
    ChatProvider,
};
use std::{collections::HashMap, sync::Arc};

/// Chat providers reachable under `/api/chat/{vendor}`.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ChatProvider>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every vendor that has credentials in `config`.
    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        let mut registry = Self::new();

        if let Some(openai) = &config.openai {
            registry = registry.with_provider("openai", Arc::new(build_provider("openai", openai)));
        }
        if let Some(groq) = &config.groq {
            registry = registry.with_provider("groq", Arc::new(build_provider("groq", groq)));
        }

        registry
    }

    #[must_use]
    pub fn with_provider(mut self, vendor: impl Into<String>, provider: Arc<dyn ChatProvider>) -> Self {
        let vendor = vendor.into();
        tracing::info!(vendor = %vendor, model = %provider.model_id(), "chat vendor registered");
        self.providers.insert(vendor, provider);
        self
    }

    #[must_use]
    pub fn get(&self, vendor: &str) -> Option<Arc<dyn ChatProvider>> {
        self.providers.get(vendor).cloned()
    }

    pub fn vendors(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}

fn build_provider(name: &'static str, config: &VendorConfig) -> OpenAIChatProvider {
    OpenAIChatProvider::new(
        config.model.clone(),
        OpenAIChatProviderOptions {
            provider: Some(name),
            base_url: Some(config.base_url.clone()),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            ..Default::default()
        },
    )
}
