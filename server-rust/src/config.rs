use chat_relay_sdk::openai::{GROQ_BASE_URL, OPENAI_BASE_URL};
use std::env;
use thiserror::Error;

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_APP_URL: &str = "http://localhost:3000";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4-turbo-preview";
const DEFAULT_GROQ_MODEL: &str = "mixtral-8x7b-32768";
const GROQ_TEMPERATURE: f64 = 0.7;
const DEFAULT_SERPER_ENDPOINT: &str = "https://google.serper.dev/search";
const DEFAULT_BRAVE_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Settings for one chat vendor. A vendor without an API key is not
/// configured at all.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchBackendConfig {
    pub api_key: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchConfig {
    pub serper: Option<SearchBackendConfig>,
    pub brave: Option<SearchBackendConfig>,
}

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub port: u16,
    /// Origin allowed by CORS.
    pub app_url: String,
    pub openai: Option<VendorConfig>,
    pub groq: Option<VendorConfig>,
    pub search: SearchConfig,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match get("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "PORT",
                    value,
                })?,
            None => DEFAULT_PORT,
        };

        let openai = get("OPENAI_API_KEY").map(|api_key| VendorConfig {
            api_key,
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            temperature: None,
        });

        let groq = get("GROQ_API_KEY").map(|api_key| VendorConfig {
            api_key,
            model: get("GROQ_MODEL").unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
            base_url: get("GROQ_BASE_URL").unwrap_or_else(|| GROQ_BASE_URL.to_string()),
            temperature: Some(GROQ_TEMPERATURE),
        });

        let search = SearchConfig {
            serper: get("SERPER_API_KEY").map(|api_key| SearchBackendConfig {
                api_key,
                endpoint: get("SERPER_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_SERPER_ENDPOINT.to_string()),
            }),
            brave: get("BRAVE_SEARCH_API_KEY").map(|api_key| SearchBackendConfig {
                api_key,
                endpoint: get("BRAVE_SEARCH_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_BRAVE_ENDPOINT.to_string()),
            }),
        };

        Ok(Self {
            port,
            app_url: get("APP_URL").unwrap_or_else(|| DEFAULT_APP_URL.to_string()),
            openai,
            groq,
            search,
        })
    }
}
