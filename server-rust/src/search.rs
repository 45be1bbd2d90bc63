use crate::{
    config::{SearchBackendConfig, SearchConfig},
    errors::RelayError,
};
use chat_relay_sdk::{SearchResult, SearchSource};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};

/// Proxies web search queries to Serper and Brave.
pub struct SearchClient {
    client: reqwest::Client,
    config: SearchConfig,
}

impl SearchClient {
    #[must_use]
    pub fn new(config: SearchConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, config: SearchConfig) -> Self {
        Self { client, config }
    }

    /// Queries every backend selected by `source`, in Serper then Brave
    /// order. A backend answering with a non-success status contributes no
    /// result; a transport failure fails the whole search.
    pub async fn search(
        &self,
        query: &str,
        source: SearchSource,
    ) -> Result<Vec<SearchResult>, RelayError> {
        if query.trim().is_empty() {
            return Err(RelayError::InvalidInput("query must not be empty".to_string()));
        }

        let mut results = Vec::new();

        if source.includes(SearchSource::Serper) {
            match &self.config.serper {
                Some(serper) => {
                    if let Some(data) = self.serper(serper, query).await? {
                        results.push(SearchResult {
                            source: SearchSource::Serper,
                            data,
                        });
                    }
                }
                None => tracing::warn!("SERPER_API_KEY is not set; skipping serper"),
            }
        }

        if source.includes(SearchSource::Brave) {
            match &self.config.brave {
                Some(brave) => {
                    if let Some(data) = self.brave(brave, query).await? {
                        results.push(SearchResult {
                            source: SearchSource::Brave,
                            data,
                        });
                    }
                }
                None => tracing::warn!("BRAVE_SEARCH_API_KEY is not set; skipping brave"),
            }
        }

        tracing::debug!(results = results.len(), ?source, "search finished");
        Ok(results)
    }

    async fn serper(
        &self,
        backend: &SearchBackendConfig,
        query: &str,
    ) -> Result<Option<Value>, RelayError> {
        let response = self
            .client
            .post(&backend.endpoint)
            .header("X-API-KEY", &backend.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({ "q": query }))
            .send()
            .await
            .map_err(RelayError::Search)?;

        read_success("serper", response).await
    }

    async fn brave(
        &self,
        backend: &SearchBackendConfig,
        query: &str,
    ) -> Result<Option<Value>, RelayError> {
        let url = format!("{}?q={}", backend.endpoint, urlencoding::encode(query));
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header("X-Subscription-Token", &backend.api_key)
            .send()
            .await
            .map_err(RelayError::Search)?;

        read_success("brave", response).await
    }
}

async fn read_success(
    backend: &'static str,
    response: reqwest::Response,
) -> Result<Option<Value>, RelayError> {
    let status = response.status();
    if !status.is_success() {
        tracing::debug!(backend, %status, "search backend returned no result");
        return Ok(None);
    }

    response.json().await.map(Some).map_err(RelayError::Search)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let client = SearchClient::new(SearchConfig::default());
        let result = client.search("   ", SearchSource::All).await;
        assert!(matches!(result, Err(RelayError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn unconfigured_backends_yield_no_results() {
        let client = SearchClient::new(SearchConfig::default());
        let results = client.search("rust", SearchSource::All).await.unwrap();
        assert!(results.is_empty());
    }
}
