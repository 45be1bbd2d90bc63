use crate::{
    config::{ConfigError, RelayConfig},
    errors::RelayError,
    registry::ProviderRegistry,
    relay::open_relay,
    search::SearchClient,
};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{
        header::{AUTHORIZATION, CACHE_CONTROL, CONNECTION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chat_relay_sdk::{ChatRequest, SearchRequest, SearchResponse};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub providers: Arc<ProviderRegistry>,
    pub search: Arc<SearchClient>,
}

impl AppState {
    #[must_use]
    pub fn new(providers: ProviderRegistry, search: SearchClient) -> Self {
        Self {
            providers: Arc::new(providers),
            search: Arc::new(search),
        }
    }

    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            ProviderRegistry::from_config(config),
            SearchClient::new(config.search.clone()),
        )
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/api/chat/{vendor}", post(chat_handler))
        .route("/api/search", post(search_handler))
        .with_state(state)
}

/// CORS policy letting the browser app at `app_url` call the relay.
pub fn cors_layer(app_url: &str) -> Result<CorsLayer, ConfigError> {
    let origin = app_url
        .parse::<HeaderValue>()
        .map_err(|_| ConfigError::InvalidValue {
            name: "APP_URL",
            value: app_url.to_string(),
        })?;

    Ok(CorsLayer::new()
        .allow_origin([origin])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true))
}

async fn home_handler() -> &'static str {
    "chat-relay-server is running"
}

async fn chat_handler(
    State(state): State<AppState>,
    Path(vendor): Path<String>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, RelayError> {
    let Json(request) = body.map_err(|rejection| RelayError::InvalidInput(rejection.body_text()))?;
    if request.messages.is_empty() {
        return Err(RelayError::InvalidInput("messages must not be empty".to_string()));
    }

    let provider = state
        .providers
        .get(&vendor)
        .ok_or_else(|| RelayError::UnknownVendor(vendor.clone()))?;

    tracing::info!(
        vendor = %vendor,
        model = %provider.model_id(),
        messages = request.messages.len(),
        "chat turn started"
    );

    let events = open_relay(provider, request.messages).await?;

    Ok((
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
            (CONNECTION, "keep-alive"),
        ],
        Body::from_stream(events),
    )
        .into_response())
}

async fn search_handler(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, RelayError> {
    let Json(request) = body.map_err(|rejection| RelayError::InvalidInput(rejection.body_text()))?;
    let results = state.search.search(&request.query, request.source).await?;

    Ok(Json(SearchResponse { results }))
}
