use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chat_relay_sdk::{ProviderError, RelayErrorBody};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The request body is missing or malformed.
    #[error("Invalid request: {0}")]
    InvalidInput(String),
    #[error("Unknown vendor: {0}")]
    UnknownVendor(String),
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("Search error: {0}")]
    Search(#[source] reqwest::Error),
    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

impl RelayError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::UnknownVendor(_) => StatusCode::NOT_FOUND,
            Self::Provider(_) | Self::Search(_) | Self::Encode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> RelayErrorBody {
        let (error, details) = match self {
            Self::InvalidInput(details) => ("Invalid request body", Some(details.clone())),
            Self::UnknownVendor(vendor) => ("Unknown chat vendor", Some(vendor.clone())),
            Self::Provider(error) => ("Error processing your request", Some(error.to_string())),
            Self::Search(_) | Self::Encode(_) => ("Internal Server Error", None),
        };

        RelayErrorBody {
            error: error.to_string(),
            details,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        (status, Json(self.body())).into_response()
    }
}
