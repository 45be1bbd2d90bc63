use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The request to the provider failed or the connection dropped while
    /// reading the response.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The request returns a non-OK status code
    #[error("Status error: {1} (Status {0})")]
    StatusCode(reqwest::StatusCode, String),
    /// A vendor chunk did not match any known response shape.
    #[error("Unrecognized chunk from {0}: {1}")]
    Normalization(&'static str, String),
    /// The vendor reported an error inside an otherwise healthy stream.
    #[error("Error from {0}: {1}")]
    Upstream(&'static str, String),
    /// The response from the provider was unexpected (e.g. broken SSE
    /// framing).
    #[error("Invariant from {0}: {1}")]
    Invariant(&'static str, String),
    /// The model refused to process the input.
    #[error("Refusal: {0}")]
    Refusal(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failures observed by the consumer of the relay's event stream.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The relay answered with its non-streaming JSON error body.
    #[error("Relay error: {error} (Status {status})")]
    Relay {
        status: reqwest::StatusCode,
        error: String,
        details: Option<String>,
    },
    /// The event stream closed before a `done` event arrived.
    #[error("Stream ended before the turn completed")]
    Interrupted,
    #[error("A turn is already in flight")]
    TurnInFlight,
}

pub type ClientResult<T> = Result<T, ClientError>;
