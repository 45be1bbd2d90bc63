use crate::ProviderError;
use eventsource_stream::Eventsource;
use futures::{stream::StreamExt, Stream};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::pin::Pin;

/// Create a JSON request that returns an SSE stream.
/// Throws error on non OK status code.
async fn send_sse<T: Serialize>(
    client: &Client,
    url: &str,
    data: &T,
    headers: reqwest::header::HeaderMap,
) -> Result<
    impl StreamExt<
        Item = Result<
            eventsource_stream::Event,
            eventsource_stream::EventStreamError<reqwest::Error>,
        >,
    >,
    ProviderError,
> {
    let response = client.post(url).headers(headers).json(data).send().await?;

    let status = response.status();
    if status.is_success() {
        Ok(response.bytes_stream().eventsource())
    } else {
        Err(ProviderError::StatusCode(
            status,
            response.text().await.unwrap_or_default(),
        ))
    }
}

/// Create a JSON request that returns a typed stream of parsed chunks.
/// Handles SSE parsing, JSON deserialization, and error conversion.
/// The stream ends on "[DONE]" or when the vendor closes the body.
pub async fn send_sse_stream<T: Serialize + 'static, R: DeserializeOwned + Send + 'static>(
    client: &Client,
    url: &str,
    data: &T,
    headers: reqwest::header::HeaderMap,
    provider: &'static str,
) -> Result<Pin<Box<dyn Stream<Item = Result<R, ProviderError>> + Send>>, ProviderError> {
    let mut sse_stream = send_sse(client, url, data, headers).await?;

    let stream = async_stream::try_stream! {
        while let Some(event) = sse_stream.next().await {
            let event = event.map_err(|error| map_event_error(provider, error))?;

            match event.data.as_str() {
                "" => continue,
                "[DONE]" => break,
                data => {
                    let chunk: R = serde_json::from_str(data).map_err(|e| {
                        ProviderError::Normalization(
                            provider,
                            format!("Failed to parse stream chunk: {e}"),
                        )
                    })?;
                    yield chunk;
                }
            }
        }
    };

    Ok(Box::pin(stream))
}

fn map_event_error(
    provider: &'static str,
    error: eventsource_stream::EventStreamError<reqwest::Error>,
) -> ProviderError {
    match error {
        eventsource_stream::EventStreamError::Utf8(_) => ProviderError::Invariant(
            provider,
            "Receive invalid UTF-8 sequence for stream data".to_string(),
        ),
        eventsource_stream::EventStreamError::Parser(error) => {
            ProviderError::Invariant(provider, format!("Receive invalid EventStream data: {error}"))
        }
        eventsource_stream::EventStreamError::Transport(error) => ProviderError::Transport(error),
    }
}
