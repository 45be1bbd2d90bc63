//! Bridges one provider stream to the newline-delimited JSON event stream
//! sent to the browser.

use crate::errors::RelayError;
use bytes::Bytes;
use chat_relay_sdk::{
    ArtifactScanner, ChatMessage, ChatProvider, DeltaStream, ProviderError, ProviderResult,
    StreamDelta, StreamEvent,
};
use futures::{stream::BoxStream, Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Instrument;

/// Encoded events buffered between the provider and a slow client.
const EVENT_BUFFER: usize = 16;

/// Maps provider deltas to relay events: one `chunk` per non-empty delta,
/// carrying the accumulated text and the artifacts recomputed from it, then
/// a single `done`.
///
/// A provider stream that stops without its end marker is reported as an
/// error rather than a `done`.
pub fn relay_events(
    provider: &'static str,
    mut deltas: DeltaStream,
) -> impl Stream<Item = ProviderResult<StreamEvent>> + Send + 'static {
    async_stream::try_stream! {
        let mut scanner = ArtifactScanner::new();
        let mut finished = false;

        while let Some(delta) = deltas.next().await {
            match delta? {
                StreamDelta::Text(text) => {
                    if text.is_empty() {
                        continue;
                    }
                    let artifacts = scanner.push(&text);
                    yield StreamEvent::Chunk {
                        content: text,
                        complete_message: scanner.text().to_string(),
                        artifacts,
                    };
                }
                StreamDelta::End => {
                    finished = true;
                    break;
                }
            }
        }

        if !finished {
            Err(ProviderError::Invariant(
                provider,
                "stream closed without an end marker".to_string(),
            ))?;
        }

        yield StreamEvent::Done {
            artifacts: scanner.artifacts(),
            complete_message: scanner.into_text(),
        };
    }
}

/// Serializes one event as a single JSON line.
pub fn encode_event(event: &StreamEvent) -> Result<Bytes, serde_json::Error> {
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

/// Opens a provider stream for `messages` and returns the encoded event
/// stream for the response body.
///
/// The first event is awaited here, so failures that happen before any
/// output (rejected request, connection refused, error as first stream item)
/// come back as `Err` and can still be answered with a JSON error. Later
/// failures surface as an `Err` item, which aborts the response body.
///
/// Events are produced by a spawned task. Dropping the returned stream (the
/// client went away) makes that task drop the provider stream, which closes
/// the upstream connection.
pub async fn open_relay(
    provider: Arc<dyn ChatProvider>,
    messages: Vec<ChatMessage>,
) -> Result<impl Stream<Item = Result<Bytes, RelayError>> + Send + 'static, RelayError> {
    let name = provider.provider();
    let deltas = provider.stream(messages).await?;
    let mut events = relay_events(name, deltas).boxed();

    let first = match events.next().await {
        Some(Ok(event)) => event,
        Some(Err(error)) => return Err(error.into()),
        None => {
            return Err(ProviderError::Invariant(name, "empty event stream".to_string()).into())
        }
    };
    let first = encode_event(&first)?;

    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
    let span = tracing::info_span!("chat_relay.relay", provider = name);
    tokio::spawn(pump(first, events, tx).instrument(span));

    Ok(async_stream::stream! {
        while let Some(item) = rx.recv().await {
            yield item;
        }
    })
}

async fn pump(
    first: Bytes,
    mut events: BoxStream<'static, ProviderResult<StreamEvent>>,
    tx: mpsc::Sender<Result<Bytes, RelayError>>,
) {
    if tx.send(Ok(first)).await.is_err() {
        tracing::warn!("client disconnected before the first event");
        return;
    }

    let mut sent: u64 = 1;
    loop {
        let next = tokio::select! {
            () = tx.closed() => {
                tracing::warn!(sent, "client disconnected; closing provider stream");
                return;
            }
            next = events.next() => next,
        };

        let (item, is_last) = match next {
            Some(Ok(event)) => {
                let is_done = event.is_done();
                (encode_event(&event).map_err(RelayError::from), is_done)
            }
            Some(Err(error)) => {
                tracing::error!(%error, sent, "provider stream failed mid-response");
                (Err(RelayError::from(error)), true)
            }
            None => return,
        };

        let failed = item.is_err();
        if tx.send(item).await.is_err() {
            tracing::warn!(sent, "client disconnected; closing provider stream");
            return;
        }
        sent += 1;

        if is_last || failed {
            tracing::info!(sent, completed = !failed, "relay finished");
            return;
        }
    }
}
