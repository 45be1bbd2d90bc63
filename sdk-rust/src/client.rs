use crate::{
    ndjson::LineDecoder, ChatMessage, ChatRequest, ChatSession, ClientError, ClientResult,
    MessageRecord, RelayErrorBody, SearchRequest, SearchResponse, SearchResult, SearchSource,
    StreamEvent,
};
use bytes::Bytes;
use futures::{pin_mut, Stream, StreamExt};
use reqwest::{Client, Response};

const DEFAULT_BASE_URL: &str = "http://localhost:4000";

/// Reads the relay's newline-delimited event stream into `session`.
///
/// Each decoded event replaces the in-progress assistant message and is
/// reported to `on_update`. Malformed lines are logged and skipped. The turn
/// only succeeds if a `done` event arrives before the body ends; on any other
/// outcome the assistant message is removed from the transcript. Either way
/// the session is no longer in flight when this returns.
pub async fn consume_event_stream<S, E, F>(
    session: &mut ChatSession,
    body: S,
    mut on_update: F,
) -> ClientResult<()>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<ClientError>,
    F: FnMut(&MessageRecord),
{
    match read_events(session, body, &mut on_update).await {
        Ok(true) => {
            session.complete_turn();
            Ok(())
        }
        Ok(false) => {
            tracing::warn!("event stream ended without a done event");
            session.fail_turn();
            Err(ClientError::Interrupted)
        }
        Err(error) => {
            tracing::warn!(%error, "event stream failed");
            session.fail_turn();
            Err(error)
        }
    }
}

async fn read_events<S, E, F>(
    session: &mut ChatSession,
    body: S,
    on_update: &mut F,
) -> ClientResult<bool>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<ClientError>,
    F: FnMut(&MessageRecord),
{
    pin_mut!(body);
    let mut decoder = LineDecoder::new();
    let mut done = false;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(Into::into)?;
        for line in decoder.push(&chunk) {
            done |= handle_line(session, &line, done, on_update);
        }
    }

    if let Some(line) = decoder.finish() {
        done |= handle_line(session, &line, done, on_update);
    }

    Ok(done)
}

/// Returns whether the line was a `done` event.
fn handle_line<F>(session: &mut ChatSession, line: &[u8], after_done: bool, on_update: &mut F) -> bool
where
    F: FnMut(&MessageRecord),
{
    if after_done {
        tracing::debug!(bytes = line.len(), "ignoring line after done event");
        return false;
    }

    let Ok(line) = std::str::from_utf8(line) else {
        tracing::warn!(
            line = %String::from_utf8_lossy(line),
            "skipping stream line that is not valid UTF-8"
        );
        return false;
    };

    match serde_json::from_str::<StreamEvent>(line) {
        Ok(event) => {
            if let Some(record) = session.apply_event(&event) {
                on_update(record);
            }
            event.is_done()
        }
        Err(error) => {
            tracing::warn!(%error, line, "skipping malformed stream line");
            false
        }
    }
}

/// HTTP client for the relay's chat and search endpoints.
pub struct RelayClient {
    base_url: String,
    client: Client,
}

#[derive(Clone, Default)]
pub struct RelayClientOptions {
    pub base_url: Option<String>,
    pub client: Option<Client>,
}

impl RelayClient {
    #[must_use]
    pub fn new(options: RelayClientOptions) -> Self {
        let RelayClientOptions { base_url, client } = options;

        Self {
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client: client.unwrap_or_else(Client::new),
        }
    }

    /// Sends `text` as a new user turn to `vendor` and streams the reply
    /// into `session`.
    pub async fn send_message<F>(
        &self,
        session: &mut ChatSession,
        vendor: &str,
        text: impl Into<String>,
        on_update: F,
    ) -> ClientResult<()>
    where
        F: FnMut(&MessageRecord),
    {
        let messages = session.begin_turn(text)?;

        let response = match self.post_chat(vendor, messages).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, vendor, "chat request failed");
                session.fail_turn();
                return Err(error);
            }
        };

        consume_event_stream(session, response.bytes_stream(), on_update).await
    }

    pub async fn search(
        &self,
        query: impl Into<String>,
        source: SearchSource,
    ) -> ClientResult<Vec<SearchResult>> {
        let request = SearchRequest {
            query: query.into(),
            source,
        };
        let response = self
            .client
            .post(format!("{}/api/search", self.base_url))
            .json(&request)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body: SearchResponse = response.json().await?;
        Ok(body.results)
    }

    async fn post_chat(&self, vendor: &str, messages: Vec<ChatMessage>) -> ClientResult<Response> {
        let response = self
            .client
            .post(format!("{}/api/chat/{vendor}", self.base_url))
            .json(&ChatRequest { messages })
            .send()
            .await?;
        ensure_success(response).await
    }
}

async fn ensure_success(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<RelayErrorBody>(&text).unwrap_or(RelayErrorBody {
        error: text,
        details: None,
    });

    Err(ClientError::Relay {
        status,
        error: body.error,
        details: body.details,
    })
}
