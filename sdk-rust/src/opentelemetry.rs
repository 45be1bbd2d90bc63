use crate::{ChatMessage, DeltaStream, ProviderResult, StreamDelta};
use futures::StreamExt;
use opentelemetry::trace::Status;
use std::time::Instant;
use tracing::{info_span, Span};
use tracing_futures::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Span covering one provider stream, from the request until the last delta.
pub struct StreamSpan {
    span: Span,
    start_time: Instant,
    time_to_first_delta: Option<f64>,
    delta_count: u64,
    ended: bool,
}

impl StreamSpan {
    pub fn new(provider: &str, model_id: &str, messages: &[ChatMessage]) -> Self {
        let span = info_span!("chat_relay.stream");
        span.set_attribute("gen_ai.operation.name", "chat");
        span.set_attribute("gen_ai.provider.name", provider.to_string());
        span.set_attribute("gen_ai.request.model", model_id.to_string());
        span.set_attribute(
            "chat_relay.message_count",
            i64::try_from(messages.len()).unwrap_or(i64::MAX),
        );

        Self {
            span,
            start_time: Instant::now(),
            time_to_first_delta: None,
            delta_count: 0,
            ended: false,
        }
    }

    fn span(&self) -> Span {
        self.span.clone()
    }

    pub async fn instrument_future<F>(&self, future: F) -> F::Output
    where
        F: std::future::Future,
    {
        future.instrument(self.span()).await
    }

    pub fn on_delta(&mut self, delta: &StreamDelta) {
        if let StreamDelta::Text(_) = delta {
            self.delta_count += 1;
            if self.time_to_first_delta.is_none() {
                self.time_to_first_delta = Some(self.start_time.elapsed().as_secs_f64());
            }
        }
    }

    pub fn on_error(&mut self, error: &(dyn std::error::Error + 'static)) {
        self.span
            .set_attribute("exception.message", error.to_string());
        self.span.set_status(Status::error(error.to_string()));
        tracing::error!(parent: &self.span, error = %error, "provider stream failed");
    }

    pub fn on_end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        if let Some(time_to_first_delta) = self.time_to_first_delta {
            self.span
                .set_attribute("gen_ai.server.time_to_first_token", time_to_first_delta);
        }
        self.span.set_attribute(
            "chat_relay.delta_count",
            i64::try_from(self.delta_count).unwrap_or(i64::MAX),
        );
    }
}

impl Drop for StreamSpan {
    fn drop(&mut self) {
        self.on_end();
    }
}

pub async fn trace_stream<F, Fut>(
    provider: &str,
    model_id: &str,
    messages: Vec<ChatMessage>,
    f: F,
) -> ProviderResult<DeltaStream>
where
    F: FnOnce(Vec<ChatMessage>) -> Fut,
    Fut: std::future::Future<Output = ProviderResult<DeltaStream>>,
{
    let mut span = StreamSpan::new(provider, model_id, &messages);
    let stream_result = span.instrument_future(f(messages)).await;

    match stream_result {
        Ok(mut stream) => {
            let span_handle = span.span();
            let instrumented = async_stream::try_stream! {
                let mut span_state = span;

                while let Some(item) = stream.next().await {
                    match item {
                        Ok(delta) => {
                            span_state.on_delta(&delta);
                            yield delta;
                        }
                        Err(err) => {
                            span_state.on_error(&err);
                            Err(err)?;
                        }
                    }
                }
            }
            .instrument(span_handle);

            Ok(DeltaStream::from_stream(instrumented))
        }
        Err(error) => {
            span.on_error(&error);
            span.on_end();
            Err(error)
        }
    }
}
