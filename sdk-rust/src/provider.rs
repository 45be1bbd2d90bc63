use std::{
    pin::Pin,
    task::{Context, Poll},
};

use crate::{ChatMessage, ProviderResult};
use futures::Stream;

/// One normalized item of a vendor's token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamDelta {
    /// A non-empty fragment of assistant text.
    Text(String),
    /// The vendor finished the stream. Always the last item of a
    /// successful stream.
    End,
}

#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    fn provider(&self) -> &'static str;
    fn model_id(&self) -> String;
    /// Opens one streaming completion for `messages`. No retry is attempted:
    /// a failed connection is returned as is.
    async fn stream(&self, messages: Vec<ChatMessage>) -> ProviderResult<DeltaStream>;
}

pub struct DeltaStream(Pin<Box<dyn Stream<Item = ProviderResult<StreamDelta>> + Send>>);

impl DeltaStream {
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = ProviderResult<StreamDelta>> + Send + 'static,
    {
        Self(Box::pin(stream))
    }
}

impl Stream for DeltaStream {
    type Item = ProviderResult<StreamDelta>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.0.as_mut().poll_next(cx)
    }
}
