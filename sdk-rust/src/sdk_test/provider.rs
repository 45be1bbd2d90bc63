use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use crate::{ChatMessage, ChatProvider, DeltaStream, ProviderError, ProviderResult, StreamDelta};

/// Scripted outcome of one mocked `stream` call.
pub enum MockStreamResult {
    /// Yields each delta, then the end marker.
    Deltas(Vec<String>),
    /// Fails before any delta is produced.
    Error(ProviderError),
    /// Yields each delta, then fails as if the connection dropped.
    DeltasThenError(Vec<String>, ProviderError),
    /// Yields each delta, then never produces another item.
    DeltasThenStall(Vec<String>),
}

impl MockStreamResult {
    /// Construct a result that yields the provided deltas.
    pub fn deltas<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Deltas(deltas.into_iter().map(Into::into).collect())
    }

    /// Construct a result that yields the provided error.
    pub fn error(error: ProviderError) -> Self {
        Self::Error(error)
    }
}

impl From<ProviderError> for MockStreamResult {
    fn from(error: ProviderError) -> Self {
        Self::error(error)
    }
}

enum Tail {
    End,
    Error(ProviderError),
    Stall,
}

#[derive(Default)]
struct MockProviderState {
    mocked_stream_results: VecDeque<MockStreamResult>,
    tracked_stream_inputs: Vec<Vec<ChatMessage>>,
}

/// A provider that tracks inputs and replays enqueued stream results.
pub struct MockProvider {
    provider: &'static str,
    model_id: String,
    state: Mutex<MockProviderState>,
    dropped_streams: Arc<AtomicUsize>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            provider: "mock",
            model_id: "mock-model".to_string(),
            state: Mutex::new(MockProviderState::default()),
            dropped_streams: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the provider identifier returned by the mock.
    pub fn set_provider(&mut self, provider: &'static str) {
        self.provider = provider;
    }

    /// Enqueue one mocked stream result.
    pub fn enqueue_stream<R>(&self, result: R) -> &Self
    where
        R: Into<MockStreamResult>,
    {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.mocked_stream_results.push_back(result.into());
        drop(state);
        self
    }

    /// Conversations received by `stream` so far.
    pub fn tracked_stream_inputs(&self) -> Vec<Vec<ChatMessage>> {
        let state = self.state.lock().expect("mock state poisoned");
        state.tracked_stream_inputs.clone()
    }

    /// Number of returned streams that have been dropped, whether they ran
    /// to completion or were abandoned.
    pub fn dropped_streams(&self) -> usize {
        self.dropped_streams.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ChatProvider for MockProvider {
    fn provider(&self) -> &'static str {
        self.provider
    }

    fn model_id(&self) -> String {
        self.model_id.clone()
    }

    async fn stream(&self, messages: Vec<ChatMessage>) -> ProviderResult<DeltaStream> {
        let mut state = self.state.lock().expect("mock state poisoned");

        let result = state.mocked_stream_results.pop_front().ok_or_else(|| {
            ProviderError::Invariant(self.provider, "no mocked stream results available".into())
        })?;

        state.tracked_stream_inputs.push(messages);
        drop(state);

        let guard = DropCounter(self.dropped_streams.clone());
        match result {
            MockStreamResult::Error(error) => Err(error),
            MockStreamResult::Deltas(deltas) => Ok(scripted_stream(deltas, Tail::End, guard)),
            MockStreamResult::DeltasThenError(deltas, error) => {
                Ok(scripted_stream(deltas, Tail::Error(error), guard))
            }
            MockStreamResult::DeltasThenStall(deltas) => {
                Ok(scripted_stream(deltas, Tail::Stall, guard))
            }
        }
    }
}

struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn scripted_stream(deltas: Vec<String>, tail: Tail, guard: DropCounter) -> DeltaStream {
    let stream = async_stream::stream! {
        let _guard = guard;

        for delta in deltas {
            yield Ok(StreamDelta::Text(delta));
        }

        match tail {
            Tail::End => {
                yield Ok(StreamDelta::End);
            }
            Tail::Error(error) => {
                yield Err(error);
            }
            Tail::Stall => {
                futures::future::pending::<()>().await;
            }
        }
    };

    DeltaStream::from_stream(stream)
}
