mod artifacts;
mod client;
mod client_utils;
mod errors;
mod ndjson;
pub mod openai;
mod opentelemetry;
mod provider;
pub mod sdk_test;
mod session;
mod types;

pub use artifacts::{extract_artifacts, ArtifactScanner};
pub use client::{consume_event_stream, RelayClient, RelayClientOptions};
pub use errors::*;
pub use ndjson::LineDecoder;
pub use provider::{ChatProvider, DeltaStream, StreamDelta};
pub use session::{ChatSession, MessageId, MessageRecord};
pub use types::*;
