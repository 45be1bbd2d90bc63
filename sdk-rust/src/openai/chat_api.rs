//! Wire shapes of the OpenAI-compatible Chat Completions streaming API.
//! Groq serves the same shapes with an extra `x_groq` object.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct CreateChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatCompletionRequestMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequestMessage {
    pub role: ChatCompletionRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatCompletionRole {
    User,
    Assistant,
}

/// Every `data:` payload the vendor may send on a streaming completion.
/// Anything else fails to deserialize.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChatCompletionStreamPayload {
    Chunk(CreateChatCompletionStreamResponse),
    Error(ChatCompletionStreamError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChatCompletionStreamResponse {
    /// Never read; requiring it rejects payloads that are not stream chunks.
    #[allow(dead_code)]
    pub object: ChatCompletionChunkObject,
    pub choices: Vec<ChatCompletionStreamChoice>,
    #[serde(default)]
    pub usage: Option<CompletionUsage>,
    #[serde(default)]
    pub x_groq: Option<GroqStreamExtension>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum ChatCompletionChunkObject {
    #[serde(rename = "chat.completion.chunk")]
    ChatCompletionChunk,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionStreamChoice {
    pub delta: ChatCompletionStreamResponseDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionStreamResponseDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub refusal: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroqStreamExtension {
    #[serde(default)]
    pub usage: Option<CompletionUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionStreamError {
    pub error: ChatCompletionErrorObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionErrorObject {
    pub message: String,
}
