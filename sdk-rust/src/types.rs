use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author of a message in the conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A role-tagged message as sent to the relay and on to the vendor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Body of a relay chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Text,
    Code,
}

impl ArtifactKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactMetadata {
    pub language: String,
}

/// A classified segment of assistant output: plain text, or the body of a
/// fenced code block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artifact {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ArtifactMetadata>,
}

impl Artifact {
    /// Language tag of a code artifact. `None` for text.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.metadata.as_ref().map(|m| m.language.as_str())
    }
}

/// One newline-delimited record of the relay's output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    #[serde(rename_all = "camelCase")]
    Chunk {
        content: String,
        complete_message: String,
        artifacts: Vec<Artifact>,
    },
    #[serde(rename_all = "camelCase")]
    Done {
        complete_message: String,
        artifacts: Vec<Artifact>,
    },
}

impl StreamEvent {
    #[must_use]
    pub fn complete_message(&self) -> &str {
        match self {
            Self::Chunk {
                complete_message, ..
            }
            | Self::Done {
                complete_message, ..
            } => complete_message,
        }
    }

    #[must_use]
    pub fn artifacts(&self) -> &[Artifact] {
        match self {
            Self::Chunk { artifacts, .. } | Self::Done { artifacts, .. } => artifacts,
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

/// Non-streaming error body returned by the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Search backends proxied by the relay.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    Serper,
    Brave,
    #[default]
    All,
}

impl SearchSource {
    #[must_use]
    pub fn includes(self, other: Self) -> bool {
        self == Self::All || self == other
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub source: SearchSource,
}

/// Raw payload of one search backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub source: SearchSource,
    pub data: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}
