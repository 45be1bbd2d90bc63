//! Extraction of fenced code blocks from assistant output.
//!
//! The artifact list is always a function of the full text accumulated so
//! far. A fence that has been opened but not yet closed contributes nothing:
//! its region only shows up once the closing fence arrives.

use crate::{Artifact, ArtifactKind, ArtifactMetadata};

const FENCE: &str = "```";
const DEFAULT_LANGUAGE: &str = "plaintext";

/// Splits `text` into an ordered list of text and code artifacts.
///
/// Returns an empty list when `text` contains no fence at all, so callers
/// can fall back to rendering the raw text.
#[must_use]
pub fn extract_artifacts(text: &str) -> Vec<Artifact> {
    let mut scanner = ArtifactScanner::new();
    scanner.push(text)
}

/// Incremental form of [`extract_artifacts`].
///
/// Everything up to the end of the last closed fence can no longer change as
/// more text is appended, so those artifacts are kept and only the tail is
/// rescanned on each [`push`](Self::push). The output is identical to calling
/// [`extract_artifacts`] on the accumulated text.
#[derive(Debug, Default, Clone)]
pub struct ArtifactScanner {
    text: String,
    confirmed: Vec<Artifact>,
    /// Byte offset right after the last closed fence.
    resume_at: usize,
    /// Start of an opening fence in the tail that has no closing fence yet.
    dangling_at: Option<usize>,
    saw_fence: bool,
}

impl ArtifactScanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `delta` and returns the artifacts for the whole text so far.
    pub fn push(&mut self, delta: &str) -> Vec<Artifact> {
        self.text.push_str(delta);
        self.advance();
        self.artifacts()
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }

    /// Artifacts for the text accumulated so far.
    #[must_use]
    pub fn artifacts(&self) -> Vec<Artifact> {
        if !self.saw_fence {
            return Vec::new();
        }

        let mut artifacts = self.confirmed.clone();
        let tail_end = self.dangling_at.unwrap_or(self.text.len());
        let tail = self.text[self.resume_at..tail_end].trim();
        if !tail.is_empty() {
            artifacts.push(text_artifact(artifacts.len(), tail));
        }
        artifacts
    }

    fn advance(&mut self) {
        self.dangling_at = None;

        loop {
            match find_fence(&self.text, self.resume_at) {
                FenceMatch::Closed(block) => {
                    self.saw_fence = true;

                    let before = self.text[self.resume_at..block.start].trim();
                    if !before.is_empty() {
                        let artifact = text_artifact(self.confirmed.len(), before);
                        self.confirmed.push(artifact);
                    }

                    let language = &self.text[block.language.0..block.language.1];
                    let content = self.text[block.content.0..block.content.1].trim();
                    let artifact = code_artifact(self.confirmed.len(), language, content);
                    self.confirmed.push(artifact);

                    self.resume_at = block.end;
                }
                FenceMatch::Open(start) => {
                    self.saw_fence = true;
                    self.dangling_at = Some(start);
                    break;
                }
                FenceMatch::None => break,
            }
        }
    }
}

/// Byte ranges of one complete fenced block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FencedBlock {
    start: usize,
    language: (usize, usize),
    content: (usize, usize),
    end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceMatch {
    Closed(FencedBlock),
    Open(usize),
    None,
}

fn find_fence(text: &str, from: usize) -> FenceMatch {
    let Some(offset) = text[from..].find(FENCE) else {
        return FenceMatch::None;
    };
    let start = from + offset;
    let language_start = start + FENCE.len();
    let language_len = text[language_start..]
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    let language_end = language_start + language_len;

    match text[language_end..].find(FENCE) {
        Some(close) => {
            let content_end = language_end + close;
            FenceMatch::Closed(FencedBlock {
                start,
                language: (language_start, language_end),
                content: (language_end, content_end),
                end: content_end + FENCE.len(),
            })
        }
        None => FenceMatch::Open(start),
    }
}

fn text_artifact(index: usize, content: &str) -> Artifact {
    Artifact {
        id: format!("{}-{index}", ArtifactKind::Text.as_str()),
        kind: ArtifactKind::Text,
        content: content.to_string(),
        metadata: None,
    }
}

fn code_artifact(index: usize, language: &str, content: &str) -> Artifact {
    let language = if language.is_empty() {
        DEFAULT_LANGUAGE
    } else {
        language
    };

    Artifact {
        id: format!("{}-{index}", ArtifactKind::Code.as_str()),
        kind: ArtifactKind::Code,
        content: content.to_string(),
        metadata: Some(ArtifactMetadata {
            language: language.to_string(),
        }),
    }
}
