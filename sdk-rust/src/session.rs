use crate::{Artifact, ChatMessage, ClientError, ClientResult, Role, StreamEvent};

pub type MessageId = u64;

/// A message as shown in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub artifacts: Vec<Artifact>,
}

/// Transcript of one chat plus the state of the turn currently streaming.
///
/// At most one turn is in flight. The in-progress assistant message is the
/// only record that events ever touch.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<MessageRecord>,
    in_flight: Option<MessageId>,
    next_id: MessageId,
}

impl ChatSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> &[MessageRecord] {
        &self.messages
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The assistant message of the turn in flight, if any.
    #[must_use]
    pub fn in_progress(&self) -> Option<&MessageRecord> {
        let id = self.in_flight?;
        self.messages.iter().rev().find(|m| m.id == id)
    }

    /// Conversation to send to the relay: every message except the
    /// in-progress assistant placeholder.
    #[must_use]
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .filter(|m| Some(m.id) != self.in_flight)
            .map(|m| ChatMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }

    /// Records the user's message and an empty assistant message, and marks
    /// the turn in flight. Returns the conversation to send.
    pub fn begin_turn(&mut self, text: impl Into<String>) -> ClientResult<Vec<ChatMessage>> {
        if self.in_flight.is_some() {
            return Err(ClientError::TurnInFlight);
        }

        let user_id = self.push(Role::User, text.into());
        let assistant_id = self.push(Role::Assistant, String::new());
        self.in_flight = Some(assistant_id);
        tracing::debug!(user_id, assistant_id, "turn started");

        Ok(self.history())
    }

    /// Replaces the in-progress message's text and artifacts with the
    /// event's cumulative state. Deltas are never appended directly.
    pub fn apply_event(&mut self, event: &StreamEvent) -> Option<&MessageRecord> {
        let id = self.in_flight?;
        let record = self.messages.iter_mut().rev().find(|m| m.id == id)?;
        record.content = event.complete_message().to_string();
        record.artifacts = event.artifacts().to_vec();
        Some(record)
    }

    /// Ends the turn and keeps the assistant message.
    pub fn complete_turn(&mut self) {
        self.in_flight = None;
    }

    /// Ends the turn and drops the assistant message, leaving the user's
    /// message as the last entry.
    pub fn fail_turn(&mut self) {
        if let Some(id) = self.in_flight.take() {
            self.messages.retain(|m| m.id != id);
            tracing::debug!(assistant_id = id, "turn failed; assistant message removed");
        }
    }

    fn push(&mut self, role: Role, content: String) -> MessageId {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(MessageRecord {
            id,
            role,
            content,
            artifacts: Vec::new(),
        });
        id
    }
}
