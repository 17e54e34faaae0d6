//! Conversation state and its reducer.
//!
//! Every change to the active conversation is expressed as a
//! [`ConversationUpdate`] and folded in by [`ConversationState::reduce`]; there
//! is no other writer.

use serde::{Deserialize, Serialize};

use super::failed_step::FailedStep;
use super::message::{Message, MessagePurpose, PLACEHOLDER_TEXT};
use super::model::Conversation;

/// Everything a front-end needs to render the active conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub conversation: Conversation,
    /// The most recent retryable failure, if any.
    pub failed_step: Option<FailedStep>,
    /// True from the start of a run (or retry) until it settles.
    pub running: bool,
    /// Message id of the turn currently waiting on the model.
    pub in_flight_turn: Option<String>,
    /// A user edit that arrived during a turn, applied when that turn ends.
    pub deferred_edit: Option<String>,
}

/// A single legal mutation of [`ConversationState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationUpdate {
    /// Append a message to the log.
    Append(Message),
    /// Mark `message_id` as the turn now waiting on the model.
    BeginTurn { message_id: String },
    /// Resolve a pending message to final text and install the patched document.
    ResolveTurn {
        message_id: String,
        text: String,
        duration_ms: u64,
        document: String,
    },
    /// Rewrite a turn's message to the error state.
    FailTurn { message_id: String, text: String },
    /// End the in-flight turn without touching its message.
    AbandonTurn,
    /// Put an existing message back into the placeholder state.
    Reopen {
        message_id: String,
        purpose: MessagePurpose,
    },
    /// Remove every still-pending message.
    DropPending,
    /// A user edit of the notepad.
    EditDocument(String),
    SetFailedStep(Option<FailedStep>),
    SetRunning(bool),
    /// Install a different conversation, discarding run bookkeeping.
    Replace(Conversation),
}

impl ConversationState {
    pub fn new(conversation: Conversation) -> Self {
        Self {
            conversation,
            failed_step: None,
            running: false,
            in_flight_turn: None,
            deferred_edit: None,
        }
    }

    /// Folds one update into the state.
    pub fn reduce(&mut self, update: ConversationUpdate) {
        match update {
            ConversationUpdate::Append(message) => self.conversation.push(message),
            ConversationUpdate::BeginTurn { message_id } => {
                self.in_flight_turn = Some(message_id);
            }
            ConversationUpdate::ResolveTurn {
                message_id,
                text,
                duration_ms,
                document,
            } => {
                match self.conversation.message_mut(&message_id) {
                    Some(message) => {
                        message.text = text;
                        message.duration_ms = Some(duration_ms);
                        message.pending = false;
                    }
                    None => tracing::debug!(%message_id, "resolved turn for unknown message"),
                }
                self.conversation.document = document;
                self.end_turn();
            }
            ConversationUpdate::FailTurn { message_id, text } => {
                if let Some(message) = self.conversation.message_mut(&message_id) {
                    message.text = text;
                    message.purpose = MessagePurpose::Error;
                    message.pending = false;
                }
                self.end_turn();
            }
            ConversationUpdate::AbandonTurn => self.end_turn(),
            ConversationUpdate::Reopen {
                message_id,
                purpose,
            } => {
                if let Some(message) = self.conversation.message_mut(&message_id) {
                    message.text = PLACEHOLDER_TEXT.to_string();
                    message.purpose = purpose;
                    message.duration_ms = None;
                    message.pending = true;
                }
            }
            ConversationUpdate::DropPending => {
                if self.conversation.has_pending() {
                    self.conversation.messages.retain(|m| !m.pending);
                }
            }
            ConversationUpdate::EditDocument(content) => {
                if self.in_flight_turn.is_some() {
                    self.deferred_edit = Some(content);
                } else {
                    self.conversation.document = content;
                }
            }
            ConversationUpdate::SetFailedStep(step) => self.failed_step = step,
            ConversationUpdate::SetRunning(running) => self.running = running,
            ConversationUpdate::Replace(conversation) => {
                *self = ConversationState::new(conversation);
            }
        }
        self.conversation.updated_at = chrono::Utc::now().to_rfc3339();
    }

    /// Clears the in-flight marker; a deferred user edit wins over the turn's patch.
    fn end_turn(&mut self) {
        self.in_flight_turn = None;
        if let Some(content) = self.deferred_edit.take() {
            self.conversation.document = content;
        }
    }
}
