//! Conversation domain model.

use super::message::{Message, Sender};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to a conversation before its first user message.
pub const DEFAULT_TITLE: &str = "New Chat";

const TITLE_MAX_CHARS: usize = 30;

/// A discussion: its message log plus the shared notepad document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier (UUID format)
    pub id: String,
    /// Human-readable title
    pub title: String,
    /// Timestamp when the conversation was created (ISO 8601 format)
    pub created_at: String,
    /// Timestamp of the last mutation (ISO 8601 format)
    pub updated_at: String,
    /// Ordered discussion log
    pub messages: Vec<Message>,
    /// Current notepad content
    pub document: String,
}

impl Conversation {
    /// Creates an empty conversation whose notepad starts as `initial_document`.
    pub fn new(initial_document: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            created_at: now.clone(),
            updated_at: now,
            messages: Vec::new(),
            document: initial_document.into(),
        }
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub(crate) fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// Whether any message is still waiting on its turn.
    pub fn has_pending(&self) -> bool {
        self.messages.iter().any(|m| m.pending)
    }

    /// Appends a message, deriving the title from the first user request.
    pub(crate) fn push(&mut self, message: Message) {
        if self.messages.is_empty() && message.sender == Sender::User {
            self.title = title_from(&message.text);
        }
        self.messages.push(message);
    }
}

fn title_from(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
