//! Conversation message types.
//!
//! This module contains types for representing messages in a discussion log,
//! including senders, purposes and the placeholder state of an in-flight turn.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Text shown for a message whose turn is still generating.
pub const PLACEHOLDER_TEXT: &str = "...";

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sender {
    /// The human asking the question.
    User,
    /// The analytical persona.
    AgentA,
    /// The skeptical persona.
    AgentB,
    /// Orchestrator notices (consensus, cancellation, retry results).
    System,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Sender::User => "User",
            Sender::AgentA => "Analyst",
            Sender::AgentB => "Skeptic",
            Sender::System => "System",
        };
        f.write_str(label)
    }
}

/// Why a message exists in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessagePurpose {
    UserInput,
    AgentToAgent,
    FinalAnswer,
    Error,
    SystemNotice,
}

/// A single entry in a discussion log.
///
/// Messages are final once written, with one exception: a `pending` message
/// created for an in-flight turn is resolved in place by the turn that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier (UUID format)
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub purpose: MessagePurpose,
    /// Timestamp when the message was created (ISO 8601 format).
    pub timestamp: String,
    /// Time the model took to produce this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Attached image as a data URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// True while the owning turn is outstanding.
    #[serde(default)]
    pub pending: bool,
}

impl Message {
    fn new(sender: Sender, purpose: MessagePurpose, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            text: text.into(),
            purpose,
            timestamp: chrono::Utc::now().to_rfc3339(),
            duration_ms: None,
            image: None,
            pending: false,
        }
    }

    /// A user request, optionally with an attached image.
    pub fn user(text: impl Into<String>, image: Option<String>) -> Self {
        Self {
            image,
            ..Self::new(Sender::User, MessagePurpose::UserInput, text)
        }
    }

    /// A placeholder for a turn that has not produced text yet.
    pub fn placeholder(sender: Sender, purpose: MessagePurpose) -> Self {
        Self {
            pending: true,
            ..Self::new(sender, purpose, PLACEHOLDER_TEXT)
        }
    }

    /// An informational notice from the orchestrator.
    pub fn system_notice(text: impl Into<String>) -> Self {
        Self::new(Sender::System, MessagePurpose::SystemNotice, text)
    }

    /// An error notice from the orchestrator.
    pub fn system_error(text: impl Into<String>) -> Self {
        Self::new(Sender::System, MessagePurpose::Error, text)
    }

    pub fn is_error(&self) -> bool {
        self.purpose == MessagePurpose::Error
    }
}
