use serde::{Deserialize, Serialize};

use crate::persona::Persona;

/// Retryable record of the most recent turn failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedStep {
    /// Message that was rewritten to the error state.
    pub message_id: String,
    /// The exact prompt that was sent; retry replays it unchanged.
    pub prompt: String,
    pub persona: Persona,
}
