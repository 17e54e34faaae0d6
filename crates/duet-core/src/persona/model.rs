//! Persona domain model.
//!
//! The debate always has exactly two personas: AgentA opens each iteration with
//! an analytical answer, AgentB challenges it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::conversation::{MessagePurpose, Sender};

/// One of the two debating roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Persona {
    /// The analytical persona; speaks first in every iteration.
    AgentA,
    /// The skeptical persona; answers AgentA.
    AgentB,
}

impl Persona {
    /// Display name used in prompts and synthesized messages.
    pub fn display_name(self) -> &'static str {
        match self {
            Persona::AgentA => "Analyst",
            Persona::AgentB => "Skeptic",
        }
    }

    /// The other persona in the debate.
    pub fn partner(self) -> Persona {
        match self {
            Persona::AgentA => Persona::AgentB,
            Persona::AgentB => Persona::AgentA,
        }
    }

    pub fn sender(self) -> Sender {
        match self {
            Persona::AgentA => Sender::AgentA,
            Persona::AgentB => Sender::AgentB,
        }
    }

    /// Purpose carried by this persona's debate messages.
    pub fn message_purpose(self) -> MessagePurpose {
        MessagePurpose::AgentToAgent
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
