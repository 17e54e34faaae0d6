//! Discussion policy settings shared by the orchestrator and prompt rendering.

use serde::{Deserialize, Serialize};

use crate::persona::preset;

/// Literal token a persona appends to vote for ending the debate.
pub const COMPLETION_MARKER: &str = "<DISCUSSION_COMPLETE>";

/// Hard upper bound on iterations when the personas decide when to stop.
///
/// Independent of `max_turns_per_agent` and not configurable.
pub const AGENT_DRIVEN_ITERATION_CEILING: usize = 10;

/// How the debate decides when to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscussionMode {
    /// Run exactly `max_turns_per_agent` iterations.
    Fixed,
    /// Stop once both personas emit the completion marker in one iteration.
    #[default]
    AgentDriven,
}

/// Settings that shape a discussion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscussionSettings {
    pub mode: DiscussionMode,
    /// Iterations per run in [`DiscussionMode::Fixed`].
    pub max_turns_per_agent: usize,
    pub agent_a_system_prompt: String,
    pub agent_b_system_prompt: String,
}

impl DiscussionSettings {
    /// Number of iterations a run may execute under these settings.
    pub fn max_iterations(&self) -> usize {
        match self.mode {
            DiscussionMode::Fixed => self.max_turns_per_agent,
            DiscussionMode::AgentDriven => AGENT_DRIVEN_ITERATION_CEILING,
        }
    }
}

impl Default for DiscussionSettings {
    fn default() -> Self {
        Self {
            mode: DiscussionMode::AgentDriven,
            max_turns_per_agent: 2,
            agent_a_system_prompt: preset::agent_a_system_prompt(),
            agent_b_system_prompt: preset::agent_b_system_prompt(),
        }
    }
}
