//! Turn prompt rendering.
//!
//! Each persona turn receives one flat prompt: its system prompt, the running
//! discussion, the user's request, the notepad instructions with the current
//! document, the completion instruction (agent-driven runs only) and a short
//! cue telling the persona it is up.

use duet_core::conversation::Message;
use duet_core::discussion::{COMPLETION_MARKER, DiscussionMode, DiscussionSettings};
use duet_core::persona::Persona;
use duet_core::{DuetError, Result};
use minijinja::Environment;
use serde::Serialize;

const TURN_TEMPLATE_NAME: &str = "turn_prompt";

const TURN_TEMPLATE: &str = r#"{{ system_prompt }}

[DISCUSSION HISTORY]
{% for entry in history -%}
{{ entry.sender }}: {{ entry.text }}
{% endfor %}
[USER QUERY]
{{ user_query }}

You share a notepad with your partner.
Current notepad content:
---
{{ document }}
---
How to edit the notepad:
1. Put edit tags directly in your response. Everything outside the tags is what you say to your partner.
2. Leave the tags out entirely when the notepad needs no change.
3. Tag content is used exactly as written, line breaks included; start it right after the opening tag and end it right before the closing tag.
4. Tag names are case-insensitive; attribute names are case-sensitive; attribute values must be double-quoted.

Available tags:
- <np-replace-all>new full content</np-replace-all> replaces everything.
- <np-append>text</np-append> adds text at the end.
- <np-prepend>text</np-prepend> adds text at the beginning.
- <np-insert line="N">text</np-insert> inserts a new line after line N (1-based; 0 inserts at the top).
- <np-replace line="N">text</np-replace> replaces line N.
- <np-delete line="N" /> deletes line N.
- <np-search-replace find="old" with="new" all="true" /> replaces literal text; all defaults to false (first match only).

Example:
I tightened the summary.
<np-delete line="1" />
<np-append>- Conclusion: ship the smaller design first.</np-append>
{% if agent_driven %}
When you believe the topic has been explored well enough for a final answer, end your message with {{ completion_marker }} (after any notepad tags). Leave it out if the discussion should continue.
{% endif %}
{{ turn_cue }}"#;

/// Everything needed to render one turn's prompt.
#[derive(Debug, Clone, Copy)]
pub struct TurnPromptInput<'a> {
    pub persona: Persona,
    pub settings: &'a DiscussionSettings,
    /// Messages before the turn's own placeholder; pending ones are skipped.
    pub history: &'a [Message],
    pub user_query: &'a str,
    pub document: &'a str,
}

#[derive(Serialize)]
struct HistoryEntry {
    sender: String,
    text: String,
}

#[derive(Serialize)]
struct TurnContext<'a> {
    system_prompt: &'a str,
    history: Vec<HistoryEntry>,
    user_query: &'a str,
    document: &'a str,
    agent_driven: bool,
    completion_marker: &'a str,
    turn_cue: &'static str,
}

/// Renders persona turn prompts from a compiled template.
#[derive(Debug)]
pub struct PromptBuilder {
    env: Environment<'static>,
}

impl PromptBuilder {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template(TURN_TEMPLATE_NAME, TURN_TEMPLATE)
            .map_err(|e| DuetError::internal(format!("Invalid turn prompt template: {e}")))?;
        Ok(Self { env })
    }

    pub fn render_turn(&self, input: TurnPromptInput<'_>) -> Result<String> {
        let system_prompt = match input.persona {
            Persona::AgentA => &input.settings.agent_a_system_prompt,
            Persona::AgentB => &input.settings.agent_b_system_prompt,
        };
        let history = input
            .history
            .iter()
            .filter(|m| !m.pending)
            .map(|m| HistoryEntry {
                sender: m.sender.to_string(),
                text: m.text.clone(),
            })
            .collect();

        let context = TurnContext {
            system_prompt,
            history,
            user_query: input.user_query,
            document: input.document,
            agent_driven: input.settings.mode == DiscussionMode::AgentDriven,
            completion_marker: COMPLETION_MARKER,
            turn_cue: turn_cue(input.persona),
        };

        self.env
            .get_template(TURN_TEMPLATE_NAME)
            .and_then(|template| template.render(&context))
            .map_err(|e| DuetError::internal(format!("Failed to render turn prompt: {e}")))
    }
}

fn turn_cue(persona: Persona) -> &'static str {
    match persona {
        Persona::AgentA => {
            "Analyst, it's your turn. Address Skeptic's last point (if any) and continue the analysis. Your response:"
        }
        Persona::AgentB => {
            "Skeptic, it's your turn. Challenge Analyst's last statement. Your response:"
        }
    }
}
