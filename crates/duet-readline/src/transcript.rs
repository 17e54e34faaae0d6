//! Turns conversation snapshots into terminal output.
//!
//! The watch channel delivers whole states, so the transcript remembers what
//! it already printed and only emits the difference.

use std::collections::HashMap;

use colored::{Color, Colorize};
use duet_core::conversation::{ConversationState, Message, Sender};

#[derive(Debug, Default)]
pub struct Transcript {
    conversation_id: Option<String>,
    /// Message id to the text last printed for it.
    printed: HashMap<String, String>,
    document: Option<String>,
    failed_message_id: Option<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output blocks for everything that changed since the last call.
    pub fn render(&mut self, state: &ConversationState) -> Vec<String> {
        let mut out = Vec::new();
        let conversation = &state.conversation;

        if self.conversation_id.as_deref() != Some(conversation.id.as_str()) {
            if self.conversation_id.is_some() {
                out.push(format!("=== {} ===", conversation.title).bright_black().to_string());
            }
            self.conversation_id = Some(conversation.id.clone());
            self.printed.clear();
            self.document = Some(conversation.document.clone());
            self.failed_message_id = None;
        }

        for message in conversation.messages.iter().filter(|m| !m.pending) {
            if self.printed.get(&message.id) == Some(&message.text) {
                continue;
            }
            out.push(format_message(message));
            self.printed.insert(message.id.clone(), message.text.clone());
        }

        if self.document.as_deref() != Some(conversation.document.as_str()) {
            let lines = conversation.document.lines().count();
            out.push(
                format!("Notepad updated ({lines} lines). /notepad to view.")
                    .bright_black()
                    .to_string(),
            );
            self.document = Some(conversation.document.clone());
        }

        let failed = state.failed_step.as_ref().map(|step| step.message_id.clone());
        if failed.is_some() && failed != self.failed_message_id {
            out.push("Type /retry to replay the failed turn.".yellow().to_string());
        }
        self.failed_message_id = failed;

        out
    }
}

fn color_for(message: &Message) -> Color {
    if message.is_error() {
        return Color::Red;
    }
    match message.sender {
        Sender::User => Color::Green,
        Sender::AgentA => Color::BrightBlue,
        Sender::AgentB => Color::BrightMagenta,
        Sender::System => Color::Yellow,
    }
}

pub fn format_message(message: &Message) -> String {
    let mut header = format!("[{}]", message.sender);
    if let Some(ms) = message.duration_ms {
        header.push_str(&format!(" ({:.1}s)", ms as f64 / 1000.0));
    }

    let color = color_for(message);
    let mut block = header.color(color).bold().to_string();
    for line in message.text.lines() {
        block.push('\n');
        block.push_str(&line.color(color).to_string());
    }
    block
}
