//! Slash command parsing.

use duet_core::discussion::DiscussionMode;

/// Names offered by completion and hints.
pub const COMMAND_NAMES: &[&str] = &[
    "/cancel", "/retry", "/new", "/notepad", "/edit", "/mode", "/turns", "/models", "/trace",
    "/help", "/quit",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text: start a discussion.
    Submit(String),
    Cancel,
    Retry,
    New,
    ShowNotepad,
    /// Replace the notepad; `\n` in the argument becomes a line break.
    Edit(String),
    Mode(DiscussionMode),
    Turns(usize),
    Models,
    ToggleTrace,
    Help,
    Quit,
}

/// Parses one input line. `Ok(None)` means there is nothing to do.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed == "quit" || trimmed == "exit" {
        return Ok(Some(Command::Quit));
    }
    if !trimmed.starts_with('/') {
        return Ok(Some(Command::Submit(trimmed.to_string())));
    }

    let (name, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (trimmed, ""),
    };

    let command = match name {
        "/cancel" => Command::Cancel,
        "/retry" => Command::Retry,
        "/new" => Command::New,
        "/notepad" => Command::ShowNotepad,
        "/edit" => Command::Edit(arg.replace("\\n", "\n")),
        "/mode" => match arg {
            "fixed" => Command::Mode(DiscussionMode::Fixed),
            "agent" => Command::Mode(DiscussionMode::AgentDriven),
            _ => return Err("Usage: /mode fixed|agent".to_string()),
        },
        "/turns" => match arg.parse::<usize>() {
            Ok(turns) if turns > 0 => Command::Turns(turns),
            _ => return Err("Usage: /turns <n> (n >= 1)".to_string()),
        },
        "/models" => Command::Models,
        "/trace" => Command::ToggleTrace,
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        other => return Err(format!("Unknown command: {other}")),
    };
    Ok(Some(command))
}

pub const HELP: &str = "\
Type a request to start a discussion between the Analyst and the Skeptic.
  /cancel          stop the running discussion (Ctrl-C also works)
  /retry           replay the turn that failed
  /new             start a new conversation
  /notepad         show the shared notepad
  /edit <text>     replace the notepad (use \\n for line breaks)
  /mode fixed|agent
  /turns <n>       iterations per run in fixed mode
  /models          list models of the active provider
  /trace           toggle the live event trace
  /quit";
