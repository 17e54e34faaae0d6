use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use colored::Colorize;
use rustyline::Editor;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use tokio::sync::mpsc;

use duet_application::{DiscussionSession, SettingsProviderResolver};
use duet_core::DuetError;
use duet_core::discussion::DiscussionMode;
use duet_execution::{DiscussionEvent, TracingConfig, init_tracing};
use duet_infrastructure::TomlSettingsRepository;

mod command;
mod transcript;

use command::{COMMAND_NAMES, Command, HELP};
use transcript::Transcript;

/// Completion, highlighting and hints for slash commands.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMAND_NAMES.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return Ok((0, vec![]));
        }
        let candidates = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd.clone(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// One line of the live trace.
fn format_event(event: &DiscussionEvent) -> String {
    let mut fields: Vec<_> = event.fields.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));
    let mut line = format!("· {} {}", event.level, event.message);
    for (name, value) in fields {
        match value.as_str() {
            Some(text) => line.push_str(&format!(" {name}={text}")),
            None => line.push_str(&format!(" {name}={value}")),
        }
    }
    line
}

fn report(err: &DuetError) {
    let text = match err {
        DuetError::Busy => "A discussion is already running. Use /cancel to stop it.".to_string(),
        DuetError::NoFailedStep => "Nothing to retry.".to_string(),
        other => format!("Error: {other}"),
    };
    eprintln!("{}", text.red());
}

/// Applies one command. Returns `false` when the REPL should exit.
async fn dispatch(session: &DiscussionSession, trace: &AtomicBool, command: Command) -> bool {
    match command {
        Command::Submit(text) => {
            if let Err(err) = session.submit(&text, None).await {
                report(&err);
            }
        }
        Command::Cancel => {
            if session.is_running() {
                session.cancel().await;
            } else {
                println!("{}", "Nothing is running.".bright_black());
            }
        }
        Command::Retry => {
            if let Err(err) = session.retry_failed_step().await {
                report(&err);
            }
        }
        Command::New => {
            let previous = session.start_new_conversation().await;
            tracing::debug!(conversation_id = %previous.id, "previous conversation discarded");
        }
        Command::ShowNotepad => {
            let document = session.snapshot().conversation.document;
            if document.is_empty() {
                println!("{}", "(the notepad is empty)".bright_black());
            } else {
                println!("{}", document.white());
            }
        }
        Command::Edit(text) => {
            let in_flight = session.snapshot().in_flight_turn.is_some();
            session.edit_document(text);
            if in_flight {
                println!(
                    "{}",
                    "The notepad will be replaced when the current turn ends.".bright_black()
                );
            }
        }
        Command::Mode(mode) => {
            let mut settings = session.settings().await;
            settings.discussion.mode = mode;
            match session.update_settings(settings).await {
                Ok(()) => {
                    let label = match mode {
                        DiscussionMode::Fixed => "fixed",
                        DiscussionMode::AgentDriven => "agent-driven",
                    };
                    println!("{}", format!("Discussion mode: {label}").bright_green());
                }
                Err(err) => report(&err),
            }
        }
        Command::Turns(turns) => {
            let mut settings = session.settings().await;
            settings.discussion.max_turns_per_agent = turns;
            let mode = settings.discussion.mode;
            match session.update_settings(settings).await {
                Ok(()) => {
                    println!("{}", format!("Turns per agent: {turns}").bright_green());
                    if mode == DiscussionMode::AgentDriven {
                        println!("{}", "(only used in fixed mode)".bright_black());
                    }
                }
                Err(err) => report(&err),
            }
        }
        Command::Models => match session.list_models().await {
            Ok(models) => {
                let settings = session.settings().await.provider;
                let current = settings
                    .active_provider()
                    .map(|provider| settings.model_for(provider).to_string());
                for model in models {
                    if current.as_deref() == Some(model.as_str()) {
                        println!("{}", format!("* {model}").bright_green());
                    } else {
                        println!("  {model}");
                    }
                }
            }
            Err(err) => report(&err),
        },
        Command::ToggleTrace => {
            let enabled = !trace.fetch_xor(true, Ordering::Relaxed);
            let state = if enabled { "on" } else { "off" };
            println!("{}", format!("Trace {state}").bright_black());
        }
        Command::Help => println!("{}", HELP.bright_black()),
        Command::Quit => return false,
    }
    true
}

/// Entry point for the `duet` REPL.
///
/// Loads settings, starts a session, prints the conversation as it changes
/// and feeds user input to the session.
#[tokio::main]
async fn main() -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    init_tracing(TracingConfig {
        stderr: std::env::var_os("RUST_LOG").is_some(),
        events: Some(event_tx),
    })?;

    let repository = Arc::new(TomlSettingsRepository::new()?);
    let config_path = repository.path().to_path_buf();
    let session = Arc::new(
        DiscussionSession::load(repository, Arc::new(SettingsProviderResolver)).await?,
    );

    // Print every conversation change.
    let mut updates = session.subscribe();
    let renderer = tokio::spawn(async move {
        let mut transcript = Transcript::new();
        loop {
            let state = updates.borrow_and_update().clone();
            for block in transcript.render(&state) {
                println!("{block}\n");
            }
            if updates.changed().await.is_err() {
                break;
            }
        }
    });

    let trace = Arc::new(AtomicBool::new(false));
    let trace_enabled = trace.clone();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if trace_enabled.load(Ordering::Relaxed) {
                println!("{}", format_event(&event).bright_black());
            }
        }
    });

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== Duet ===".bright_magenta().bold());
    let provider = session.settings().await.provider;
    match provider.active_provider() {
        Some(active) => println!(
            "{}",
            format!("Provider: {} ({})", active.as_str(), provider.model_for(active)).bright_black()
        ),
        None => println!(
            "{}",
            format!(
                "No provider is configured. Set GEMINI_API_KEY or edit {}",
                config_path.display()
            )
            .yellow()
        ),
    }
    println!("{}", "Type a request, or /help for commands.".bright_black());
    println!();

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                match command::parse(&line) {
                    Ok(Some(command)) => {
                        if !dispatch(&session, &trace, command).await {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(usage) => eprintln!("{}", usage.yellow()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                if session.is_running() {
                    session.cancel().await;
                } else {
                    println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
                }
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        }
    }

    session.cancel().await;
    if let Err(err) = session.wait_for_run().await {
        report(&err);
    }
    // Dropping the session closes the watch channel and lets the renderer drain.
    drop(session);
    let _ = renderer.await;
    println!("{}", "Goodbye!".bright_green());

    Ok(())
}
