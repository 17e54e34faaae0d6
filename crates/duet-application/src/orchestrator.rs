//! Discussion orchestrator.
//!
//! Drives one run of the debate: AgentA then AgentB per iteration, until the
//! iteration bound, a consensus in agent-driven mode, a failure or a cancel.
//! Also replays a failed turn on request.

use std::sync::Arc;

use duet_core::DuetError;
use duet_core::conversation::{ConversationHolder, ConversationUpdate, FailedStep, Message};
use duet_core::discussion::{DiscussionMode, DiscussionSettings};
use duet_core::persona::Persona;
use duet_core::provider::{ModelProvider, ProviderError};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::prompt::{PromptBuilder, TurnPromptInput};
use crate::turn::TurnExecutor;

pub const CONSENSUS_NOTICE: &str = "Both agents have signaled to end the discussion.";
pub const CANCELLED_NOTICE: &str = "Generation stopped by user.";
pub const RETRY_SUCCESS_NOTICE: &str =
    "Retry successful. The discussion can continue from here or you can guide it.";

/// How a run (or a retry) settled.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The loop finished; `consensus` is true when both personas agreed to stop.
    Complete { consensus: bool, iterations: usize },
    /// The user cancelled.
    Cancelled,
    /// A turn failed; its message now shows the error.
    Failed { message_id: String, error: DuetError },
    /// A failed turn was replayed successfully.
    Retried { message_id: String },
}

/// Why a persona turn did not produce output.
enum TurnFailure {
    Cancelled,
    Failed {
        message_id: String,
        prompt: Option<String>,
        error: DuetError,
    },
}

/// Runs discussions against one provider with one settings snapshot.
///
/// Bound to the conversation that was active when it was created; once that
/// conversation is replaced its writes are dropped.
pub struct DiscussionOrchestrator {
    holder: Arc<ConversationHolder>,
    conversation_id: String,
    provider: Arc<dyn ModelProvider>,
    prompts: Arc<PromptBuilder>,
    settings: DiscussionSettings,
}

impl DiscussionOrchestrator {
    pub fn new(
        holder: Arc<ConversationHolder>,
        provider: Arc<dyn ModelProvider>,
        prompts: Arc<PromptBuilder>,
        settings: DiscussionSettings,
    ) -> Self {
        let conversation_id = holder.snapshot().conversation.id;
        Self {
            holder,
            conversation_id,
            provider,
            prompts,
            settings,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    fn update(&self, update: ConversationUpdate) {
        self.holder.apply_to(&self.conversation_id, update);
    }

    /// Records the user's request and clears any previous failure.
    ///
    /// The caller must already own the running flag.
    pub fn begin(&self, user_message: Message) {
        self.update(ConversationUpdate::Append(user_message));
        self.update(ConversationUpdate::SetFailedStep(None));
    }

    /// Runs the debate loop for `user_query` and settles the conversation.
    pub async fn run(&self, user_query: &str, cancel: &CancellationToken) -> RunOutcome {
        let conversation_id = &self.conversation_id;
        tracing::info!(
            %conversation_id,
            mode = ?self.settings.mode,
            max_iterations = self.settings.max_iterations(),
            provider = self.provider.name(),
            "discussion run started"
        );

        let span = tracing::info_span!("discussion_run", %conversation_id);
        let outcome = self.drive(user_query, cancel).instrument(span).await;
        self.settle(&outcome);

        match &outcome {
            RunOutcome::Failed { message_id, error } => {
                tracing::warn!(%conversation_id, %message_id, %error, "discussion run failed");
            }
            other => tracing::info!(%conversation_id, outcome = ?other, "discussion run settled"),
        }
        outcome
    }

    async fn drive(&self, user_query: &str, cancel: &CancellationToken) -> RunOutcome {
        let max_iterations = self.settings.max_iterations();

        for iteration in 1..=max_iterations {
            let mut signals = [false; 2];
            for (slot, persona) in [Persona::AgentA, Persona::AgentB].into_iter().enumerate() {
                if cancel.is_cancelled() {
                    return RunOutcome::Cancelled;
                }
                tracing::info!(iteration, %persona, "turn started");

                match self.persona_turn(persona, user_query, cancel).await {
                    Ok(saw_signal) => signals[slot] = saw_signal,
                    Err(TurnFailure::Cancelled) => return RunOutcome::Cancelled,
                    Err(TurnFailure::Failed {
                        message_id,
                        prompt,
                        error,
                    }) => {
                        self.record_failure(&message_id, prompt, persona, &error);
                        return RunOutcome::Failed { message_id, error };
                    }
                }
            }

            if self.settings.mode == DiscussionMode::AgentDriven && signals.iter().all(|s| *s) {
                self.update(ConversationUpdate::Append(Message::system_notice(CONSENSUS_NOTICE)));
                return RunOutcome::Complete {
                    consensus: true,
                    iterations: iteration,
                };
            }
        }

        RunOutcome::Complete {
            consensus: false,
            iterations: max_iterations,
        }
    }

    /// Appends the persona's placeholder, renders its prompt and runs the turn.
    async fn persona_turn(
        &self,
        persona: Persona,
        user_query: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, TurnFailure> {
        let placeholder = Message::placeholder(persona.sender(), persona.message_purpose());
        let message_id = placeholder.id.clone();
        self.update(ConversationUpdate::Append(placeholder));

        let state = self.holder.snapshot();
        if state.conversation.id != self.conversation_id {
            return Err(TurnFailure::Cancelled);
        }
        let document = state.conversation.document;
        let prompt = self
            .prompts
            .render_turn(TurnPromptInput {
                persona,
                settings: &self.settings,
                history: &state.conversation.messages,
                user_query,
                document: &document,
            })
            .map_err(|error| TurnFailure::Failed {
                message_id: message_id.clone(),
                prompt: None,
                error,
            })?;

        let executor = TurnExecutor::new(self.provider.as_ref(), &self.holder, &self.conversation_id);
        match executor
            .run_turn(&prompt, &document, cancel, persona, &message_id)
            .await
        {
            Ok(output) => Ok(output.saw_completion_signal),
            Err(ProviderError::Cancelled) => Err(TurnFailure::Cancelled),
            Err(err) => Err(TurnFailure::Failed {
                message_id,
                prompt: Some(prompt),
                error: DuetError::Provider(err),
            }),
        }
    }

    /// Rewrites the message to the error state and records the retryable step.
    fn record_failure(
        &self,
        message_id: &str,
        prompt: Option<String>,
        persona: Persona,
        error: &DuetError,
    ) {
        self.update(ConversationUpdate::FailTurn {
            message_id: message_id.to_string(),
            text: error_text(error),
        });
        // A render failure has no prompt to replay.
        if let Some(prompt) = prompt {
            self.update(ConversationUpdate::SetFailedStep(Some(FailedStep {
                    message_id: message_id.to_string(),
                    prompt,
                    persona,
                })));
        }
    }

    fn settle(&self, outcome: &RunOutcome) {
        self.update(ConversationUpdate::AbandonTurn);
        self.update(ConversationUpdate::DropPending);
        if matches!(outcome, RunOutcome::Cancelled) {
            self.update(ConversationUpdate::Append(Message::system_notice(CANCELLED_NOTICE)));
        }
        self.update(ConversationUpdate::SetRunning(false));
    }

    /// Replays `step`'s prompt against the same message and the current document.
    ///
    /// Never resumes the debate loop. The caller must already own the running flag.
    pub async fn retry(&self, step: FailedStep, cancel: &CancellationToken) -> RunOutcome {
        let state = self.holder.snapshot();
        let previous_text = state
            .conversation
            .message(&step.message_id)
            .map(|m| m.text.clone())
            .unwrap_or_default();
        let document = state.conversation.document;

        tracing::info!(message_id = %step.message_id, persona = %step.persona, "retrying failed turn");
        self.update(ConversationUpdate::Reopen {
            message_id: step.message_id.clone(),
            purpose: step.persona.message_purpose(),
        });

        let executor = TurnExecutor::new(self.provider.as_ref(), &self.holder, &self.conversation_id);
        let result = executor
            .run_turn(&step.prompt, &document, cancel, step.persona, &step.message_id)
            .await;

        let outcome = match result {
            Ok(_) => {
                self.update(ConversationUpdate::SetFailedStep(None));
                self.update(ConversationUpdate::Append(Message::system_notice(
                    RETRY_SUCCESS_NOTICE,
                )));
                RunOutcome::Retried {
                    message_id: step.message_id,
                }
            }
            Err(ProviderError::Cancelled) => {
                self.update(ConversationUpdate::FailTurn {
                    message_id: step.message_id,
                    text: previous_text,
                });
                self.update(ConversationUpdate::Append(Message::system_notice(CANCELLED_NOTICE)));
                RunOutcome::Cancelled
            }
            Err(err) => {
                let error = DuetError::Provider(err);
                tracing::warn!(message_id = %step.message_id, %error, "retry failed");
                self.update(ConversationUpdate::FailTurn {
                    message_id: step.message_id.clone(),
                    text: error_text(&error),
                });
                RunOutcome::Failed {
                    message_id: step.message_id,
                    error,
                }
            }
        };

        self.update(ConversationUpdate::SetRunning(false));
        outcome
    }
}

/// Text shown in a failed turn's message.
fn error_text(error: &DuetError) -> String {
    match error {
        DuetError::Provider(inner) => format!("Error: {inner}"),
        other => format!("Error: {other}"),
    }
}
