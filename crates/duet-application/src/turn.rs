//! Single persona turn.

use std::time::Instant;

use duet_core::conversation::{ConversationHolder, ConversationUpdate};
use duet_core::discussion::COMPLETION_MARKER;
use duet_core::patch::{self, PatchOperation};
use duet_core::persona::Persona;
use duet_core::provider::{ModelProvider, ProviderError};
use tokio_util::sync::CancellationToken;

/// Result of a successful turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutput {
    /// Spoken text written into the turn's message.
    pub final_text: String,
    /// `prior_document` with the turn's patch applied.
    pub new_document: String,
    pub duration_ms: u64,
    /// Whether the raw response carried the completion marker.
    pub saw_completion_signal: bool,
}

/// Runs one persona turn against a provider and folds the result into the holder.
///
/// On failure nothing but the in-flight marker is touched; the caller decides
/// how the failure shows up in the conversation. Writes only land while
/// `conversation_id` is still the active conversation.
pub struct TurnExecutor<'a> {
    provider: &'a dyn ModelProvider,
    holder: &'a ConversationHolder,
    conversation_id: &'a str,
}

impl<'a> TurnExecutor<'a> {
    pub fn new(
        provider: &'a dyn ModelProvider,
        holder: &'a ConversationHolder,
        conversation_id: &'a str,
    ) -> Self {
        Self {
            provider,
            holder,
            conversation_id,
        }
    }

    fn update(&self, update: ConversationUpdate) {
        self.holder.apply_to(self.conversation_id, update);
    }

    /// Sends `prompt`, parses the reply and resolves message `message_id` in place.
    ///
    /// # Errors
    ///
    /// [`ProviderError::Cancelled`] once `cancel` fires, an invalid-response error
    /// for an empty reply, or whatever the provider reported.
    pub async fn run_turn(
        &self,
        prompt: &str,
        prior_document: &str,
        cancel: &CancellationToken,
        persona: Persona,
        message_id: &str,
    ) -> Result<TurnOutput, ProviderError> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        self.update(ConversationUpdate::BeginTurn {
            message_id: message_id.to_string(),
        });
        let started = Instant::now();

        let raw = match self.receive(prompt, cancel).await {
            Ok(raw) => raw,
            Err(err) => {
                self.update(ConversationUpdate::AbandonTurn);
                return Err(err);
            }
        };

        let parsed = patch::parse(&raw);
        let saw_completion_signal = raw.contains(COMPLETION_MARKER);
        let spoken = parsed.spoken_text.replace(COMPLETION_MARKER, "");
        let spoken = spoken.trim();
        let final_text = if spoken.is_empty() && saw_completion_signal {
            format!("[{persona} agrees the discussion is complete.]")
        } else {
            spoken.to_string()
        };
        let new_document = patch::apply(prior_document, &parsed.operations);
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::debug!(
            %persona,
            operations = ?parsed
                .operations
                .iter()
                .map(PatchOperation::tag_name)
                .collect::<Vec<_>>(),
            spoken_chars = final_text.len(),
            "parsed turn response"
        );

        self.update(ConversationUpdate::ResolveTurn {
            message_id: message_id.to_string(),
            text: final_text.clone(),
            duration_ms,
            document: new_document.clone(),
        });

        tracing::info!(
            %persona,
            message_id,
            duration_ms,
            completion = saw_completion_signal,
            "turn resolved"
        );

        Ok(TurnOutput {
            final_text,
            new_document,
            duration_ms,
            saw_completion_signal,
        })
    }

    async fn receive(&self, prompt: &str, cancel: &CancellationToken) -> Result<String, ProviderError> {
        let raw = self.provider.send(prompt, cancel).await?;
        // A reply that raced the token still counts as cancelled.
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        if raw.trim().is_empty() {
            return Err(ProviderError::invalid_response(
                self.provider.name(),
                "Empty response from model",
            ));
        }
        Ok(raw)
    }
}
