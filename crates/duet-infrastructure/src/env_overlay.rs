//! Credentials taken from the environment.
//!
//! Environment values fill gaps in the stored settings at load time and are
//! stripped again before saving, so they never end up in `config.toml`.

use duet_core::config::{DEFAULT_OLLAMA_BASE_URL, ProviderSettings};

pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const GENERIC_API_KEY_VAR: &str = "API_KEY";
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const OLLAMA_BASE_URL_VAR: &str = "OLLAMA_BASE_URL";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialOverlay {
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub ollama_base_url: Option<String>,
}

impl CredentialOverlay {
    /// Reads the overlay from the process environment. Blank variables are ignored.
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: read_var(GEMINI_API_KEY_VAR).or_else(|| read_var(GENERIC_API_KEY_VAR)),
            openai_api_key: read_var(OPENAI_API_KEY_VAR),
            ollama_base_url: read_var(OLLAMA_BASE_URL_VAR),
        }
    }

    /// Fills empty credentials; an unchanged default Ollama URL counts as empty.
    pub fn apply(&self, settings: &mut ProviderSettings) {
        fill(&mut settings.gemini.api_key, &self.gemini_api_key, "");
        fill(&mut settings.openai.api_key, &self.openai_api_key, "");
        fill(
            &mut settings.ollama.base_url,
            &self.ollama_base_url,
            DEFAULT_OLLAMA_BASE_URL,
        );
    }

    /// Reverses [`CredentialOverlay::apply`] for values still equal to the environment.
    pub fn strip(&self, settings: &mut ProviderSettings) {
        unfill(&mut settings.gemini.api_key, &self.gemini_api_key, "");
        unfill(&mut settings.openai.api_key, &self.openai_api_key, "");
        unfill(
            &mut settings.ollama.base_url,
            &self.ollama_base_url,
            DEFAULT_OLLAMA_BASE_URL,
        );
    }
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn fill(slot: &mut String, value: &Option<String>, unset: &str) {
    if let Some(value) = value {
        let current = slot.trim();
        if current.is_empty() || current == unset {
            *slot = value.clone();
        }
    }
}

fn unfill(slot: &mut String, value: &Option<String>, unset: &str) {
    if value.as_deref() == Some(slot.as_str()) {
        *slot = unset.to_string();
    }
}
