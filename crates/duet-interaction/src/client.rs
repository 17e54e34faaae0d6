//! Provider selection over the closed set of supported backends.

use async_trait::async_trait;
use duet_core::config::{ApiProvider, ProviderSettings};
use duet_core::provider::{ModelProvider, ProviderError};
use duet_core::{DuetError, Result};
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::gemini_provider::GeminiProvider;
use crate::ollama_provider::OllamaProvider;
use crate::openai_provider::OpenAiProvider;

/// One configured backend, chosen once per run.
#[derive(Debug, Clone)]
pub enum ProviderClient {
    Gemini(GeminiProvider),
    OpenAi(OpenAiProvider),
    Ollama(OllamaProvider),
}

impl ProviderClient {
    /// Builds a client for the active provider in `settings`.
    ///
    /// Falls back to the first configured provider when the requested one is
    /// not usable; fails with [`DuetError::Config`] when none is.
    pub fn select(settings: &ProviderSettings) -> Result<Self> {
        Self::select_with_client(Client::new(), settings)
    }

    pub fn select_with_client(client: Client, settings: &ProviderSettings) -> Result<Self> {
        let provider = settings.active_provider().ok_or_else(|| {
            DuetError::config(
                "No API provider is configured. Set an API key or endpoint in the settings.",
            )
        })?;
        if provider != settings.current_provider {
            tracing::info!(
                requested = settings.current_provider.as_str(),
                selected = provider.as_str(),
                "requested provider is not configured, falling back"
            );
        }
        Ok(Self::build(client, provider, settings))
    }

    /// Builds a client for `provider` without checking that it is configured.
    pub fn build(client: Client, provider: ApiProvider, settings: &ProviderSettings) -> Self {
        match provider {
            ApiProvider::Gemini => {
                Self::Gemini(GeminiProvider::with_client(client, settings.gemini.clone()))
            }
            ApiProvider::OpenAi => {
                Self::OpenAi(OpenAiProvider::with_client(client, settings.openai.clone()))
            }
            ApiProvider::Ollama => {
                Self::Ollama(OllamaProvider::with_client(client, settings.ollama.clone()))
            }
        }
    }

    pub fn kind(&self) -> ApiProvider {
        match self {
            Self::Gemini(_) => ApiProvider::Gemini,
            Self::OpenAi(_) => ApiProvider::OpenAi,
            Self::Ollama(_) => ApiProvider::Ollama,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::Gemini(p) => p.model(),
            Self::OpenAi(p) => p.model(),
            Self::Ollama(p) => p.model(),
        }
    }

    /// Lists the models the backend offers, sorted.
    pub async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        match self {
            Self::Gemini(p) => p.list_models().await,
            Self::OpenAi(p) => p.list_models().await,
            Self::Ollama(p) => p.list_models().await,
        }
    }
}

#[async_trait]
impl ModelProvider for ProviderClient {
    fn name(&self) -> &str {
        match self {
            Self::Gemini(p) => p.name(),
            Self::OpenAi(p) => p.name(),
            Self::Ollama(p) => p.name(),
        }
    }

    async fn send(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, ProviderError> {
        match self {
            Self::Gemini(p) => p.send(prompt, cancel).await,
            Self::OpenAi(p) => p.send(prompt, cancel).await,
            Self::Ollama(p) => p.send(prompt, cancel).await,
        }
    }
}
