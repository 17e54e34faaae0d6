//! OllamaProvider - non-streaming `/api/generate` against a local Ollama server.

use async_trait::async_trait;
use duet_core::config::OllamaConfig;
use duet_core::provider::{ModelProvider, ProviderError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::http::{cancellable, read_json, request_error};

const PROVIDER_NAME: &str = "Ollama";

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: OllamaConfig) -> Self {
        Self { client, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim().trim_end_matches('/')
    }

    async fn send_request(&self, body: &GenerateRequest<'_>) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url()))
            .json(body)
            .send()
            .await
            .map_err(|err| request_error(PROVIDER_NAME, err))?;

        let parsed: GenerateResponse = read_json(PROVIDER_NAME, response).await?;
        Ok(parsed.response.unwrap_or_default())
    }

    /// Lists locally pulled models, sorted.
    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url()))
            .send()
            .await
            .map_err(|err| request_error(PROVIDER_NAME, err))?;

        let tags: TagList = read_json(PROVIDER_NAME, response).await?;
        let mut names: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn send(&self, prompt: &str, cancel: &CancellationToken) -> Result<String, ProviderError> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
        };
        tracing::debug!(
            provider = PROVIDER_NAME,
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "sending generate request"
        );
        cancellable(cancel, self.send_request(&request)).await
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

#[derive(Deserialize)]
struct TagList {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}
