//! OpenAiProvider - chat completions against any OpenAI-compatible endpoint.

use async_trait::async_trait;
use duet_core::config::OpenAiConfig;
use duet_core::provider::{ModelProvider, ProviderError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::http::{cancellable, read_json, request_error};

const PROVIDER_NAME: &str = "OpenAI";

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: OpenAiConfig) -> Self {
        Self { client, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim().trim_end_matches('/')
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        }
    }

    async fn send_request(&self, body: &ChatCompletionRequest<'_>) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url()))
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| request_error(PROVIDER_NAME, err))?;

        let parsed: ChatCompletionResponse = read_json(PROVIDER_NAME, response).await?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    /// Lists model ids exposed by the endpoint, sorted.
    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url()))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|err| request_error(PROVIDER_NAME, err))?;

        let listing: ModelList = read_json(PROVIDER_NAME, response).await?;
        let mut ids: Vec<String> = listing.data.into_iter().map(|m| m.id).collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn send(&self, prompt: &str, cancel: &CancellationToken) -> Result<String, ProviderError> {
        let request = self.build_request(prompt);
        tracing::debug!(
            provider = PROVIDER_NAME,
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "sending chat completion request"
        );
        cancellable(cancel, self.send_request(&request)).await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}
