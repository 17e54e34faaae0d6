//! GeminiProvider - Direct REST API implementation for Gemini.
//!
//! Talks to `v1beta/models/{model}:generateContent`, either on the public
//! endpoint or on a custom (possibly key-less) proxy base URL.

use async_trait::async_trait;
use duet_core::config::GeminiConfig;
use duet_core::provider::{ModelProvider, ProviderError};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::http::{cancellable, read_json, request_error};

const PROVIDER_NAME: &str = "Gemini";

/// Provider implementation that talks to the Gemini HTTP API.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Reuses an existing HTTP client (connection pool).
    pub fn with_client(client: Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn with_key(&self, builder: RequestBuilder) -> RequestBuilder {
        let key = self.config.api_key.trim();
        if key.is_empty() {
            builder
        } else {
            builder.query(&[("key", key)])
        }
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint(),
            self.config.model
        )
    }

    fn build_request(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: self.config.thinking.budget().map(|thinking_budget| {
                GenerationConfig {
                    thinking_config: ThinkingConfigPayload { thinking_budget },
                }
            }),
        }
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String, ProviderError> {
        let response = self
            .with_key(self.client.post(self.generate_url()))
            .json(body)
            .send()
            .await
            .map_err(|err| request_error(PROVIDER_NAME, err))?;

        let parsed: GenerateContentResponse = read_json(PROVIDER_NAME, response).await?;
        extract_text_response(parsed)
    }

    /// Lists models that support `generateContent`, sorted by name.
    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/v1beta/models", self.config.endpoint());
        let response = self
            .with_key(self.client.get(url))
            .send()
            .await
            .map_err(|err| request_error(PROVIDER_NAME, err))?;

        let listing: ModelList = read_json(PROVIDER_NAME, response).await?;
        Ok(model_names(listing))
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn send(&self, prompt: &str, cancel: &CancellationToken) -> Result<String, ProviderError> {
        let request = self.build_request(prompt);
        tracing::debug!(
            provider = PROVIDER_NAME,
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "sending generateContent request"
        );
        cancellable(cancel, self.send_request(&request)).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfigPayload,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfigPayload {
    thinking_budget: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ContentResponse>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// Joins the first candidate's text parts; empty text is an error only when blocked.
fn extract_text_response(response: GenerateContentResponse) -> Result<String, ProviderError> {
    let first = response.candidates.into_iter().next();
    let finish_reason = first.as_ref().and_then(|c| c.finish_reason.clone());
    let text: String = first
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::invalid_response(
                PROVIDER_NAME,
                format!("Response blocked due to: {reason}"),
            ));
        }
        if finish_reason.as_deref() == Some("SAFETY") {
            return Err(ProviderError::invalid_response(
                PROVIDER_NAME,
                "Response blocked due to safety settings.",
            ));
        }
    }
    Ok(text)
}

fn model_names(listing: ModelList) -> Vec<String> {
    let mut names: Vec<String> = listing
        .models
        .into_iter()
        .filter(|m| m.supported_generation_methods.iter().any(|g| g == "generateContent"))
        .map(|m| m.name.trim_start_matches("models/").to_string())
        .collect();
    names.sort();
    names
}
