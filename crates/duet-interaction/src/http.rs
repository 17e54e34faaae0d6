//! Shared HTTP plumbing for the REST providers.

use std::future::Future;

use duet_core::provider::ProviderError;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

/// Races `request` against `cancel`; the request future is dropped on cancellation.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, request: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    if cancel.is_cancelled() {
        return Err(ProviderError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProviderError::Cancelled),
        result = request => result,
    }
}

pub(crate) fn request_error(provider: &str, err: reqwest::Error) -> ProviderError {
    ProviderError::request(provider, err.to_string())
}

/// Decodes a successful JSON body or maps the failure status.
pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: &str,
    response: Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("Failed to read error body"));
        let err = map_http_error(provider, status, &body);
        tracing::warn!(provider, status = status.as_u16(), "provider returned an error status");
        return Err(err);
    }

    response.json::<T>().await.map_err(|err| {
        ProviderError::invalid_response(provider, format!("Failed to parse response: {err}"))
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    /// Gemini and OpenAI: `{"error": {"message": "...", "status": "..."}}`
    Detailed { error: ErrorBody },
    /// Ollama: `{"error": "..."}`
    Plain { error: String },
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

pub(crate) fn map_http_error(provider: &str, status: StatusCode, body: &str) -> ProviderError {
    let message = match serde_json::from_str::<ErrorPayload>(body) {
        Ok(ErrorPayload::Detailed { error }) => {
            let msg = error.message.unwrap_or_else(|| body.to_string());
            match error.status.filter(|s| !s.is_empty()) {
                Some(status_text) => format!("{status_text}: {msg}"),
                None => msg,
            }
        }
        Ok(ErrorPayload::Plain { error }) => error,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
        Err(_) => body.trim().to_string(),
    };

    ProviderError::Status {
        provider: provider.to_string(),
        status: status.as_u16(),
        message,
    }
}
