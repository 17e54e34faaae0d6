//! Model provider interface consumed by the turn executor.
//!
//! Concrete HTTP clients live in `duet-interaction`; the core only knows this
//! trait so the orchestrator can be driven by any backend (including test doubles).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Failure reported by a model provider.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderError {
    /// The cancellation token fired before the response arrived.
    #[error("Request cancelled by user")]
    Cancelled,

    /// The request never produced an HTTP response (connect, timeout, body read).
    #[error("{provider} request failed: {message}")]
    Request { provider: String, message: String },

    /// The provider answered with a non-success status.
    #[error("{provider} API error (HTTP {status}): {message}")]
    Status {
        provider: String,
        status: u16,
        message: String,
    },

    /// The response arrived but could not be used (malformed, blocked, empty).
    #[error("{provider} returned an unusable response: {message}")]
    InvalidResponse { provider: String, message: String },
}

impl ProviderError {
    pub fn request(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A language-model backend that turns a fully rendered prompt into raw text.
///
/// Implementations must honor `cancel`: once it fires, `send` resolves promptly
/// with [`ProviderError::Cancelled`] and any in-flight request is dropped.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Human-readable provider name used in logs.
    fn name(&self) -> &str;

    /// Sends `prompt` and returns the raw response text.
    async fn send(&self, prompt: &str, cancel: &CancellationToken) -> Result<String, ProviderError>;
}
