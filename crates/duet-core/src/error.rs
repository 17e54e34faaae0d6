//! Error types for the Duet application.

use crate::provider::ProviderError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Duet workspace.
///
/// Patch parsing and application never produce errors; everything that can
/// reach a caller is listed here.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DuetError {
    /// No usable model provider (missing credentials or endpoint).
    ///
    /// Raised before any turn starts and blocks the run.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport or model failure during a turn.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A discussion run or retry is already in flight for the conversation.
    #[error("A discussion is already running")]
    Busy,

    /// Retry was requested without a recorded failure.
    #[error("There is no failed step to retry")]
    NoFailedStep,

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DuetError {
    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this error is a cancelled provider call.
    ///
    /// Cancellation is a control-flow exit rather than a failure, so callers
    /// use this to avoid reporting it as an error.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Provider(ProviderError::Cancelled))
    }
}

impl From<std::io::Error> for DuetError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for DuetError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for DuetError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for DuetError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error, used at repository boundaries.
impl From<anyhow::Error> for DuetError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, DuetError>`.
pub type Result<T> = std::result::Result<T, DuetError>;
