//! Application settings and their repository trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::discussion::DiscussionSettings;
use crate::error::Result;
use crate::persona::preset;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";

/// Which backend the discussion talks to.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiProvider {
    #[default]
    Gemini,
    OpenAi,
    Ollama,
}

impl ApiProvider {
    /// Fallback order used when the requested provider is not configured.
    pub const ALL: [ApiProvider; 3] = [ApiProvider::Gemini, ApiProvider::OpenAi, ApiProvider::Ollama];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiProvider::Gemini => "gemini",
            ApiProvider::OpenAi => "openai",
            ApiProvider::Ollama => "ollama",
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThinkingMode {
    /// Let the model decide.
    #[default]
    Default,
    /// Thinking budget of zero.
    Disabled,
    /// Use `custom_budget`.
    Custom,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ThinkingConfig {
    pub mode: ThinkingMode,
    pub custom_budget: u32,
}

impl ThinkingConfig {
    /// Budget to send, or `None` to omit the thinking config entirely.
    pub fn budget(&self) -> Option<u32> {
        match self.mode {
            ThinkingMode::Default => None,
            ThinkingMode::Disabled => Some(0),
            ThinkingMode::Custom => Some(self.custom_budget),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Empty means the public endpoint.
    pub base_url: String,
    pub model: String,
    pub thinking: ThinkingConfig,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: String::new(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            thinking: ThinkingConfig::default(),
        }
    }
}

impl GeminiConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() || !self.base_url.trim().is_empty()
    }

    pub fn endpoint(&self) -> &str {
        let base = self.base_url.trim();
        if base.is_empty() {
            DEFAULT_GEMINI_BASE_URL
        } else {
            base.trim_end_matches('/')
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }
}

impl OpenAiConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
            && !self.base_url.trim().is_empty()
            && !self.model.trim().is_empty()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }
}

impl OllamaConfig {
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty() && !self.model.trim().is_empty()
    }
}

/// Provider configuration. Opaque to the orchestrator.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ProviderSettings {
    pub current_provider: ApiProvider,
    pub gemini: GeminiConfig,
    pub openai: OpenAiConfig,
    pub ollama: OllamaConfig,
}

impl ProviderSettings {
    pub fn is_configured(&self, provider: ApiProvider) -> bool {
        match provider {
            ApiProvider::Gemini => self.gemini.is_configured(),
            ApiProvider::OpenAi => self.openai.is_configured(),
            ApiProvider::Ollama => self.ollama.is_configured(),
        }
    }

    /// The requested provider if usable, otherwise the first usable one.
    pub fn active_provider(&self) -> Option<ApiProvider> {
        if self.is_configured(self.current_provider) {
            return Some(self.current_provider);
        }
        ApiProvider::ALL
            .into_iter()
            .find(|provider| self.is_configured(*provider))
    }

    /// Model name configured for `provider`.
    pub fn model_for(&self, provider: ApiProvider) -> &str {
        match provider {
            ApiProvider::Gemini => &self.gemini.model,
            ApiProvider::OpenAi => &self.openai.model,
            ApiProvider::Ollama => &self.ollama.model,
        }
    }
}

/// Everything persisted in `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppSettings {
    /// Notepad content for new conversations.
    pub initial_document: String,
    pub discussion: DiscussionSettings,
    pub provider: ProviderSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            initial_document: preset::welcome_document(),
            discussion: DiscussionSettings::default(),
            provider: ProviderSettings::default(),
        }
    }
}

/// Loads and stores [`AppSettings`].
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Returns stored settings, or defaults when nothing is stored yet.
    async fn load(&self) -> Result<AppSettings>;

    async fn save(&self, settings: &AppSettings) -> Result<()>;
}
