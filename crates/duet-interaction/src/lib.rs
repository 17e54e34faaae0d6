pub mod client;
pub mod gemini_provider;
mod http;
pub mod ollama_provider;
pub mod openai_provider;

pub use client::ProviderClient;
pub use gemini_provider::GeminiProvider;
pub use ollama_provider::OllamaProvider;
pub use openai_provider::OpenAiProvider;
