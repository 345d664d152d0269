//! LLM provider adapters.
//!
//! Each provider implements [`Backend`] for its specific API and classifies
//! responses into [`ModelOutput`](crate::model::ModelOutput).

pub mod anthropic;
pub mod gemini;

pub use anthropic::{AnthropicBackend, AnthropicBackendBuilder};
pub use gemini::{GeminiBackend, GeminiBackendBuilder};

use crate::model::{Backend, ModelError, ModelRequest, ModelResponse};

/// A backend chosen at runtime, e.g. from a config file.
pub enum Provider {
    Anthropic(AnthropicBackend),
    Gemini(GeminiBackend),
}

impl Provider {
    /// The model used when none is configured.
    pub fn default_model(name: &str) -> Option<&'static str> {
        match name {
            "anthropic" => Some(anthropic::DEFAULT_MODEL),
            "gemini" => Some(gemini::DEFAULT_MODEL),
            _ => None,
        }
    }
}

impl From<AnthropicBackend> for Provider {
    fn from(backend: AnthropicBackend) -> Self {
        Self::Anthropic(backend)
    }
}

impl From<GeminiBackend> for Provider {
    fn from(backend: GeminiBackend) -> Self {
        Self::Gemini(backend)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anthropic(b) => b.fmt(f),
            Self::Gemini(b) => b.fmt(f),
        }
    }
}

impl Backend for Provider {
    async fn call(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        match self {
            Self::Anthropic(b) => b.call(request).await,
            Self::Gemini(b) => b.call(request).await,
        }
    }
}
