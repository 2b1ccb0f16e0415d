//! Language model abstraction.
//!
//! The gateway talks to the model only through [`LanguageModel`], so tests and offline
//! runs swap in [`FakeModel`] while the service uses [`GeminiModel`].

mod classify;
mod fake;
mod gemini;

pub use classify::{ErrorClass, ErrorClassifier, SignatureClassifier, DEFAULT_QUOTA_SIGNATURES};
pub use fake::FakeModel;
pub use gemini::{GeminiModel, DEFAULT_REQUEST_TIMEOUT};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{AssistantConfig, ProviderKind};

/// Error type for language model calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// A text generation backend.
///
/// Implementations must be thread-safe; one instance serves every user.
#[async_trait]
pub trait LanguageModel: Send + Sync + fmt::Debug {
    /// Send a prompt and return the model's text response.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Provider name ("gemini", "fake").
    fn provider_name(&self) -> &'static str;

    /// Model name (e.g. "gemini-1.5-flash").
    fn model_name(&self) -> &str;
}

/// Build the configured model backend.
pub fn create_model(config: &AssistantConfig) -> Result<Arc<dyn LanguageModel>, LlmError> {
    match config.provider {
        ProviderKind::Fake => Ok(Arc::new(FakeModel::with_recipe_responses())),
        ProviderKind::Gemini => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                LlmError::NotConfigured("GOOGLE_API_KEY not set".to_string())
            })?;
            let model = GeminiModel::new(api_key, config.model.clone())
                .with_timeout(config.request_timeout)?;
            Ok(Arc::new(model))
        }
    }
}
