//! LLM provider factory.
//!
//! Builds an [`LlmClient`] from the `llm` configuration section.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use std::sync::Arc;
use std::time::Duration;
use tutor_core::{AppError, AppResult, LlmSettings};

/// Create an LLM client from settings.
///
/// # Arguments
/// * `settings` - Provider, endpoint and timeout
/// * `api_key` - API key for providers that require one
///
/// # Errors
/// Returns error if the provider is unknown, a required key is missing, or
/// the HTTP client cannot be built.
pub fn create_client(
    settings: &LlmSettings,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider = ProviderType::parse(&settings.provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", settings.provider)))?;

    let endpoint = settings
        .endpoint
        .as_deref()
        .unwrap_or(provider.default_endpoint());
    let timeout = settings.timeout.map(Duration::from_secs);

    match provider {
        ProviderType::Ollama => Ok(Arc::new(OllamaClient::with_options(endpoint, timeout)?)),
        ProviderType::OpenAI => {
            let key = api_key.ok_or_else(|| {
                AppError::Config("OpenAI provider requires API key".to_string())
            })?;
            Ok(Arc::new(OpenAiClient::with_options(endpoint, key, timeout)?))
        }
    }
}
