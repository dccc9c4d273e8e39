//! Chat-completion provider implementations.

pub mod ollama;
pub mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use tutor_core::{AppError, AppResult};

/// Build an HTTP client with an optional request timeout.
fn build_http_client(timeout: Option<std::time::Duration>) -> AppResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| AppError::Llm(format!("Failed to create HTTP client: {}", e)))
}

/// Turn a non-2xx response into an error carrying the body text.
async fn ensure_success(
    response: reqwest::Response,
    provider: &str,
) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(AppError::Llm(format!(
        "{} API error ({}): {}",
        provider, status, error_text
    )))
}
