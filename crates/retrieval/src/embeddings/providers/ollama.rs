//! Ollama embedding provider.
//!
//! Uses the batch `/api/embed` endpoint, so one HTTP round trip covers every
//! text of a call.

use crate::embeddings::provider::EmbeddingProvider;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use tutor_core::{AppError, AppResult, EmbeddingSettings};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBED_ENDPOINT: &str = "/api/embed";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Ollama embedding provider.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaProvider {
    /// Create a provider from settings.
    ///
    /// The endpoint falls back to `OLLAMA_URL`, then to the local default.
    /// No request is made until the first embedding.
    pub fn new(settings: &EmbeddingSettings) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Embedding(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = settings
            .endpoint
            .clone()
            .or_else(|| std::env::var("OLLAMA_URL").ok())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
        })
    }

    fn check_dimensions(&self, embeddings: &[Vec<f32>]) -> AppResult<()> {
        match embeddings.iter().find(|e| e.len() != self.dimensions) {
            Some(bad) => Err(AppError::Embedding(format!(
                "Ollama model '{}' returned {} dimensions, expected {}",
                self.model,
                bad.len(),
                self.dimensions
            ))),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}{}", self.base_url, EMBED_ENDPOINT);
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request to Ollama: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);
            return Err(AppError::Embedding(format!(
                "Ollama API error ({}): {}",
                status, message
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        if body.embeddings.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "Ollama returned {} embeddings for {} inputs",
                body.embeddings.len(),
                texts.len()
            )));
        }
        self.check_dimensions(&body.embeddings)?;

        debug!("Embedded {} texts", body.embeddings.len());
        Ok(body.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(endpoint: Option<&str>) -> EmbeddingSettings {
        EmbeddingSettings {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 3,
            endpoint: endpoint.map(str::to_string),
        }
    }

    #[test]
    fn test_explicit_endpoint_trimmed() {
        let provider = OllamaProvider::new(&settings(Some("http://gpu-box:11434/"))).unwrap();
        assert_eq!(provider.base_url, "http://gpu-box:11434");
        assert_eq!(provider.model_name(), "nomic-embed-text");
    }

    #[test]
    fn test_request_shape() {
        let texts = vec!["a".to_string(), "b".to_string()];
        let request = EmbedRequest {
            model: "nomic-embed-text",
            input: &texts,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["input"][1], "b");
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let provider = OllamaProvider::new(&settings(Some("http://localhost:11434"))).unwrap();
        assert!(provider.check_dimensions(&[vec![0.0; 3]]).is_ok());
        assert!(provider.check_dimensions(&[vec![0.0; 3], vec![0.0; 4]]).is_err());
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        // Unroutable endpoint: any request would fail.
        let provider = OllamaProvider::new(&settings(Some("http://127.0.0.1:9"))).unwrap();
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }
}
