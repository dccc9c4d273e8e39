//! Cohere-compatible rerank client.
//!
//! API: `POST {endpoint}/v2/rerank` with `{model, query, documents, top_n}`,
//! answering `{results: [{index, relevance_score}]}` best first.

use super::{RankedDocument, Reranker};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;
use tutor_core::{AppError, AppResult, RerankSettings};

const RERANK_ENDPOINT: &str = "/v2/rerank";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RankedDocument>,
}

/// HTTP rerank client.
pub struct CohereReranker {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl CohereReranker {
    /// Create a client from settings. Fails without an API key.
    pub fn new(settings: &RerankSettings) -> AppResult<Self> {
        let api_key = settings.resolve_api_key().ok_or_else(|| {
            AppError::Config(format!(
                "Rerank API key not set (expected in ${})",
                settings.api_key_env
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Rerank(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key,
        })
    }
}

#[async_trait::async_trait]
impl Reranker for CohereReranker {
    #[instrument(skip(self, query, documents), fields(documents = documents.len(), model = %self.model))]
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> AppResult<Vec<RankedDocument>> {
        let url = format!("{}{}", self.base_url, RERANK_ENDPOINT);
        let request = RerankRequest {
            model: &self.model,
            query,
            documents,
            top_n,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Rerank(format!("Failed to send rerank request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Rerank(format!(
                "Rerank API error ({}): {}",
                status, error_text
            )));
        }

        let body: RerankResponse = response
            .json()
            .await
            .map_err(|e| AppError::Rerank(format!("Failed to parse rerank response: {}", e)))?;
        Ok(body.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_config_error() {
        let settings = RerankSettings {
            api_key: None,
            api_key_env: "TUTOR_TEST_UNSET_COHERE_KEY".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            CohereReranker::new(&settings),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_response_parsing_ignores_extra_fields() {
        let json = r#"{
            "id": "abc",
            "results": [
                {"index": 3, "relevance_score": 0.91},
                {"index": 0, "relevance_score": 0.42}
            ],
            "meta": {"api_version": {"version": "2"}}
        }"#;
        let parsed: RerankResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results[0].index, 3);
        assert_eq!(parsed.results.len(), 2);
    }

    #[test]
    fn test_request_shape() {
        let documents = vec!["a".to_string()];
        let request = RerankRequest {
            model: "rerank-v3.5",
            query: "what is a semaphore",
            documents: &documents,
            top_n: 7,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["top_n"], 7);
        assert_eq!(json["documents"][0], "a");
    }

    #[test]
    fn test_endpoint_trimmed() {
        let settings = RerankSettings {
            endpoint: "https://rerank.internal/".to_string(),
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        let reranker = CohereReranker::new(&settings).unwrap();
        assert_eq!(reranker.base_url, "https://rerank.internal");
    }
}
