//! End-to-end lecture retrieval: rewrite, fan out, dedup, rerank.

use crate::dedup::dedup_by_uuid;
use crate::embeddings::{self, EmbeddingProvider};
use crate::rerank::{rerank_top_n, CohereReranker, Reranker};
use crate::retriever::MultiSourceRetriever;
use crate::rewrite::{QueryRewriter, RewriteInput};
use crate::store::VectorStore;
use crate::types::{PageChunk, RetrievalRequest, RetrievalResult, TranscriptionSegment};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use tutor_core::{AppConfig, AppError, AppResult, RetrievalSettings};
use tutor_llm::LlmClient;
use tutor_prompt::PromptRegistry;

fn transcription_text(segment: &TranscriptionSegment) -> &str {
    &segment.segment_text
}

fn page_text(chunk: &PageChunk) -> &str {
    &chunk.page_text_content
}

/// The retrieval entry point used by the agent layer.
///
/// One call resolves the lecture, rewrites the query four ways, searches the
/// three collections, expands summary segments, and reranks transcriptions
/// and page chunks. The result is all-or-nothing: any failed external call,
/// schema violation or an elapsed deadline fails the whole call.
pub struct LectureRetrieval {
    rewriter: QueryRewriter,
    retriever: MultiSourceRetriever,
    reranker: Arc<dyn Reranker>,
    settings: RetrievalSettings,
}

impl LectureRetrieval {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        llm_model: impl Into<String>,
        prompts: Arc<PromptRegistry>,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Arc<dyn Reranker>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            rewriter: QueryRewriter::new(llm, llm_model, prompts, settings.history_limit),
            retriever: MultiSourceRetriever::new(store, embedder, settings.clone()),
            reranker,
            settings,
        }
    }

    /// Wire up the configured chat, embedding and rerank clients around a
    /// caller-supplied store.
    pub fn from_config(config: &AppConfig, store: Arc<dyn VectorStore>) -> AppResult<Self> {
        let llm = tutor_llm::create_client(&config.llm, config.resolve_llm_api_key().as_deref())?;
        let embedder = embeddings::create_provider(&config.embedding)?;
        let reranker: Arc<dyn Reranker> = Arc::new(CohereReranker::new(&config.rerank)?);
        let prompts = match &config.prompt_dir {
            Some(dir) => PromptRegistry::with_overrides(dir)?,
            None => PromptRegistry::builtin(),
        };

        Ok(Self::new(
            llm,
            config.llm.model.clone(),
            Arc::new(prompts),
            store,
            embedder,
            reranker,
            config.retrieval.clone(),
        ))
    }

    /// Retrieve lecture content for one student query.
    ///
    /// Returns the empty result, without any rewrite, search or rerank call,
    /// when the locator names no known lecture.
    #[instrument(skip(self, request), fields(course_id = request.locator.course_id))]
    pub async fn retrieve(&self, request: &RetrievalRequest) -> AppResult<RetrievalResult> {
        match self.settings.deadline() {
            Some(deadline) => tokio::time::timeout(deadline, self.retrieve_inner(request))
                .await
                .map_err(|_| AppError::Timeout(deadline))?,
            None => self.retrieve_inner(request).await,
        }
    }

    async fn retrieve_inner(&self, request: &RetrievalRequest) -> AppResult<RetrievalResult> {
        let Some(unit) = self.retriever.resolve_source_unit(&request.locator).await? else {
            info!("No lecture found for locator, returning empty result");
            return Ok(RetrievalResult::empty());
        };

        let rewritten = self
            .rewriter
            .rewrite(RewriteInput {
                query: &request.query,
                chat_history: &request.chat_history,
                unit: &unit,
                exercise: request.exercise.as_ref(),
            })
            .await?;

        let raw = self
            .retriever
            .retrieve(&request.query, &rewritten, &request.locator)
            .await?;

        let summary_segments = dedup_by_uuid(raw.summary_segments);
        let transcriptions = dedup_by_uuid(raw.transcriptions);
        let page_chunks = dedup_by_uuid(raw.page_chunks);
        debug!(
            summaries = summary_segments.len(),
            transcriptions = transcriptions.len(),
            pages = page_chunks.len(),
            "Deduplicated"
        );

        let top_n = self.settings.top_n;
        let (transcriptions, page_chunks) = tokio::try_join!(
            rerank_top_n(
                self.reranker.as_ref(),
                &request.query,
                transcriptions,
                transcription_text,
                top_n
            ),
            rerank_top_n(
                self.reranker.as_ref(),
                &request.query,
                page_chunks,
                page_text,
                top_n
            ),
        )?;

        info!(
            summaries = summary_segments.len(),
            transcriptions = transcriptions.len(),
            pages = page_chunks.len(),
            "Retrieval complete"
        );

        Ok(RetrievalResult {
            summary_segments,
            transcriptions,
            page_chunks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use tempfile::TempDir;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.embedding.provider = "mock".to_string();
        config.embedding.dimensions = 32;
        config.rerank.api_key = Some("test-key".to_string());
        config
    }

    #[test]
    fn test_from_config_builds() {
        let retrieval = LectureRetrieval::from_config(&config(), Arc::new(InMemoryStore::new()));
        assert!(retrieval.is_ok());
    }

    #[test]
    fn test_from_config_requires_rerank_key() {
        let mut config = config();
        config.rerank.api_key = None;
        config.rerank.api_key_env = "TUTOR_TEST_UNSET_RERANK_KEY".to_string();

        let result = LectureRetrieval::from_config(&config, Arc::new(InMemoryStore::new()));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_from_config_rejects_broken_prompt_override() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("rewrite.lecture_pages.yml"),
            "id: rewrite.lecture_pages\ntemplate: [unclosed",
        )
        .unwrap();

        let mut config = config();
        config.prompt_dir = Some(dir.path().to_path_buf());

        let result = LectureRetrieval::from_config(&config, Arc::new(InMemoryStore::new()));
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }
}
