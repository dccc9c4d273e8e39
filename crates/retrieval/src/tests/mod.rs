//! Crate-level scenario tests and the fakes they share.


use crate::embeddings::providers::mock::MockProvider;
use crate::embeddings::EmbeddingProvider;
use crate::rerank::{RankedDocument, Reranker, TermOverlapReranker};
use crate::store::{FetchRequest, InMemoryStore, SearchRequest, StoreRecord, VectorStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tutor_core::{AppError, AppResult};
use tutor_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};

/// Chat client answering every prompt with a fixed text.
pub(crate) struct FakeLlm {
    reply: String,
    fail_when_system_contains: Option<&'static str>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FakeLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail_when_system_contains: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(mut self, marker: &'static str) -> Self {
        self.fail_when_system_contains = Some(marker);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmClient for FakeLlm {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(marker) = self.fail_when_system_contains {
            if request.messages.iter().any(|m| m.content.contains(marker)) {
                return Err(AppError::Llm(format!("refused prompt containing '{}'", marker)));
            }
        }
        Ok(LlmResponse {
            content: self.reply.clone(),
            model: request.model.clone(),
            usage: LlmUsage::new(10, 5),
        })
    }
}

/// In-memory store counting every call.
#[derive(Default)]
pub(crate) struct CountingStore {
    pub inner: InMemoryStore,
    pub fetches: AtomicUsize,
    pub searches: AtomicUsize,
}

impl CountingStore {
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl VectorStore for CountingStore {
    async fn fetch(&self, request: &FetchRequest) -> AppResult<Vec<StoreRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(request).await
    }

    async fn search(&self, request: &SearchRequest) -> AppResult<Vec<StoreRecord>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.inner.search(request).await
    }
}

/// Hashing embedder counting every call.
#[derive(Debug)]
pub(crate) struct CountingEmbedder {
    inner: MockProvider,
    pub calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new() -> Self {
        Self {
            inner: MockProvider::new(64),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for CountingEmbedder {
    fn provider_name(&self) -> &str {
        "counting"
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }
}

/// Term-overlap reranker counting calls, optionally answering with a bogus
/// index.
#[derive(Default)]
pub(crate) struct CountingReranker {
    pub calls: AtomicUsize,
    pub bogus_index: bool,
}

impl CountingReranker {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Reranker for CountingReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> AppResult<Vec<RankedDocument>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut ranked = TermOverlapReranker.rerank(query, documents, top_n).await?;
        if self.bogus_index {
            ranked.push(RankedDocument {
                index: documents.len() + 3,
                relevance_score: 0.0,
            });
            ranked.reverse();
        }
        Ok(ranked)
    }
}
