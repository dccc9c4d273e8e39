//! Lecture retrieval and citation handling for the tutor.
//!
//! Retrieval side:
//! - [`LectureRetrieval`]: rewrite, multi-source search, dedup, rerank
//! - Seams for the [`store::VectorStore`], [`embeddings::EmbeddingProvider`]
//!   and [`rerank::Reranker`] services, each with a local implementation
//!
//! Citation side:
//! - [`citation::extract`], [`citation::CitationResolver`],
//!   [`citation::CitationEnricher`] and [`citation::inline_answer`]
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use tutor_core::AppConfig;
//! use tutor_retrieval::{citation, store::InMemoryStore, LectureLocator, LectureRetrieval, RetrievalRequest};
//!
//! # async fn example() -> tutor_core::AppResult<()> {
//! let config = AppConfig::load()?;
//! let retrieval = LectureRetrieval::from_config(&config, Arc::new(InMemoryStore::new()))?;
//!
//! let request = RetrievalRequest::new("What is a semaphore?", LectureLocator::course(1));
//! let result = retrieval.retrieve(&request).await?;
//!
//! let answer = "A counter guarding a section [1].\n\n[1] Lecture Unit ID: 42, Page: 7";
//! let inlined = citation::inline_answer(answer, &result);
//! println!("{}", inlined.text);
//! # Ok(())
//! # }
//! ```

pub mod citation;
pub mod dedup;
pub mod embeddings;
pub mod pipeline;
pub mod records;
pub mod rerank;
pub mod retriever;
pub mod rewrite;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use pipeline::LectureRetrieval;
pub use retriever::MultiSourceRetriever;
pub use rewrite::{QueryRewriter, RewriteInput, RewrittenQueries};
pub use types::{
    ExerciseContext, LectureLocator, PageChunk, RetrievalRequest, RetrievalResult,
    RetrievedChunk, SourceUnit, SummarySegment, TranscriptionSegment,
};
