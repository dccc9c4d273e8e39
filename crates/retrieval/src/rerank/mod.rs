//! Relevance reranking of retrieved fragments.

pub mod cohere;
pub mod overlap;

pub use cohere::CohereReranker;
pub use overlap::TermOverlapReranker;

use serde::{Deserialize, Serialize};
use tracing::debug;
use tutor_core::{AppError, AppResult};

/// One entry of a rerank response: an index into the submitted documents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedDocument {
    pub index: usize,
    pub relevance_score: f64,
}

/// A rerank service.
#[async_trait::async_trait]
pub trait Reranker: Send + Sync {
    /// Rank `documents` against `query`, best first, at most `top_n` entries.
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> AppResult<Vec<RankedDocument>>;
}

/// Rerank `items` by the text `text_of` extracts and keep the best `top_n`.
///
/// The service's order is kept as returned. An empty input makes no call.
/// An index outside the submitted list is an error.
pub async fn rerank_top_n<T>(
    reranker: &dyn Reranker,
    query: &str,
    items: Vec<T>,
    text_of: fn(&T) -> &str,
    top_n: usize,
) -> AppResult<Vec<T>> {
    if items.is_empty() {
        return Ok(items);
    }

    let documents: Vec<String> = items.iter().map(|item| text_of(item).to_string()).collect();
    let ranked = reranker.rerank(query, &documents, top_n).await?;

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut kept = Vec::with_capacity(top_n.min(slots.len()));
    for entry in ranked {
        if kept.len() == top_n {
            break;
        }
        let slot = slots.get_mut(entry.index).ok_or_else(|| {
            AppError::Rerank(format!(
                "Rerank result index {} out of bounds for {} documents",
                entry.index, documents.len()
            ))
        })?;
        // A repeated index yields its item once.
        if let Some(item) = slot.take() {
            kept.push(item);
        }
    }

    debug!("Reranked {} documents, kept {}", documents.len(), kept.len());
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed ranking regardless of input.
    struct FixedReranker {
        ranking: Vec<usize>,
        calls: AtomicUsize,
    }

    impl FixedReranker {
        fn new(ranking: Vec<usize>) -> Self {
            Self {
                ranking,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Reranker for FixedReranker {
        async fn rerank(&self, _: &str, _: &[String], _: usize) -> AppResult<Vec<RankedDocument>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .ranking
                .iter()
                .map(|&index| RankedDocument {
                    index,
                    relevance_score: 1.0,
                })
                .collect())
        }
    }

    fn as_str(s: &String) -> &str {
        s
    }

    fn docs(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("doc {}", i)).collect()
    }

    #[tokio::test]
    async fn test_keeps_service_order() {
        let reranker = FixedReranker::new(vec![2, 0, 1]);
        let kept = rerank_top_n(&reranker, "q", docs(3), as_str, 7).await.unwrap();
        assert_eq!(kept, vec!["doc 2", "doc 0", "doc 1"]);
    }

    #[tokio::test]
    async fn test_truncates_to_top_n() {
        let reranker = FixedReranker::new((0..10).rev().collect());
        let kept = rerank_top_n(&reranker, "q", docs(10), as_str, 7).await.unwrap();
        assert_eq!(kept.len(), 7);
        assert_eq!(kept[0], "doc 9");
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_call() {
        let reranker = FixedReranker::new(vec![0]);
        let kept = rerank_top_n(&reranker, "q", Vec::<String>::new(), as_str, 7)
            .await
            .unwrap();
        assert!(kept.is_empty());
        assert_eq!(reranker.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_out_of_bounds_index_is_error() {
        let reranker = FixedReranker::new(vec![0, 5]);
        let err = rerank_top_n(&reranker, "q", docs(2), as_str, 7).await.unwrap_err();
        assert!(matches!(err, AppError::Rerank(_)));
    }

    #[tokio::test]
    async fn test_repeated_index_kept_once() {
        let reranker = FixedReranker::new(vec![1, 1, 0]);
        let kept = rerank_top_n(&reranker, "q", docs(2), as_str, 7).await.unwrap();
        assert_eq!(kept, vec!["doc 1", "doc 0"]);
    }
}
