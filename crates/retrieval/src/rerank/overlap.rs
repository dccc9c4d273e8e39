//! Local reranker scoring by query term overlap.
//!
//! For offline use and tests; no service call.

use super::{RankedDocument, Reranker};
use std::collections::HashSet;
use tutor_core::AppResult;

#[derive(Debug, Default, Clone, Copy)]
pub struct TermOverlapReranker;

impl TermOverlapReranker {
    fn terms(text: &str) -> HashSet<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[async_trait::async_trait]
impl Reranker for TermOverlapReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> AppResult<Vec<RankedDocument>> {
        let query_terms = Self::terms(query);
        let denominator = query_terms.len().max(1) as f64;

        let mut ranked: Vec<RankedDocument> = documents
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                let overlap = Self::terms(doc).intersection(&query_terms).count();
                RankedDocument {
                    index,
                    relevance_score: overlap as f64 / denominator,
                }
            })
            .collect();

        // Stable: ties keep submission order.
        ranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        ranked.truncate(top_n);
        Ok(ranked)
    }
}
