//! Multi-source fan-out over the three lecture content collections.

use crate::embeddings::EmbeddingProvider;
use crate::records::{self, LECTURE_FIELDS, PAGE_CHUNK_FIELDS, SEGMENT_FIELDS, TRANSCRIPTION_FIELDS};
use crate::rewrite::RewrittenQueries;
use crate::store::{
    collections, FetchRequest, FilterField, Filters, SearchRequest, StoreRecord, VectorStore,
};
use crate::types::{
    LectureLocator, PageChunk, RetrievalResult, SourceUnit, SummarySegment, TranscriptionSegment,
};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, instrument};
use tutor_core::{AppResult, RetrievalSettings};

/// Inputs of one sub-pipeline's pair of hybrid searches.
struct SearchPlan<'a> {
    collection: &'static str,
    return_fields: &'static [&'static str],
    raw_query: &'a str,
    rewrite: &'a str,
    hypothetical: &'a str,
}

/// Queries the store for summary segments, transcriptions and page chunks.
pub struct MultiSourceRetriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    settings: RetrievalSettings,
}

impl MultiSourceRetriever {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            store,
            embedder,
            settings,
        }
    }

    /// Look up the lecture the locator points at.
    ///
    /// Without a lecture id the first lecture of the course is used; it only
    /// contributes course language and name to the rewrite prompts.
    #[instrument(skip(self))]
    pub async fn resolve_source_unit(&self, locator: &LectureLocator) -> AppResult<Option<SourceUnit>> {
        let filters = Filters::new()
            .eq(FilterField::CourseId, locator.course_id)
            .eq_opt(FilterField::LectureId, locator.lecture_id)
            .eq_opt(FilterField::BaseUrl, locator.base_url.clone());

        let found = self
            .store
            .fetch(&FetchRequest {
                collection: collections::LECTURES,
                filters,
                limit: 1,
                return_fields: LECTURE_FIELDS,
            })
            .await?;

        found.first().map(records::source_unit).transpose()
    }

    /// Filters scoping every similarity search to the locator.
    pub fn scope_filters(locator: &LectureLocator) -> Filters {
        Filters::new()
            .eq(FilterField::CourseId, locator.course_id)
            .eq_opt(FilterField::LectureId, locator.lecture_id)
            .eq_opt(FilterField::LectureUnitId, locator.lecture_unit_id)
            .eq_opt(FilterField::BaseUrl, locator.base_url.clone())
    }

    /// Run the three sub-pipelines concurrently and expand the summary
    /// segments into their transcriptions and pages.
    ///
    /// The returned lists are raw: duplicates are possible and nothing is
    /// reranked yet.
    #[instrument(skip(self, query, rewritten))]
    pub async fn retrieve(
        &self,
        query: &str,
        rewritten: &RewrittenQueries,
        locator: &LectureLocator,
    ) -> AppResult<RetrievalResult> {
        let filters = Self::scope_filters(locator);

        let (summary_segments, mut transcriptions, mut page_chunks) = tokio::try_join!(
            self.search_summaries(query, rewritten, &filters),
            self.search_transcriptions(query, rewritten, &filters),
            self.search_page_chunks(query, rewritten, &filters),
        )?;
        debug!(
            summaries = summary_segments.len(),
            transcriptions = transcriptions.len(),
            pages = page_chunks.len(),
            "Fan-out complete"
        );

        let (expanded_transcriptions, expanded_pages) = self.expand(&summary_segments).await?;
        transcriptions.extend(expanded_transcriptions);
        page_chunks.extend(expanded_pages);

        Ok(RetrievalResult {
            summary_segments,
            transcriptions,
            page_chunks,
        })
    }

    async fn search_summaries(
        &self,
        query: &str,
        rewritten: &RewrittenQueries,
        filters: &Filters,
    ) -> AppResult<Vec<SummarySegment>> {
        let plan = SearchPlan {
            collection: collections::SEGMENTS,
            return_fields: SEGMENT_FIELDS,
            raw_query: query,
            rewrite: &rewritten.transcription_query,
            hypothetical: &rewritten.transcription_hypothetical,
        };
        let hits = self.search_pair(&plan, filters).await?;
        records::parse_all(&hits, records::summary_segment)
    }

    async fn search_transcriptions(
        &self,
        query: &str,
        rewritten: &RewrittenQueries,
        filters: &Filters,
    ) -> AppResult<Vec<TranscriptionSegment>> {
        let plan = SearchPlan {
            collection: collections::TRANSCRIPTIONS,
            return_fields: TRANSCRIPTION_FIELDS,
            raw_query: query,
            rewrite: &rewritten.transcription_query,
            hypothetical: &rewritten.transcription_hypothetical,
        };
        let hits = self.search_pair(&plan, filters).await?;
        records::parse_all(&hits, records::transcription_segment)
    }

    async fn search_page_chunks(
        &self,
        query: &str,
        rewritten: &RewrittenQueries,
        filters: &Filters,
    ) -> AppResult<Vec<PageChunk>> {
        let plan = SearchPlan {
            collection: collections::PAGE_CHUNKS,
            return_fields: PAGE_CHUNK_FIELDS,
            raw_query: query,
            rewrite: &rewritten.page_query,
            hypothetical: &rewritten.page_hypothetical,
        };
        let hits = self.search_pair(&plan, filters).await?;
        records::parse_all(&hits, records::page_chunk)
    }

    /// Embed the rewrite and the hypothetical answer, then search twice:
    /// rewrite text with its vector, raw query text with the hypothetical's
    /// vector. Results are concatenated.
    async fn search_pair(&self, plan: &SearchPlan<'_>, filters: &Filters) -> AppResult<Vec<StoreRecord>> {
        let (rewrite_vector, hypothetical_vector) = tokio::try_join!(
            self.embedder.embed(plan.rewrite),
            self.embedder.embed(plan.hypothetical),
        )?;

        let by_rewrite = SearchRequest {
            collection: plan.collection,
            query: plan.rewrite.to_string(),
            vector: rewrite_vector,
            alpha: self.settings.hybrid_alpha,
            filters: filters.clone(),
            limit: self.settings.search_limit,
            return_fields: plan.return_fields,
        };
        let by_hypothetical = SearchRequest {
            query: plan.raw_query.to_string(),
            vector: hypothetical_vector,
            ..by_rewrite.clone()
        };

        let (mut hits, more) = tokio::try_join!(
            self.store.search(&by_rewrite),
            self.store.search(&by_hypothetical),
        )?;
        hits.extend(more);
        Ok(hits)
    }

    /// Fetch the transcriptions and pages each summary segment was built from.
    #[instrument(skip(self, segments), fields(segments = segments.len()))]
    pub async fn expand(
        &self,
        segments: &[SummarySegment],
    ) -> AppResult<(Vec<TranscriptionSegment>, Vec<PageChunk>)> {
        let lookups = segments.iter().map(|segment| self.expand_segment(segment));
        let expanded = try_join_all(lookups).await?;

        let mut transcriptions = Vec::new();
        let mut page_chunks = Vec::new();
        for (t, p) in expanded {
            transcriptions.extend(t);
            page_chunks.extend(p);
        }
        debug!(
            transcriptions = transcriptions.len(),
            pages = page_chunks.len(),
            "Expansion complete"
        );
        Ok((transcriptions, page_chunks))
    }

    async fn expand_segment(
        &self,
        segment: &SummarySegment,
    ) -> AppResult<(Vec<TranscriptionSegment>, Vec<PageChunk>)> {
        let filters = Filters::new()
            .eq(FilterField::CourseId, segment.course_id)
            .eq(FilterField::LectureId, segment.lecture_id)
            .eq(FilterField::LectureUnitId, segment.lecture_unit_id)
            .eq(FilterField::PageNumber, segment.page_number)
            .eq_opt(FilterField::BaseUrl, segment.base_url.clone());

        let transcription_request = FetchRequest {
            collection: collections::TRANSCRIPTIONS,
            filters: filters.clone(),
            limit: self.settings.expansion_limit,
            return_fields: TRANSCRIPTION_FIELDS,
        };
        let page_request = FetchRequest {
            collection: collections::PAGE_CHUNKS,
            filters,
            limit: self.settings.expansion_limit,
            return_fields: PAGE_CHUNK_FIELDS,
        };

        let (transcription_records, page_records) = tokio::try_join!(
            self.store.fetch(&transcription_request),
            self.store.fetch(&page_request),
        )?;

        Ok((
            records::parse_all(&transcription_records, records::transcription_segment)?,
            records::parse_all(&page_records, records::page_chunk)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::mock::MockProvider;
    use crate::store::InMemoryStore;
    use serde_json::json;

    fn rewritten() -> RewrittenQueries {
        RewrittenQueries {
            page_query: "semaphore slide".to_string(),
            transcription_query: "semaphore explanation".to_string(),
            page_hypothetical: "A semaphore is a counter".to_string(),
            transcription_hypothetical: "So a semaphore counts permits".to_string(),
        }
    }

    fn seeded_store() -> Arc<InMemoryStore> {
        let store = InMemoryStore::new();
        store
            .insert_with_uuid(
                collections::LECTURES,
                "lecture-2",
                json!({
                    "course_id": 1, "course_name": "Operating Systems",
                    "course_language": "English", "lecture_id": 2,
                    "lecture_name": "Synchronization"
                }),
                None,
            )
            .unwrap();
        store
            .insert_with_uuid(
                collections::SEGMENTS,
                "seg-1",
                json!({
                    "course_id": 1, "lecture_id": 2, "lecture_unit_id": 42,
                    "page_number": 7, "segment_summary": "Semaphores count permits"
                }),
                None,
            )
            .unwrap();
        store
            .insert_with_uuid(
                collections::PAGE_CHUNKS,
                "page-7",
                json!({
                    "course_id": 1, "lecture_id": 2, "lecture_unit_id": 42,
                    "page_number": 7, "page_text_content": "Semaphore: wait and signal"
                }),
                None,
            )
            .unwrap();
        store
            .insert_with_uuid(
                collections::TRANSCRIPTIONS,
                "tr-1",
                json!({
                    "course_id": 1, "lecture_id": 2, "lecture_unit_id": 42,
                    "page_number": 7, "segment_start_time": 12.0, "segment_end_time": 48.0,
                    "segment_text": "a semaphore has two operations"
                }),
                None,
            )
            .unwrap();
        Arc::new(store)
    }

    fn retriever(store: Arc<InMemoryStore>) -> MultiSourceRetriever {
        MultiSourceRetriever::new(
            store,
            Arc::new(MockProvider::new(32)),
            RetrievalSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_resolve_source_unit() {
        let retriever = retriever(seeded_store());

        let unit = retriever
            .resolve_source_unit(&LectureLocator::course(1).with_lecture(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unit.name, "Synchronization");

        let missing = retriever
            .resolve_source_unit(&LectureLocator::course(1).with_lecture(99))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_search_pair_concatenates_both_searches() {
        let retriever = retriever(seeded_store());
        let result = retriever
            .retrieve("what is a semaphore", &rewritten(), &LectureLocator::course(1))
            .await
            .unwrap();

        assert_eq!(result.summary_segments.len(), 2);
        // Two searches plus one expansion fetch per summary hit.
        assert_eq!(result.page_chunks.len(), 4);
        assert_eq!(result.transcriptions.len(), 4);
        assert!(result.page_chunks.iter().all(|p| p.uuid == "page-7"));
    }

    #[tokio::test]
    async fn test_scope_excludes_other_units() {
        let retriever = retriever(seeded_store());
        let result = retriever
            .retrieve(
                "semaphore",
                &rewritten(),
                &LectureLocator::course(1).with_lecture_unit(5),
            )
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_expand_matches_segment_page() {
        let retriever = retriever(seeded_store());
        let segment = SummarySegment {
            uuid: "seg-x".to_string(),
            course_id: 1,
            lecture_id: 2,
            lecture_unit_id: 42,
            page_number: 8,
            segment_summary: String::new(),
            base_url: None,
        };

        let (transcriptions, pages) = retriever.expand(&[segment]).await.unwrap();
        assert!(transcriptions.is_empty());
        assert!(pages.is_empty());
    }

    #[tokio::test]
    async fn test_expand_stays_within_lecture_and_base_url() {
        let store = seeded_store();
        for (uuid, lecture_id, base_url) in [
            ("page-other-lecture", 3, "https://a.example"),
            ("page-other-tenant", 2, "https://b.example"),
            ("page-same-tenant", 2, "https://a.example"),
        ] {
            store
                .insert_with_uuid(
                    collections::PAGE_CHUNKS,
                    uuid,
                    json!({
                        "course_id": 1, "lecture_id": lecture_id, "lecture_unit_id": 42,
                        "page_number": 9, "page_text_content": "semaphore",
                        "base_url": base_url
                    }),
                    None,
                )
                .unwrap();
        }
        let segment = SummarySegment {
            uuid: "seg-a".to_string(),
            course_id: 1,
            lecture_id: 2,
            lecture_unit_id: 42,
            page_number: 9,
            segment_summary: String::new(),
            base_url: Some("https://a.example".to_string()),
        };

        let (_, pages) = retriever(store).expand(&[segment]).await.unwrap();
        let uuids: Vec<&str> = pages.iter().map(|p| p.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["page-same-tenant"]);
    }

    #[test]
    fn test_scope_filters() {
        let filters = MultiSourceRetriever::scope_filters(
            &LectureLocator::course(1).with_base_url("https://lms.example"),
        );
        assert_eq!(filters.predicates().len(), 2);
        assert!(filters.get(FilterField::LectureUnitId).is_none());
    }
}
