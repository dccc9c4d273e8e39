//! Vector store abstraction.
//!
//! The store is an external collaborator: the retrieval pipeline only
//! specifies what it asks for (collection, equality filters, limits, the
//! fields to return) and receives untyped records back. Ranking internals
//! belong to the store.

pub mod memory;

pub use memory::InMemoryStore;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tutor_core::AppResult;

/// Collection names.
pub mod collections {
    pub const LECTURES: &str = "Lectures";
    pub const SEGMENTS: &str = "LectureUnitSegments";
    pub const TRANSCRIPTIONS: &str = "LectureTranscriptions";
    pub const PAGE_CHUNKS: &str = "LectureUnitPageChunks";
}

/// Properties a filter can constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterField {
    CourseId,
    LectureId,
    LectureUnitId,
    PageNumber,
    BaseUrl,
}

impl FilterField {
    /// Property name in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CourseId => "course_id",
            Self::LectureId => "lecture_id",
            Self::LectureUnitId => "lecture_unit_id",
            Self::PageNumber => "page_number",
            Self::BaseUrl => "base_url",
        }
    }
}

/// Value side of an equality predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Int(i64),
    Text(String),
}

impl FilterValue {
    /// Whether a stored JSON value satisfies the predicate.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Int(expected) => value.as_i64() == Some(*expected),
            Self::Text(expected) => value.as_str() == Some(expected.as_str()),
        }
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Conjunction of equality predicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    predicates: Vec<(FilterField, FilterValue)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `field == value`.
    pub fn eq(mut self, field: FilterField, value: impl Into<FilterValue>) -> Self {
        self.predicates.push((field, value.into()));
        self
    }

    /// Add `field == value` when a value is present.
    pub fn eq_opt<V: Into<FilterValue>>(self, field: FilterField, value: Option<V>) -> Self {
        match value {
            Some(value) => self.eq(field, value),
            None => self,
        }
    }

    pub fn predicates(&self) -> &[(FilterField, FilterValue)] {
        &self.predicates
    }

    /// Value constrained for `field`, if any.
    pub fn get(&self, field: FilterField) -> Option<&FilterValue> {
        self.predicates
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v)
    }

    /// Whether a property map satisfies every predicate.
    pub fn matches(&self, properties: &Map<String, Value>) -> bool {
        self.predicates.iter().all(|(field, value)| {
            properties
                .get(field.as_str())
                .map(|stored| value.matches(stored))
                .unwrap_or(false)
        })
    }
}

/// A record as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    /// Store-assigned identity
    pub uuid: String,

    /// Requested properties
    pub properties: Map<String, Value>,
}

/// Filtered fetch without similarity ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub collection: &'static str,
    pub filters: Filters,
    pub limit: usize,
    pub return_fields: &'static [&'static str],
}

/// Hybrid similarity search: keyword relevance of `query` blended with
/// vector similarity to `vector` by `alpha` (1.0 = pure vector).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub collection: &'static str,
    pub query: String,
    pub vector: Vec<f32>,
    pub alpha: f32,
    pub filters: Filters,
    pub limit: usize,
    pub return_fields: &'static [&'static str],
}

/// Read access to the vector store.
///
/// Implementations are shared by concurrent sub-pipelines and must be
/// thread-safe; callers never lock around them.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Records matching all filters, at most `limit`.
    async fn fetch(&self, request: &FetchRequest) -> AppResult<Vec<StoreRecord>>;

    /// Records matching all filters, best match first, at most `limit`.
    async fn search(&self, request: &SearchRequest) -> AppResult<Vec<StoreRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filters_conjunction() {
        let filters = Filters::new()
            .eq(FilterField::CourseId, 1)
            .eq(FilterField::BaseUrl, "https://lms.example");

        assert!(filters.matches(&props(json!({"course_id": 1, "base_url": "https://lms.example"}))));
        assert!(!filters.matches(&props(json!({"course_id": 1, "base_url": "https://other"}))));
        assert!(!filters.matches(&props(json!({"course_id": 1}))));
    }

    #[test]
    fn test_type_mismatch_does_not_match() {
        let filters = Filters::new().eq(FilterField::PageNumber, 3);
        assert!(!filters.matches(&props(json!({"page_number": "3"}))));
    }

    #[test]
    fn test_eq_opt_skips_none() {
        let filters = Filters::new()
            .eq(FilterField::CourseId, 1)
            .eq_opt::<i64>(FilterField::LectureId, None)
            .eq_opt(FilterField::LectureUnitId, Some(9));

        assert_eq!(filters.predicates().len(), 2);
        assert_eq!(filters.get(FilterField::LectureUnitId), Some(&FilterValue::Int(9)));
        assert_eq!(filters.get(FilterField::LectureId), None);
    }

    #[test]
    fn test_empty_filters_match_everything() {
        assert!(Filters::new().matches(&Map::new()));
    }
}
