//! In-memory [`VectorStore`] for tests and local development.
//!
//! Vector search is brute-force cosine similarity; keyword relevance is the
//! share of query terms that occur in the record's text properties.

use super::{FetchRequest, SearchRequest, StoreRecord, VectorStore};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tutor_core::{AppError, AppResult};

struct StoredObject {
    uuid: String,
    properties: Map<String, Value>,
    vector: Option<Vec<f32>>,
}

/// In-memory store keyed by collection name.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<StoredObject>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object and return its generated uuid.
    pub fn insert(
        &self,
        collection: &str,
        properties: Value,
        vector: Option<Vec<f32>>,
    ) -> AppResult<String> {
        let uuid = uuid::Uuid::new_v4().to_string();
        self.insert_with_uuid(collection, &uuid, properties, vector)?;
        Ok(uuid)
    }

    /// Insert an object under a caller-chosen uuid.
    pub fn insert_with_uuid(
        &self,
        collection: &str,
        uuid: &str,
        properties: Value,
        vector: Option<Vec<f32>>,
    ) -> AppResult<()> {
        let Value::Object(properties) = properties else {
            return Err(AppError::Store(format!(
                "Properties for '{}' must be a JSON object",
                collection
            )));
        };

        let mut collections = self
            .collections
            .write()
            .map_err(|_| AppError::Store("In-memory store lock poisoned".to_string()))?;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(StoredObject {
                uuid: uuid.to_string(),
                properties,
                vector,
            });
        Ok(())
    }

    /// Number of objects in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }
}

fn project(object: &StoredObject, fields: &[&str]) -> StoreRecord {
    let properties = fields
        .iter()
        .filter_map(|f| {
            object
                .properties
                .get(*f)
                .map(|v| (f.to_string(), v.clone()))
        })
        .collect();
    StoreRecord {
        uuid: object.uuid.clone(),
        properties,
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

fn keyword_score(query_terms: &HashSet<String>, properties: &Map<String, Value>) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let mut text_terms = HashSet::new();
    for value in properties.values() {
        if let Some(text) = value.as_str() {
            text_terms.extend(terms(text));
        }
    }
    let hits = query_terms.iter().filter(|t| text_terms.contains(*t)).count();
    hits as f32 / query_terms.len() as f32
}

#[async_trait::async_trait]
impl VectorStore for InMemoryStore {
    async fn fetch(&self, request: &FetchRequest) -> AppResult<Vec<StoreRecord>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| AppError::Store("In-memory store lock poisoned".to_string()))?;

        let Some(objects) = collections.get(request.collection) else {
            return Ok(Vec::new());
        };

        Ok(objects
            .iter()
            .filter(|o| request.filters.matches(&o.properties))
            .take(request.limit)
            .map(|o| project(o, request.return_fields))
            .collect())
    }

    async fn search(&self, request: &SearchRequest) -> AppResult<Vec<StoreRecord>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| AppError::Store("In-memory store lock poisoned".to_string()))?;

        let Some(objects) = collections.get(request.collection) else {
            return Ok(Vec::new());
        };

        let query_terms = terms(&request.query);
        let mut scored: Vec<(f32, &StoredObject)> = objects
            .iter()
            .filter(|o| request.filters.matches(&o.properties))
            .map(|o| {
                let vector_score = o
                    .vector
                    .as_deref()
                    .map(|v| cosine_similarity(v, &request.vector))
                    .unwrap_or(0.0);
                let keyword = keyword_score(&query_terms, &o.properties);
                (
                    request.alpha * vector_score + (1.0 - request.alpha) * keyword,
                    o,
                )
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(request.limit)
            .map(|(_, o)| project(o, request.return_fields))
            .collect())
    }
}
