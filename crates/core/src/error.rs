//! Error types for the tutor RAG subsystem.
//!
//! A single error enum covers configuration, external service calls
//! (chat completion, embedding, vector store, rerank), store schema
//! violations and deadlines.

use thiserror::Error;

/// Unified error type for the tutor RAG subsystem.
///
/// Every fallible operation returns `Result<T, AppError>`. Parse misses and
/// unresolved citation indices are not errors and never show up here.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Chat-completion provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding service errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector store query errors
    #[error("Store error: {0}")]
    Store(String),

    /// A store record is missing a field or carries the wrong type.
    #[error("Schema violation in '{collection}' field '{field}': {reason}")]
    Schema {
        collection: String,
        field: String,
        reason: String,
    },

    /// Rerank service errors
    #[error("Rerank error: {0}")]
    Rerank(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// The caller-supplied deadline elapsed before the call finished
    #[error("Deadline of {0:?} exceeded")]
    Timeout(std::time::Duration),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Build a schema violation error.
    pub fn schema(
        collection: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        AppError::Schema {
            collection: collection.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
