//! Tutor RAG Core Library
//!
//! This crate provides the foundational utilities shared by the retrieval
//! and citation crates:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{
    AppConfig, EmbeddingSettings, LlmSettings, RerankSettings, RetrievalSettings,
};
pub use error::{AppError, AppResult};
