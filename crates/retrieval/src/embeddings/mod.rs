//! Embedding service seam.
//!
//! The retriever only calls [`EmbeddingProvider::embed`]; vectors are opaque
//! to it and passed straight to the store.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
