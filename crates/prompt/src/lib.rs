//! Prompt system for the tutor RAG subsystem.
//!
//! This crate provides:
//! - Built-in prompt definitions for query rewriting and citation enrichment
//! - YAML overrides loaded from a prompt directory
//! - Handlebars template rendering

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use defaults::{builtin_prompts, ids};
pub use loader::{list_prompts, load_prompt, PromptRegistry};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
