//! Prompt loading and the prompt registry.
//!
//! The registry starts from the built-in definitions; a prompt directory can
//! override any of them with a `<id>.yml` file.

use crate::defaults::builtin_prompts;
use crate::types::PromptDefinition;
use std::collections::HashMap;
use std::path::Path;
use tutor_core::{AppError, AppResult};

/// Lookup table of prompt definitions by id.
#[derive(Debug, Clone)]
pub struct PromptRegistry {
    prompts: HashMap<String, PromptDefinition>,
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptRegistry {
    /// Registry holding only the built-in prompts.
    pub fn builtin() -> Self {
        let prompts = builtin_prompts()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Self { prompts }
    }

    /// Built-in prompts, overridden by every `<id>.yml` found in `dir`.
    pub fn with_overrides(dir: &Path) -> AppResult<Self> {
        let mut registry = Self::builtin();
        for id in list_prompts(dir)? {
            let definition = load_prompt(dir, &id)?;
            tracing::info!("Prompt override: {} ({})", definition.id, definition.title);
            registry.insert(definition);
        }
        Ok(registry)
    }

    /// Insert or replace a definition.
    pub fn insert(&mut self, definition: PromptDefinition) {
        self.prompts.insert(definition.id.clone(), definition);
    }

    /// Get a definition by id.
    pub fn get(&self, id: &str) -> AppResult<&PromptDefinition> {
        self.prompts
            .get(id)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", id)))
    }
}

/// Load a prompt definition `<id>.yml` from a directory.
pub fn load_prompt(prompts_dir: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir.join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file {:?} declares id '{}'",
            prompt_file, definition.id
        )));
    }

    validate_prompt(&definition)?;

    Ok(definition)
}

/// List the prompt ids available in a directory.
pub fn list_prompts(prompts_dir: &Path) -> AppResult<Vec<String>> {
    if !prompts_dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(prompts_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
