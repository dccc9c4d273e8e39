//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use handlebars::Handlebars;
use std::collections::HashMap;
use tutor_core::{AppError, AppResult};

/// Build a prompt from a definition and input variables.
///
/// Both the system and the user template are rendered with the same
/// variables. Missing variables render as empty strings, so optional
/// context (e.g. an exercise title) can be guarded with `{{#if}}`.
///
/// # Example
/// ```
/// use tutor_prompt::{build_prompt, PromptDefinition};
/// use std::collections::HashMap;
///
/// let def = PromptDefinition {
///     id: "demo".to_string(),
///     title: "Demo".to_string(),
///     api_version: "1.0".to_string(),
///     system: None,
///     template: "Question: {{query}}".to_string(),
///     temperature: None,
/// };
/// let mut vars = HashMap::new();
/// vars.insert("query".to_string(), "What is a mutex?".to_string());
///
/// let built = build_prompt(&def, vars).unwrap();
/// assert_eq!(built.user, "Question: What is a mutex?");
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, &variables))
        .transpose()?;
    let user = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt {
        system,
        user,
        temperature: definition.temperature,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            resolved_variables: variables,
        },
    })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(system: Option<&str>, template: &str) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            system: system.map(str::to_string),
            template: template.to_string(),
            temperature: Some(0.1),
        }
    }

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), "Hello, <world>!".to_string());

        let result = render_template("Question: {{query}}", &vars).unwrap();
        assert_eq!(result, "Question: Hello, <world>!");
    }

    #[test]
    fn test_build_prompt_renders_system_and_user() {
        let def = definition(Some("Course: {{course_name}}"), "Q: {{query}}");
        let mut vars = HashMap::new();
        vars.insert("course_name".to_string(), "Operating Systems".to_string());
        vars.insert("query".to_string(), "What is paging?".to_string());

        let built = build_prompt(&def, vars).unwrap();
        assert_eq!(built.system.as_deref(), Some("Course: Operating Systems"));
        assert_eq!(built.user, "Q: What is paging?");
        assert_eq!(built.temperature, Some(0.1));
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
    }

    #[test]
    fn test_conditional_section_skipped_for_empty_value() {
        let def = definition(None, "{{#if exercise_title}}Exercise: {{exercise_title}}\n{{/if}}Q");
        let mut vars = HashMap::new();
        vars.insert("exercise_title".to_string(), String::new());

        let built = build_prompt(&def, vars).unwrap();
        assert_eq!(built.user, "Q");
    }

    #[test]
    fn test_render_template_missing_variable() {
        let vars = HashMap::new();
        let result = render_template("Question: {{missing}}", &vars).unwrap();
        assert_eq!(result, "Question: ");
    }

    #[test]
    fn test_unbalanced_template_is_error() {
        let vars = HashMap::new();
        let result = render_template("{{#if x}}never closed", &vars);
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }
}
