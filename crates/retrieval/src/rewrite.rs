//! Query rewriting and hypothetical-answer generation.
//!
//! One retrieval call needs four model-authored strings: a standalone query
//! and a hypothetical answer, each tuned once for slide pages and once for
//! transcriptions. The four chat calls are independent and run concurrently.

use crate::types::{ExerciseContext, SourceUnit};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use tutor_core::AppResult;
use tutor_llm::{ChatMessage, LlmClient, LlmRequest};
use tutor_prompt::{build_prompt, ids, PromptRegistry};

/// The four strings driving the retrieval fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenQueries {
    pub page_query: String,
    pub transcription_query: String,
    pub page_hypothetical: String,
    pub transcription_hypothetical: String,
}

/// Input to a rewrite pass.
#[derive(Debug, Clone, Copy)]
pub struct RewriteInput<'a> {
    pub query: &'a str,
    /// Most recent last
    pub chat_history: &'a [ChatMessage],
    pub unit: &'a SourceUnit,
    pub exercise: Option<&'a ExerciseContext>,
}

/// Produces [`RewrittenQueries`] through the chat-completion service.
pub struct QueryRewriter {
    llm: Arc<dyn LlmClient>,
    model: String,
    prompts: Arc<PromptRegistry>,
    history_limit: usize,
}

impl QueryRewriter {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompts: Arc<PromptRegistry>,
        history_limit: usize,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            prompts,
            history_limit,
        }
    }

    /// Run all four rewrites. Any failed call fails the whole pass.
    #[instrument(skip(self, input), fields(exercise = input.exercise.is_some()))]
    pub async fn rewrite(&self, input: RewriteInput<'_>) -> AppResult<RewrittenQueries> {
        let variables = self.variables(&input);

        let [page_query_id, transcription_query_id, page_hypothetical_id, transcription_hypothetical_id] =
            if input.exercise.is_some() {
                [
                    ids::REWRITE_PAGES_EXERCISE,
                    ids::REWRITE_TRANSCRIPTIONS_EXERCISE,
                    ids::HYPOTHETICAL_PAGES_EXERCISE,
                    ids::HYPOTHETICAL_TRANSCRIPTIONS_EXERCISE,
                ]
            } else {
                [
                    ids::REWRITE_PAGES,
                    ids::REWRITE_TRANSCRIPTIONS,
                    ids::HYPOTHETICAL_PAGES,
                    ids::HYPOTHETICAL_TRANSCRIPTIONS,
                ]
            };

        let (page_query, transcription_query, page_hypothetical, transcription_hypothetical) =
            tokio::try_join!(
                self.complete(page_query_id, &variables, input.query),
                self.complete(transcription_query_id, &variables, input.query),
                self.complete(page_hypothetical_id, &variables, input.query),
                self.complete(transcription_hypothetical_id, &variables, input.query),
            )?;

        debug!(
            page_query = %page_query,
            transcription_query = %transcription_query,
            "Query rewrites complete"
        );

        Ok(RewrittenQueries {
            page_query,
            transcription_query,
            page_hypothetical,
            transcription_hypothetical,
        })
    }

    fn variables(&self, input: &RewriteInput<'_>) -> HashMap<String, String> {
        let mut variables = HashMap::new();
        variables.insert("query".to_string(), input.query.to_string());
        variables.insert("course_name".to_string(), input.unit.course_name.clone());
        variables.insert("course_language".to_string(), input.unit.language.clone());
        variables.insert(
            "chat_history".to_string(),
            format_history(input.chat_history, self.history_limit),
        );
        if let Some(exercise) = input.exercise {
            variables.insert("exercise_title".to_string(), exercise.title.clone());
            variables.insert(
                "problem_statement".to_string(),
                exercise.problem_statement.clone(),
            );
        }
        variables
    }

    /// One chat call. A blank reply falls back to the raw query.
    async fn complete(
        &self,
        prompt_id: &str,
        variables: &HashMap<String, String>,
        query: &str,
    ) -> AppResult<String> {
        let built = build_prompt(self.prompts.get(prompt_id)?, variables.clone())?;

        let mut request = LlmRequest::new(vec![ChatMessage::user(built.user)], &self.model);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(temperature) = built.temperature {
            request = request.with_temperature(temperature);
        }

        let response = self.llm.complete(&request).await?;
        let text = response.content.trim();
        if text.is_empty() {
            warn!(prompt = prompt_id, "Empty rewrite, using the raw query");
            return Ok(query.to_string());
        }
        Ok(text.to_string())
    }
}

/// Render the last `limit` turns as `role: content` lines.
pub fn format_history(history: &[ChatMessage], limit: usize) -> String {
    let start = history.len().saturating_sub(limit);
    history[start..]
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}
