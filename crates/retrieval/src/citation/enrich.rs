//! Optional second model pass labelling citations with a keyword and a
//! one-sentence summary.

use super::extract::parse_line;
use super::types::{CitationEntry, ParsedLine};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use tutor_core::AppResult;
use tutor_llm::{ChatMessage, LlmClient, LlmRequest};
use tutor_prompt::{build_prompt, ids, PromptRegistry};

/// Cited content is cut to this many characters in the prompt.
const MAX_CONTENT_CHARS: usize = 600;

pub struct CitationEnricher {
    llm: Arc<dyn LlmClient>,
    model: String,
    prompts: Arc<PromptRegistry>,
}

impl CitationEnricher {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, prompts: Arc<PromptRegistry>) -> Self {
        Self {
            llm,
            model: model.into(),
            prompts,
        }
    }

    /// Fill keyword and summary on entries that lack them.
    ///
    /// Makes no call when every entry is already labelled. Reply lines for
    /// unknown indices are ignored; existing labels are never overwritten.
    #[instrument(skip_all, fields(entries = entries.len()))]
    pub async fn enrich(
        &self,
        query: &str,
        body: &str,
        mut entries: Vec<CitationEntry>,
    ) -> AppResult<Vec<CitationEntry>> {
        let pending: Vec<&CitationEntry> = entries
            .iter()
            .filter(|e| e.keyword.is_none() || e.summary.is_none())
            .collect();
        if pending.is_empty() {
            return Ok(entries);
        }

        let mut variables = HashMap::new();
        variables.insert("query".to_string(), query.to_string());
        variables.insert("answer".to_string(), body.to_string());
        variables.insert("citations".to_string(), render_sources(&pending));
        let built = build_prompt(self.prompts.get(ids::CITATION_KEYWORDS)?, variables)?;

        let mut request = LlmRequest::new(vec![ChatMessage::user(built.user)], &self.model);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(temperature) = built.temperature {
            request = request.with_temperature(temperature);
        }
        let response = self.llm.complete(&request).await?;

        let mut labels: HashMap<u32, (String, String)> = HashMap::new();
        for line in response.content.lines() {
            if let Some(ParsedLine::KeywordSummary {
                index,
                keyword,
                summary,
            }) = parse_line(line)
            {
                labels.entry(index).or_insert((keyword, summary));
            }
        }
        debug!(labels = labels.len(), "Parsed citation labels");

        for entry in &mut entries {
            if let Some((keyword, summary)) = labels.remove(&entry.index) {
                if entry.keyword.is_none() && !keyword.is_empty() {
                    entry.keyword = Some(keyword);
                }
                if entry.summary.is_none() && !summary.is_empty() {
                    entry.summary = Some(summary);
                }
            }
        }
        Ok(entries)
    }
}

/// `[n] <source line>` followed by the resolved content, per entry.
fn render_sources(entries: &[&CitationEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            let content: String = entry.content.chars().take(MAX_CONTENT_CHARS).collect();
            if content.is_empty() {
                format!("[{}] {}", entry.index, entry.source)
            } else {
                format!("[{}] {}\n{}", entry.index, entry.source, content.trim())
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
