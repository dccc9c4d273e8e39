//! Replace `[n]` markers with self-describing citation tokens.

use super::enrich::CitationEnricher;
use super::extract::{extract, NO_CITATION_SENTINEL};
use super::resolve::CitationResolver;
use super::types::{CitationEntry, CitationSource, FaqEntry};
use crate::types::RetrievalResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};
use tutor_core::AppResult;

/// An answer with inline tokens and the citations they refer to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlinedAnswer {
    pub text: String,
    pub citations: Vec<CitationEntry>,
}

/// Escape a token field: `\`, `:` and `]` get a backslash, newlines become
/// a space.
pub fn escape_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' | ':' | ']' => {
                out.push('\\');
                out.push(c);
            }
            '\r' => {
                if chars.peek() != Some(&'\n') {
                    out.push(' ');
                }
            }
            '\n' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// `[cite:<K>:<source>:<page>:<start>:<end>:<keyword>:<summary>]`
pub fn citation_token(entry: &CitationEntry) -> String {
    let (source, page, start, end) = match &entry.source {
        CitationSource::Slide {
            lecture_unit_id,
            page,
        } => (lecture_unit_id.to_string(), page.to_string(), String::new(), String::new()),
        CitationSource::Transcription {
            lecture_unit_id,
            page,
            start,
            end,
        } => (
            lecture_unit_id.to_string(),
            page.map(|p| p.to_string()).unwrap_or_default(),
            start.to_string(),
            end.to_string(),
        ),
        CitationSource::Faq { faq_id } => {
            (faq_id.to_string(), String::new(), String::new(), String::new())
        }
    };

    format!(
        "[cite:{}:{}:{}:{}:{}:{}:{}]",
        entry.kind().code(),
        source,
        page,
        start,
        end,
        escape_field(entry.keyword.as_deref().unwrap_or_default()),
        escape_field(entry.summary.as_deref().unwrap_or_default()),
    )
}

/// Replace every `[n]` marker that has an entry with its token.
///
/// Markers without an entry stay as written. A body that is exactly the
/// no-citation sentinel is returned verbatim.
pub fn inline_citations(body: &str, entries: &[CitationEntry]) -> String {
    if body.trim() == NO_CITATION_SENTINEL {
        return body.to_string();
    }

    let by_index: HashMap<u32, &CitationEntry> = entries.iter().map(|e| (e.index, e)).collect();

    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let candidate = &rest[open + 1..];

        let digits = candidate
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(candidate.len());
        let entry = (digits > 0 && candidate[digits..].starts_with(']'))
            .then(|| candidate[..digits].parse::<u32>().ok())
            .flatten()
            .and_then(|index| by_index.get(&index));

        match entry {
            Some(entry) => {
                out.push_str(&citation_token(entry));
                rest = &candidate[digits + 1..];
            }
            None => {
                out.push('[');
                rest = candidate;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Extract, resolve and inline in one step.
pub fn inline_answer(text: &str, result: &RetrievalResult) -> InlinedAnswer {
    inline_answer_with_faqs(text, result, &[])
}

/// [`inline_answer`] with FAQ entries available for resolution.
pub fn inline_answer_with_faqs(
    text: &str,
    result: &RetrievalResult,
    faqs: &[FaqEntry],
) -> InlinedAnswer {
    let extracted = extract(text);
    let citations = CitationResolver::new(result)
        .with_faqs(faqs)
        .resolve(extracted.entries);
    InlinedAnswer {
        text: inline_citations(&extracted.body, &citations),
        citations,
    }
}

/// Citation post-processing with an optional keyword/summary pass.
#[derive(Default)]
pub struct CitationPipeline {
    enricher: Option<CitationEnricher>,
}

impl CitationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enricher(mut self, enricher: CitationEnricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Turn a raw model answer into inlined text plus resolved citations.
    #[instrument(skip_all, fields(enrich = self.enricher.is_some()))]
    pub async fn process(
        &self,
        query: &str,
        text: &str,
        result: &RetrievalResult,
        faqs: &[FaqEntry],
    ) -> AppResult<InlinedAnswer> {
        let extracted = extract(text);
        let mut citations = CitationResolver::new(result)
            .with_faqs(faqs)
            .resolve(extracted.entries);

        if let Some(enricher) = &self.enricher {
            citations = enricher.enrich(query, &extracted.body, citations).await?;
        }

        let text = inline_citations(&extracted.body, &citations);
        debug!(citations = citations.len(), "Citations inlined");
        Ok(InlinedAnswer { text, citations })
    }
}
