//! Attach retrieved content to citation entries.

use super::types::{CitationEntry, CitationSource, FaqEntry, TimeOffset};
use crate::types::RetrievalResult;
use std::collections::HashMap;
use tracing::debug;

type TranscriptionKey = (i64, Option<i64>, TimeOffset, TimeOffset);
type UnpagedKey = (i64, TimeOffset, TimeOffset);

/// Resolves entries against the fragments and FAQs an answer was built from.
///
/// Lookups are exact on the composite key. A transcription citation whose
/// page is unset or does not match falls back to the same unit and time
/// range on any page. Nothing is ever dropped: an unmatched entry keeps
/// empty content.
pub struct CitationResolver<'a> {
    slides: HashMap<(i64, i64), &'a str>,
    transcriptions: HashMap<TranscriptionKey, &'a str>,
    unpaged: HashMap<UnpagedKey, &'a str>,
    faqs: HashMap<i64, String>,
}

impl<'a> CitationResolver<'a> {
    pub fn new(result: &'a RetrievalResult) -> Self {
        let mut slides = HashMap::new();
        for page in &result.page_chunks {
            slides
                .entry((page.lecture_unit_id, page.page_number))
                .or_insert(page.page_text_content.as_str());
        }

        let mut transcriptions = HashMap::new();
        let mut unpaged = HashMap::new();
        for segment in &result.transcriptions {
            let start = TimeOffset::from_secs_f64(segment.segment_start_time);
            let end = TimeOffset::from_secs_f64(segment.segment_end_time);
            let text = segment.segment_text.as_str();
            transcriptions
                .entry((segment.lecture_unit_id, segment.page_number, start, end))
                .or_insert(text);
            unpaged
                .entry((segment.lecture_unit_id, start, end))
                .or_insert(text);
        }

        Self {
            slides,
            transcriptions,
            unpaged,
            faqs: HashMap::new(),
        }
    }

    /// Also resolve FAQ citations, rendered as `title: answer`.
    pub fn with_faqs(mut self, faqs: &[FaqEntry]) -> Self {
        for faq in faqs {
            self.faqs
                .entry(faq.id)
                .or_insert_with(|| format!("{}: {}", faq.title.trim(), faq.answer.trim()));
        }
        self
    }

    /// Content for one source, if any fragment matches.
    pub fn lookup(&self, source: &CitationSource) -> Option<&str> {
        match source {
            CitationSource::Slide {
                lecture_unit_id,
                page,
            } => self.slides.get(&(*lecture_unit_id, *page)).copied(),
            CitationSource::Transcription {
                lecture_unit_id,
                page,
                start,
                end,
            } => self
                .transcriptions
                .get(&(*lecture_unit_id, *page, *start, *end))
                .or_else(|| self.unpaged.get(&(*lecture_unit_id, *start, *end)))
                .copied(),
            CitationSource::Faq { faq_id } => self.faqs.get(faq_id).map(String::as_str),
        }
    }

    /// Fill `content` on every entry. Order and indices are kept.
    pub fn resolve(&self, mut entries: Vec<CitationEntry>) -> Vec<CitationEntry> {
        let mut unresolved = 0;
        for entry in &mut entries {
            match self.lookup(&entry.source) {
                Some(content) => entry.content = content.to_string(),
                None => {
                    entry.content.clear();
                    unresolved += 1;
                }
            }
        }
        debug!(entries = entries.len(), unresolved, "Resolved citations");
        entries
    }
}
