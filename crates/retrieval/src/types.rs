//! Retrieval data model.
//!
//! Store records are converted into these types at the retrieval boundary
//! (see [`crate::records`]); nothing past that point deals with untyped
//! property maps.

use serde::{Deserialize, Serialize};
use tutor_llm::ChatMessage;

/// A lecture: the indexed content unit chunks and segments belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Stable lecture id
    pub id: i64,

    /// Display name of the lecture
    pub name: String,

    /// Free-text language of the course (e.g. "English")
    pub language: String,

    /// Free-text description
    pub description: String,

    pub course_id: i64,
    pub course_name: String,

    /// Scoping key of the learning platform instance the lecture lives on
    pub base_url: Option<String>,
}

/// Where to look: a course, optionally narrowed to a lecture and a lecture unit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LectureLocator {
    pub course_id: i64,
    pub lecture_id: Option<i64>,
    pub lecture_unit_id: Option<i64>,
    pub base_url: Option<String>,
}

impl LectureLocator {
    pub fn course(course_id: i64) -> Self {
        Self {
            course_id,
            ..Default::default()
        }
    }

    pub fn with_lecture(mut self, lecture_id: i64) -> Self {
        self.lecture_id = Some(lecture_id);
        self
    }

    pub fn with_lecture_unit(mut self, lecture_unit_id: i64) -> Self {
        self.lecture_unit_id = Some(lecture_unit_id);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Exercise the student is currently working on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseContext {
    pub title: String,
    pub problem_statement: String,
}

/// Everything a single retrieval call needs.
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    /// The student's latest question
    pub query: String,

    /// Conversation so far, most recent last
    pub chat_history: Vec<ChatMessage>,

    pub locator: LectureLocator,

    pub exercise: Option<ExerciseContext>,
}

impl RetrievalRequest {
    pub fn new(query: impl Into<String>, locator: LectureLocator) -> Self {
        Self {
            query: query.into(),
            chat_history: Vec::new(),
            locator,
            exercise: None,
        }
    }

    pub fn with_history(mut self, chat_history: Vec<ChatMessage>) -> Self {
        self.chat_history = chat_history;
        self
    }

    pub fn with_exercise(mut self, exercise: ExerciseContext) -> Self {
        self.exercise = Some(exercise);
        self
    }
}

/// Pre-computed digest of one slide page and its matching transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySegment {
    pub uuid: String,
    pub course_id: i64,
    pub lecture_id: i64,
    pub lecture_unit_id: i64,
    pub page_number: i64,
    pub segment_summary: String,
    pub base_url: Option<String>,
}

/// A time-coded piece of a lecture recording transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionSegment {
    pub uuid: String,
    pub course_id: i64,
    pub lecture_id: i64,
    pub lecture_unit_id: i64,
    /// Slide shown while the segment was spoken, when known
    pub page_number: Option<i64>,
    /// Offsets into the recording, in seconds
    pub segment_start_time: f64,
    pub segment_end_time: f64,
    pub segment_text: String,
}

/// Text content of one slide page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageChunk {
    pub uuid: String,
    pub course_id: i64,
    pub lecture_id: i64,
    pub lecture_unit_id: i64,
    pub page_number: i64,
    pub page_text_content: String,
}

/// Anything carrying a store-assigned uuid.
pub trait Identified {
    fn uuid(&self) -> &str;
}

impl Identified for SummarySegment {
    fn uuid(&self) -> &str {
        &self.uuid
    }
}

impl Identified for TranscriptionSegment {
    fn uuid(&self) -> &str {
        &self.uuid
    }
}

impl Identified for PageChunk {
    fn uuid(&self) -> &str {
        &self.uuid
    }
}

/// A retrieved fragment of one of the three content stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetrievedChunk {
    Summary(SummarySegment),
    Transcription(TranscriptionSegment),
    Page(PageChunk),
}

impl RetrievedChunk {
    pub fn lecture_unit_id(&self) -> i64 {
        match self {
            Self::Summary(s) => s.lecture_unit_id,
            Self::Transcription(t) => t.lecture_unit_id,
            Self::Page(p) => p.lecture_unit_id,
        }
    }

    /// The variant's text payload.
    pub fn text(&self) -> &str {
        match self {
            Self::Summary(s) => &s.segment_summary,
            Self::Transcription(t) => &t.segment_text,
            Self::Page(p) => &p.page_text_content,
        }
    }
}

impl Identified for RetrievedChunk {
    fn uuid(&self) -> &str {
        match self {
            Self::Summary(s) => &s.uuid,
            Self::Transcription(t) => &t.uuid,
            Self::Page(p) => &p.uuid,
        }
    }
}

/// Result of one retrieval call, one ordered list per content store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub summary_segments: Vec<SummarySegment>,
    pub transcriptions: Vec<TranscriptionSegment>,
    pub page_chunks: Vec<PageChunk>,
}

impl RetrievalResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.summary_segments.is_empty()
            && self.transcriptions.is_empty()
            && self.page_chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.summary_segments.len() + self.transcriptions.len() + self.page_chunks.len()
    }

    /// All fragments as one list: summaries, then transcriptions, then pages.
    pub fn chunks(&self) -> Vec<RetrievedChunk> {
        self.summary_segments
            .iter()
            .cloned()
            .map(RetrievedChunk::Summary)
            .chain(self.transcriptions.iter().cloned().map(RetrievedChunk::Transcription))
            .chain(self.page_chunks.iter().cloned().map(RetrievedChunk::Page))
            .collect()
    }

    /// Render the fragments for an answering prompt.
    ///
    /// Each fragment is introduced by a header in the same shape the citation
    /// grammar expects, so the model can copy it into its citation list.
    pub fn render_context(&self) -> String {
        let mut out = String::new();

        if !self.page_chunks.is_empty() {
            out.push_str("## Lecture slides\n\n");
            for page in &self.page_chunks {
                out.push_str(&format!(
                    "Lecture Unit ID: {}, Page: {}\n{}\n\n",
                    page.lecture_unit_id,
                    page.page_number,
                    page.page_text_content.trim()
                ));
            }
        }

        if !self.transcriptions.is_empty() {
            out.push_str("## Lecture transcriptions\n\n");
            for segment in &self.transcriptions {
                let page = segment
                    .page_number
                    .map(|p| format!(", Page: {}", p))
                    .unwrap_or_default();
                out.push_str(&format!(
                    "Lecture Unit ID: {}{}, Start: {}, End: {}\n{}\n\n",
                    segment.lecture_unit_id,
                    page,
                    segment.segment_start_time,
                    segment.segment_end_time,
                    segment.segment_text.trim()
                ));
            }
        }

        if !self.summary_segments.is_empty() {
            out.push_str("## Segment summaries\n\n");
            for segment in &self.summary_segments {
                out.push_str(&format!(
                    "Lecture Unit ID: {}, Page: {}\n{}\n\n",
                    segment.lecture_unit_id,
                    segment.page_number,
                    segment.segment_summary.trim()
                ));
            }
        }

        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(uuid: &str, unit: i64, page_number: i64, text: &str) -> PageChunk {
        PageChunk {
            uuid: uuid.to_string(),
            course_id: 1,
            lecture_id: 2,
            lecture_unit_id: unit,
            page_number,
            page_text_content: text.to_string(),
        }
    }

    #[test]
    fn test_empty_result() {
        let result = RetrievalResult::empty();
        assert!(result.is_empty());
        assert_eq!(result.len(), 0);
        assert_eq!(result.render_context(), "");
    }

    #[test]
    fn test_render_context_uses_citation_headers() {
        let result = RetrievalResult {
            summary_segments: Vec::new(),
            transcriptions: vec![TranscriptionSegment {
                uuid: "t1".to_string(),
                course_id: 1,
                lecture_id: 2,
                lecture_unit_id: 5,
                page_number: None,
                segment_start_time: 12.0,
                segment_end_time: 48.5,
                segment_text: "Today we talk about deadlocks.".to_string(),
            }],
            page_chunks: vec![page("p1", 42, 7, "Deadlock: circular wait")],
        };

        let context = result.render_context();
        assert!(context.contains("Lecture Unit ID: 42, Page: 7\nDeadlock: circular wait"));
        assert!(context.contains("Lecture Unit ID: 5, Start: 12, End: 48.5"));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_chunk_serialization_is_tagged() {
        let chunk = RetrievedChunk::Page(page("p1", 42, 7, "text"));
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["kind"], "page");
        assert_eq!(chunk.uuid(), "p1");
        assert_eq!(chunk.text(), "text");
        assert_eq!(chunk.lecture_unit_id(), 42);
    }

    #[test]
    fn test_locator_builder() {
        let locator = LectureLocator::course(3)
            .with_lecture(4)
            .with_lecture_unit(5)
            .with_base_url("https://lms.example");
        assert_eq!(locator.lecture_id, Some(4));
        assert_eq!(locator.lecture_unit_id, Some(5));
        assert_eq!(locator.base_url.as_deref(), Some("https://lms.example"));
    }
}
