//! Citation post-processing of model answers.
//!
//! `extract` splits an answer into body and citation entries, `resolve`
//! attaches retrieved content, `enrich` optionally asks the model for
//! keyword/summary labels, and `inline` turns `[n]` markers into tokens.

pub mod enrich;
pub mod extract;
pub mod inline;
pub mod resolve;
pub mod types;

pub use enrich::CitationEnricher;
pub use extract::{extract, parse_line, ExtractedCitations, NO_CITATION_SENTINEL};
pub use inline::{
    citation_token, escape_field, inline_answer, inline_answer_with_faqs, inline_citations,
    CitationPipeline, InlinedAnswer,
};
pub use resolve::CitationResolver;
pub use types::{CitationEntry, CitationKind, CitationSource, FaqEntry, ParsedLine, TimeOffset};
