//! Citation block extraction from model-authored answers.
//!
//! An answer is a body with `[n]` markers, optionally followed by a citation
//! list and then by a keyword/summary list:
//!
//! ```text
//! A semaphore guards a critical section [1].
//!
//! Citations:
//! [1] Lecture Unit ID: 42, Page: 7
//!
//! [1] Keyword: Semaphores; Summary: Defines wait and signal.
//! ```
//!
//! Lines are classified by [`parse_line`]; blocks are peeled off bottom-up.

use super::types::{CitationEntry, CitationSource, ParsedLine, TimeOffset};
use std::collections::HashMap;
use tracing::debug;

/// Token the model writes instead of a citation list when nothing applies.
pub const NO_CITATION_SENTINEL: &str = "!NONE!";

const HEADERS: &[&str] = &["citations", "sources", "references", "keywords"];

/// Body and citation entries of one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedCitations {
    /// Answer text with trailing blocks removed
    pub body: String,

    /// Entries in citation-list order, unique by index, content unresolved
    pub entries: Vec<CitationEntry>,
}

/// Cursor over one line.
struct LineParser<'a> {
    rest: &'a str,
}

impl<'a> LineParser<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    /// Consume `label`, ASCII case-insensitively.
    fn label(&mut self, label: &str) -> Option<()> {
        self.skip_ws();
        let head = self.rest.get(..label.len())?;
        if !head.eq_ignore_ascii_case(label) {
            return None;
        }
        self.rest = &self.rest[label.len()..];
        Some(())
    }

    fn punct(&mut self, c: char) -> Option<()> {
        self.skip_ws();
        self.rest = self.rest.strip_prefix(c)?;
        Some(())
    }

    /// `label:`
    fn field(&mut self, label: &str) -> Option<()> {
        self.label(label)?;
        self.punct(':')
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> Option<&'a str> {
        self.skip_ws();
        let end = self
            .rest
            .find(|c: char| !accept(c))
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let (taken, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(taken)
    }

    fn integer<T: std::str::FromStr>(&mut self) -> Option<T> {
        self.take_while(|c| c.is_ascii_digit())?.parse().ok()
    }

    fn time(&mut self) -> Option<TimeOffset> {
        self.take_while(|c| c.is_ascii_digit() || c == '.')?
            .parse()
            .ok()
    }

    fn at_end(&self) -> bool {
        self.rest.trim().is_empty()
    }

    /// Remaining text, consuming it.
    fn remainder(&mut self) -> &'a str {
        std::mem::take(&mut self.rest)
    }
}

/// Strip surrounding whitespace and a leading list bullet.
fn strip_bullet(line: &str) -> &str {
    let line = line.trim();
    for bullet in ['-', '*'] {
        if let Some(rest) = line.strip_prefix(bullet) {
            if rest.starts_with(char::is_whitespace) {
                return rest.trim_start();
            }
        }
    }
    line
}

fn keyword_summary(p: &mut LineParser<'_>, index: u32) -> Option<ParsedLine> {
    p.field("Keyword")?;
    let rest = p.remainder();
    let (keyword, after) = rest.split_once(';')?;
    let mut p = LineParser::new(after);
    p.field("Summary")?;
    Some(ParsedLine::KeywordSummary {
        index,
        keyword: keyword.trim().to_string(),
        summary: p.remainder().trim().to_string(),
    })
}

fn transcription(p: &mut LineParser<'_>, index: u32) -> Option<ParsedLine> {
    p.field("Lecture Unit ID")?;
    let lecture_unit_id = p.integer()?;
    p.punct(',')?;

    // Page is optional; backtrack if the next field is Start.
    let checkpoint = p.rest;
    let page = match p.field("Page") {
        Some(()) => {
            let page = p.integer()?;
            p.punct(',')?;
            Some(page)
        }
        None => {
            p.rest = checkpoint;
            None
        }
    };

    p.field("Start")?;
    let start = p.time()?;
    p.punct(',')?;
    p.field("End")?;
    let end = p.time()?;

    p.at_end().then_some(ParsedLine::Citation {
        index,
        source: CitationSource::Transcription {
            lecture_unit_id,
            page,
            start,
            end,
        },
    })
}

fn slide(p: &mut LineParser<'_>, index: u32) -> Option<ParsedLine> {
    p.field("Lecture Unit ID")?;
    let lecture_unit_id = p.integer()?;
    p.punct(',')?;
    p.field("Page")?;
    let page = p.integer()?;

    p.at_end().then_some(ParsedLine::Citation {
        index,
        source: CitationSource::Slide {
            lecture_unit_id,
            page,
        },
    })
}

fn faq(p: &mut LineParser<'_>, index: u32) -> Option<ParsedLine> {
    p.field("FAQ ID")?;
    let faq_id = p.integer()?;

    p.at_end().then_some(ParsedLine::Citation {
        index,
        source: CitationSource::Faq { faq_id },
    })
}

/// Classify one line.
///
/// Grammars are tried in a fixed order: keyword/summary, transcription,
/// slide, FAQ. Anything else is `None`.
pub fn parse_line(line: &str) -> Option<ParsedLine> {
    let mut head = LineParser::new(strip_bullet(line));
    head.punct('[')?;
    let index: u32 = head.integer()?;
    head.punct(']')?;
    let rest = head.rest;

    type Grammar = fn(&mut LineParser<'_>, u32) -> Option<ParsedLine>;
    const GRAMMARS: [Grammar; 4] = [keyword_summary, transcription, slide, faq];

    GRAMMARS
        .iter()
        .find_map(|grammar| grammar(&mut LineParser::new(rest), index))
}

fn is_citation(line: &str) -> bool {
    matches!(parse_line(line), Some(ParsedLine::Citation { .. }))
}

fn is_keyword_summary(line: &str) -> bool {
    matches!(parse_line(line), Some(ParsedLine::KeywordSummary { .. }))
}

/// Header lines such as `Citations:` or `**Sources**`.
fn is_header(line: &str) -> bool {
    let stripped = line
        .trim()
        .trim_matches(|c: char| c == '*' || c == '_' || c == '#' || c.is_whitespace())
        .trim_end_matches(':')
        .trim_matches(|c: char| c == '*' || c == '_' || c.is_whitespace());
    HEADERS.iter().any(|h| stripped.eq_ignore_ascii_case(h))
}

fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed == NO_CITATION_SENTINEL || is_header(trimmed)
}

/// Start of the trailing run of lines satisfying `member`, blank lines
/// inside the run tolerated. `None` when the run holds no member line.
fn trailing_run(lines: &[&str], end: usize, member: fn(&str) -> bool) -> Option<usize> {
    let mut start = None;
    for i in (0..end).rev() {
        if member(lines[i]) {
            start = Some(i);
        } else if !lines[i].trim().is_empty() {
            break;
        }
    }
    start
}

fn skip_separators(lines: &[&str], mut end: usize) -> usize {
    while end > 0 && is_separator(lines[end - 1]) {
        end -= 1;
    }
    end
}

/// Split an answer into its body and citation entries.
///
/// Without a citation block the whole input is the body and no entries are
/// returned, even if keyword lines were present.
pub fn extract(text: &str) -> ExtractedCitations {
    let lines: Vec<&str> = text.lines().collect();

    let mut end = lines.len();
    let keyword_start = trailing_run(&lines, end, is_keyword_summary);
    if let Some(start) = keyword_start {
        end = start;
    }
    end = skip_separators(&lines, end);

    let Some(citation_start) = trailing_run(&lines, end, is_citation) else {
        debug!("No citation block found");
        return ExtractedCitations {
            body: text.to_string(),
            entries: Vec::new(),
        };
    };

    let mut entries: Vec<CitationEntry> = Vec::new();
    for line in &lines[citation_start..end] {
        if let Some(ParsedLine::Citation { index, source }) = parse_line(line) {
            // First occurrence of an index wins.
            if entries.iter().all(|e| e.index != index) {
                entries.push(CitationEntry::new(index, source));
            }
        }
    }

    if let Some(start) = keyword_start {
        let mut keywords: HashMap<u32, (String, String)> = HashMap::new();
        for line in &lines[start..] {
            if let Some(ParsedLine::KeywordSummary {
                index,
                keyword,
                summary,
            }) = parse_line(line)
            {
                keywords.entry(index).or_insert((keyword, summary));
            }
        }
        for entry in &mut entries {
            if let Some((keyword, summary)) = keywords.remove(&entry.index) {
                entry.keyword = Some(keyword).filter(|k| !k.is_empty());
                entry.summary = Some(summary).filter(|s| !s.is_empty());
            }
        }
    }

    let body_end = skip_separators(&lines, citation_start);
    let body_bytes: usize = text
        .split_inclusive('\n')
        .take(body_end)
        .map(str::len)
        .sum();
    let body = text[..body_bytes].trim_end().to_string();

    debug!(entries = entries.len(), "Extracted citation block");
    ExtractedCitations { body, entries }
}
