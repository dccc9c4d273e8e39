//! Citation data model.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// What a citation points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationKind {
    Slide,
    Transcription,
    Faq,
}

impl CitationKind {
    /// One-letter code used in inline tokens.
    pub fn code(&self) -> char {
        match self {
            Self::Slide => 'S',
            Self::Transcription => 'T',
            Self::Faq => 'F',
        }
    }
}

/// An offset into a lecture recording, held in whole milliseconds.
///
/// Parsing and conversion round to the nearest millisecond, so `12`,
/// `12.0` and `12.0004` denote the same offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TimeOffset(i64);

impl TimeOffset {
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * 1000.0).round() as i64)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

/// Parses unsigned decimal seconds (`48`, `12.5`). No sign, no exponent.
impl FromStr for TimeOffset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
        let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !digits_only(whole) || !digits_only(fraction) || s.ends_with('.') {
            return Err(format!("invalid time offset: '{}'", s));
        }
        s.parse::<f64>()
            .map(Self::from_secs_f64)
            .map_err(|e| format!("invalid time offset '{}': {}", s, e))
    }
}

/// Seconds with at most three fractional digits and no trailing zeros.
impl fmt::Display for TimeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let (secs, millis) = (abs / 1000, abs % 1000);
        if millis == 0 {
            write!(f, "{}{}", sign, secs)
        } else {
            let fraction = format!("{:03}", millis);
            write!(f, "{}{}.{}", sign, secs, fraction.trim_end_matches('0'))
        }
    }
}

impl Serialize for TimeOffset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_secs_f64())
    }
}

impl<'de> Deserialize<'de> for TimeOffset {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Self::from_secs_f64)
    }
}

/// Identifiers of the cited source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CitationSource {
    Slide {
        lecture_unit_id: i64,
        page: i64,
    },
    Transcription {
        lecture_unit_id: i64,
        page: Option<i64>,
        start: TimeOffset,
        end: TimeOffset,
    },
    Faq {
        faq_id: i64,
    },
}

impl CitationSource {
    pub fn kind(&self) -> CitationKind {
        match self {
            Self::Slide { .. } => CitationKind::Slide,
            Self::Transcription { .. } => CitationKind::Transcription,
            Self::Faq { .. } => CitationKind::Faq,
        }
    }
}

/// Renders the citation-line form, without the `[n]` index.
impl fmt::Display for CitationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slide {
                lecture_unit_id,
                page,
            } => write!(f, "Lecture Unit ID: {}, Page: {}", lecture_unit_id, page),
            Self::Transcription {
                lecture_unit_id,
                page,
                start,
                end,
            } => {
                write!(f, "Lecture Unit ID: {}", lecture_unit_id)?;
                if let Some(page) = page {
                    write!(f, ", Page: {}", page)?;
                }
                write!(f, ", Start: {}, End: {}", start, end)
            }
            Self::Faq { faq_id } => write!(f, "FAQ ID: {}", faq_id),
        }
    }
}

/// One cited source of an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationEntry {
    /// 1-based index as written in the answer
    pub index: u32,

    pub source: CitationSource,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Resolved display text; empty when nothing matched
    #[serde(default)]
    pub content: String,
}

impl CitationEntry {
    pub fn new(index: u32, source: CitationSource) -> Self {
        Self {
            index,
            source,
            keyword: None,
            summary: None,
            content: String::new(),
        }
    }

    pub fn kind(&self) -> CitationKind {
        self.source.kind()
    }

    pub fn is_resolved(&self) -> bool {
        !self.content.is_empty()
    }
}

/// A FAQ entry shown to the model alongside lecture content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub id: i64,
    pub title: String,
    pub answer: String,
}

/// A recognized line of a citation or keyword block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Citation {
        index: u32,
        source: CitationSource,
    },
    KeywordSummary {
        index: u32,
        keyword: String,
        summary: String,
    },
}

impl ParsedLine {
    pub fn index(&self) -> u32 {
        match self {
            Self::Citation { index, .. } | Self::KeywordSummary { index, .. } => *index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_offset_normalization() {
        let a: TimeOffset = "12".parse().unwrap();
        let b: TimeOffset = "12.000".parse().unwrap();
        let c: TimeOffset = "12.0004".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, TimeOffset::from_secs_f64(12.0));
        assert_eq!("48.25".parse::<TimeOffset>().unwrap().as_millis(), 48_250);
    }

    #[test]
    fn test_time_offset_rejects_malformed() {
        for bad in ["", ".5", "5.", "-1", "1e3", "1.2.3", "abc"] {
            assert!(bad.parse::<TimeOffset>().is_err(), "accepted '{}'", bad);
        }
    }

    #[test]
    fn test_time_offset_display() {
        assert_eq!(TimeOffset::from_millis(12_000).to_string(), "12");
        assert_eq!(TimeOffset::from_millis(48_500).to_string(), "48.5");
        assert_eq!(TimeOffset::from_millis(1_005).to_string(), "1.005");
    }

    #[test]
    fn test_source_display_matches_line_grammar() {
        let source = CitationSource::Transcription {
            lecture_unit_id: 5,
            page: None,
            start: TimeOffset::from_millis(12_000),
            end: TimeOffset::from_millis(48_000),
        };
        assert_eq!(source.to_string(), "Lecture Unit ID: 5, Start: 12, End: 48");
        assert_eq!(
            CitationSource::Slide {
                lecture_unit_id: 42,
                page: 7
            }
            .to_string(),
            "Lecture Unit ID: 42, Page: 7"
        );
        assert_eq!(CitationSource::Faq { faq_id: 91 }.to_string(), "FAQ ID: 91");
    }

    #[test]
    fn test_entry_serializes_seconds() {
        let entry = CitationEntry::new(
            1,
            CitationSource::Transcription {
                lecture_unit_id: 5,
                page: Some(2),
                start: TimeOffset::from_millis(12_500),
                end: TimeOffset::from_millis(48_000),
            },
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["source"]["kind"], "transcription");
        assert_eq!(json["source"]["start"], 12.5);
        assert!(json.get("keyword").is_none());
        assert_eq!(entry.kind().code(), 'T');
    }
}
