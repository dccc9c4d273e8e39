//! Conversion of untyped store records into the retrieval data model.
//!
//! A record that lacks a requested field or carries the wrong JSON type is a
//! schema violation and aborts the retrieval call; nothing is coerced.

use crate::store::{collections, StoreRecord};
use crate::types::{PageChunk, SourceUnit, SummarySegment, TranscriptionSegment};
use serde_json::Value;
use tutor_core::{AppError, AppResult};

/// Field names shared by several collections.
pub mod fields {
    pub const COURSE_ID: &str = "course_id";
    pub const COURSE_NAME: &str = "course_name";
    pub const COURSE_LANGUAGE: &str = "course_language";
    pub const LECTURE_ID: &str = "lecture_id";
    pub const LECTURE_NAME: &str = "lecture_name";
    pub const LECTURE_DESCRIPTION: &str = "lecture_description";
    pub const LECTURE_UNIT_ID: &str = "lecture_unit_id";
    pub const PAGE_NUMBER: &str = "page_number";
    pub const BASE_URL: &str = "base_url";
    pub const SEGMENT_SUMMARY: &str = "segment_summary";
    pub const SEGMENT_START_TIME: &str = "segment_start_time";
    pub const SEGMENT_END_TIME: &str = "segment_end_time";
    pub const SEGMENT_TEXT: &str = "segment_text";
    pub const PAGE_TEXT_CONTENT: &str = "page_text_content";
}

use fields::*;

pub const LECTURE_FIELDS: &[&str] = &[
    COURSE_ID,
    COURSE_NAME,
    COURSE_LANGUAGE,
    LECTURE_ID,
    LECTURE_NAME,
    LECTURE_DESCRIPTION,
    BASE_URL,
];

pub const SEGMENT_FIELDS: &[&str] = &[
    COURSE_ID,
    LECTURE_ID,
    LECTURE_UNIT_ID,
    PAGE_NUMBER,
    SEGMENT_SUMMARY,
    BASE_URL,
];

pub const TRANSCRIPTION_FIELDS: &[&str] = &[
    COURSE_ID,
    LECTURE_ID,
    LECTURE_UNIT_ID,
    PAGE_NUMBER,
    SEGMENT_START_TIME,
    SEGMENT_END_TIME,
    SEGMENT_TEXT,
];

pub const PAGE_CHUNK_FIELDS: &[&str] = &[
    COURSE_ID,
    LECTURE_ID,
    LECTURE_UNIT_ID,
    PAGE_NUMBER,
    PAGE_TEXT_CONTENT,
];

/// Typed field access over one record.
struct RecordReader<'a> {
    collection: &'static str,
    record: &'a StoreRecord,
}

impl<'a> RecordReader<'a> {
    fn new(collection: &'static str, record: &'a StoreRecord) -> Self {
        Self { collection, record }
    }

    fn violation(&self, field: &str, reason: impl Into<String>) -> AppError {
        AppError::schema(
            self.collection,
            field,
            format!("{} (record {})", reason.into(), self.record.uuid),
        )
    }

    fn required(&self, field: &str) -> AppResult<&'a Value> {
        self.record
            .properties
            .get(field)
            .ok_or_else(|| self.violation(field, "missing"))
    }

    /// `None` for a missing or null field.
    fn optional(&self, field: &str) -> Option<&'a Value> {
        self.record.properties.get(field).filter(|v| !v.is_null())
    }

    fn int_value(&self, field: &str, value: &Value) -> AppResult<i64> {
        value
            .as_i64()
            .ok_or_else(|| self.violation(field, format!("expected integer, got {}", value)))
    }

    fn int(&self, field: &str) -> AppResult<i64> {
        self.int_value(field, self.required(field)?)
    }

    fn opt_int(&self, field: &str) -> AppResult<Option<i64>> {
        self.optional(field)
            .map(|v| self.int_value(field, v))
            .transpose()
    }

    fn float(&self, field: &str) -> AppResult<f64> {
        let value = self.required(field)?;
        value
            .as_f64()
            .ok_or_else(|| self.violation(field, format!("expected number, got {}", value)))
    }

    fn string_value(&self, field: &str, value: &Value) -> AppResult<String> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.violation(field, format!("expected string, got {}", value)))
    }

    fn string(&self, field: &str) -> AppResult<String> {
        self.string_value(field, self.required(field)?)
    }

    fn opt_string(&self, field: &str) -> AppResult<Option<String>> {
        self.optional(field)
            .map(|v| self.string_value(field, v))
            .transpose()
    }
}

/// Parse a lecture record.
pub fn source_unit(record: &StoreRecord) -> AppResult<SourceUnit> {
    let r = RecordReader::new(collections::LECTURES, record);
    Ok(SourceUnit {
        id: r.int(LECTURE_ID)?,
        name: r.string(LECTURE_NAME)?,
        language: r.string(COURSE_LANGUAGE)?,
        description: r.opt_string(LECTURE_DESCRIPTION)?.unwrap_or_default(),
        course_id: r.int(COURSE_ID)?,
        course_name: r.string(COURSE_NAME)?,
        base_url: r.opt_string(BASE_URL)?,
    })
}

/// Parse a summary segment record.
pub fn summary_segment(record: &StoreRecord) -> AppResult<SummarySegment> {
    let r = RecordReader::new(collections::SEGMENTS, record);
    Ok(SummarySegment {
        uuid: record.uuid.clone(),
        course_id: r.int(COURSE_ID)?,
        lecture_id: r.int(LECTURE_ID)?,
        lecture_unit_id: r.int(LECTURE_UNIT_ID)?,
        page_number: r.int(PAGE_NUMBER)?,
        segment_summary: r.string(SEGMENT_SUMMARY)?,
        base_url: r.opt_string(BASE_URL)?,
    })
}

/// Parse a transcription segment record.
pub fn transcription_segment(record: &StoreRecord) -> AppResult<TranscriptionSegment> {
    let r = RecordReader::new(collections::TRANSCRIPTIONS, record);
    Ok(TranscriptionSegment {
        uuid: record.uuid.clone(),
        course_id: r.int(COURSE_ID)?,
        lecture_id: r.int(LECTURE_ID)?,
        lecture_unit_id: r.int(LECTURE_UNIT_ID)?,
        page_number: r.opt_int(PAGE_NUMBER)?,
        segment_start_time: r.float(SEGMENT_START_TIME)?,
        segment_end_time: r.float(SEGMENT_END_TIME)?,
        segment_text: r.string(SEGMENT_TEXT)?,
    })
}

/// Parse a slide page chunk record.
pub fn page_chunk(record: &StoreRecord) -> AppResult<PageChunk> {
    let r = RecordReader::new(collections::PAGE_CHUNKS, record);
    Ok(PageChunk {
        uuid: record.uuid.clone(),
        course_id: r.int(COURSE_ID)?,
        lecture_id: r.int(LECTURE_ID)?,
        lecture_unit_id: r.int(LECTURE_UNIT_ID)?,
        page_number: r.int(PAGE_NUMBER)?,
        page_text_content: r.string(PAGE_TEXT_CONTENT)?,
    })
}

/// Parse every record, failing on the first schema violation.
pub fn parse_all<T>(
    records: &[StoreRecord],
    parse: fn(&StoreRecord) -> AppResult<T>,
) -> AppResult<Vec<T>> {
    records.iter().map(parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(uuid: &str, value: Value) -> StoreRecord {
        StoreRecord {
            uuid: uuid.to_string(),
            properties: value.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_page_chunk_parses() {
        let chunk = page_chunk(&record(
            "p1",
            json!({
                "course_id": 1, "lecture_id": 2, "lecture_unit_id": 42,
                "page_number": 7, "page_text_content": "Deadlocks"
            }),
        ))
        .unwrap();

        assert_eq!(chunk.uuid, "p1");
        assert_eq!(chunk.lecture_unit_id, 42);
        assert_eq!(chunk.page_number, 7);
    }

    #[test]
    fn test_missing_field_is_schema_violation() {
        let err = page_chunk(&record(
            "p1",
            json!({"course_id": 1, "lecture_id": 2, "lecture_unit_id": 42, "page_number": 7}),
        ))
        .unwrap_err();

        match err {
            AppError::Schema { collection, field, .. } => {
                assert_eq!(collection, collections::PAGE_CHUNKS);
                assert_eq!(field, PAGE_TEXT_CONTENT);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wrong_type_is_not_coerced() {
        let err = summary_segment(&record(
            "s1",
            json!({
                "course_id": 1, "lecture_id": 2, "lecture_unit_id": 3,
                "page_number": "4", "segment_summary": "x"
            }),
        ))
        .unwrap_err();

        assert!(matches!(err, AppError::Schema { ref field, .. } if field == PAGE_NUMBER));
    }

    #[test]
    fn test_transcription_page_is_optional() {
        let segment = transcription_segment(&record(
            "t1",
            json!({
                "course_id": 1, "lecture_id": 2, "lecture_unit_id": 5,
                "page_number": null, "segment_start_time": 12, "segment_end_time": 48.5,
                "segment_text": "hello"
            }),
        ))
        .unwrap();

        assert_eq!(segment.page_number, None);
        assert_eq!(segment.segment_start_time, 12.0);
        assert_eq!(segment.segment_end_time, 48.5);
    }

    #[test]
    fn test_source_unit_description_defaults_empty() {
        let unit = source_unit(&record(
            "l1",
            json!({
                "course_id": 1, "course_name": "Operating Systems", "course_language": "English",
                "lecture_id": 2, "lecture_name": "Concurrency"
            }),
        ))
        .unwrap();

        assert_eq!(unit.id, 2);
        assert_eq!(unit.description, "");
        assert_eq!(unit.base_url, None);
    }

    #[test]
    fn test_parse_all_stops_on_first_violation() {
        let records = vec![
            record("ok", json!({"course_id": 1, "lecture_id": 2, "lecture_unit_id": 3, "page_number": 1, "page_text_content": "a"})),
            record("bad", json!({"course_id": 1})),
        ];
        assert!(parse_all(&records, page_chunk).is_err());
        assert_eq!(parse_all(&records[..1], page_chunk).unwrap().len(), 1);
    }
}
