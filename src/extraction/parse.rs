//! Parsing of raw extraction output

use super::EventCandidate;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use thiserror::Error;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z]*\s*").expect("Invalid regex"));

/// Layouts with a time component, tried in order
const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Time used when the model returns a bare date
const DATE_ONLY_HOUR: u32 = 12;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty response")]
    Empty,
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response is missing `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Deserialize)]
struct RawCandidate {
    title: Option<String>,
    datetime: Option<String>,
    location: Option<String>,
    notes: Option<String>,
    confidence: Option<f64>,
    needs_clarification: Option<bool>,
    clarification_question: Option<String>,
}

/// Parse model output into a candidate, resolving times in `offset`
pub fn parse_candidate(text: &str, offset: FixedOffset) -> Result<EventCandidate, ParseError> {
    let cleaned = CODE_FENCE.replace_all(text, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(ParseError::Empty);
    }

    let raw: RawCandidate = serde_json::from_str(outermost_object(cleaned))?;

    let confidence = raw
        .confidence
        .ok_or(ParseError::MissingField("confidence"))?;
    let needs_clarification = raw
        .needs_clarification
        .ok_or(ParseError::MissingField("needs_clarification"))?;

    Ok(EventCandidate {
        title: present(raw.title),
        datetime: present(raw.datetime).and_then(|s| parse_event_datetime(&s, offset)),
        location: present(raw.location),
        notes: present(raw.notes),
        confidence: if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        },
        needs_clarification,
        clarification_question: present(raw.clarification_question),
    })
}

/// Normalize a datetime string from the model into a zone-aware timestamp.
///
/// Naive values are taken as local time in `offset`; a date with no time
/// resolves to midday, matching the instruction given to the model.
pub fn parse_event_datetime(s: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&offset));
    }

    for layout in DATETIME_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return offset.from_local_datetime(&naive).single();
        }
    }

    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    offset
        .from_local_datetime(&date.and_hms_opt(DATE_ONLY_HOUR, 0, 0)?)
        .single()
}

/// Slice from the first `{` to the last `}` when the model adds chatter
fn outermost_object(s: &str) -> &str {
    match (s.find('{'), s.rfind('}')) {
        (Some(start), Some(end)) if start < end => s.get(start..=end).unwrap_or(s),
        _ => s,
    }
}

/// Treat empty strings and a literal "null" as absent
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}
