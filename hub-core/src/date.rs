//! Lenient date coercion.
//!
//! Date-typed fields travel as ISO-like strings. A string becomes a date only
//! if it is non-empty, does not start with `"000"` (zeroed placeholder dates
//! such as `0000-00-00`), and parses in one of the accepted layouts. Anything
//! else degrades to `null`; coercion never fails.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Naive layouts tried after RFC 3339 and RFC 2822. Interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-like date string.
///
/// Returns `None` for empty strings, zero-prefixed placeholders and
/// anything unparseable.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("000") {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Coerce a JSON value into a normalized RFC 3339 string or `null`.
///
/// Only strings can become dates; numbers, booleans, objects and arrays
/// all coerce to `null`.
pub fn coerce_date(value: &Value) -> Value {
    match value {
        Value::String(raw) => parse_date(raw)
            .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}
