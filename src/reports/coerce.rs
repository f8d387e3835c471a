//! Best-effort conversion of loose store values to epoch milliseconds.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::store::FieldValue;

/// Converts whatever a timestamp-ish field holds to epoch milliseconds.
///
/// Absent, malformed and unrecognized shapes all collapse to `0`; a
/// single bad record must never abort a listing.
pub fn to_millis(value: Option<&FieldValue>) -> i64 {
    let Some(value) = value else { return 0 };
    match value {
        FieldValue::Integer(n) => *n,
        FieldValue::Float(f) if f.is_finite() => *f as i64,
        FieldValue::Text(s) => parse_text(s),
        ts @ FieldValue::Timestamp { .. } => ts.timestamp_millis().unwrap_or(0),
        // Emulated timestamps arrive as plain maps carrying seconds; the
        // native variant above, with its own conversion, takes precedence.
        FieldValue::Map(fields) => match fields.get("seconds") {
            Some(FieldValue::Integer(seconds)) => seconds * 1000,
            Some(FieldValue::Float(seconds)) if seconds.is_finite() => {
                (seconds * 1000.0) as i64
            }
            _ => 0,
        },
        _ => 0,
    }
}

/// Numeric strings are taken as milliseconds; everything else goes
/// through the date parsers, most specific format first.
fn parse_text(s: &str) -> i64 {
    let s = s.trim();
    if s.is_empty() {
        return 0;
    }
    if let Ok(n) = s.parse::<i64>() {
        return n;
    }
    if let Ok(f) = s.parse::<f64>() {
        return if f.is_finite() { f as i64 } else { 0 };
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.timestamp_millis();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return dt.and_utc().timestamp_millis();
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or(0);
    }
    0
}
