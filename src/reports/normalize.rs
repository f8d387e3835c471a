//! Convergence of historical record shapes to the canonical report.

use chrono::DateTime;

use crate::models::Report;
use crate::store::{FieldValue, RawDocument};

use super::coerce;

/// Field aliases left behind by earlier revisions of the intake forms.
/// First present wins.
const STAFF_ALIASES: &[&str] = &["staff", "assessor"];
const FINDINGS_ALIASES: &[&str] = &["findings", "notes"];
const INSTRUCTION_ALIASES: &[&str] = &["instruction", "guidance"];
const VITAL_ALIASES: &[&str] = &["vital", "vitals"];

/// Maps a raw store record to the canonical shape.
///
/// Total: any missing or malformed field degrades to an empty string or
/// `0`, never to an error. Legacy rows may lack `patientId`; those
/// inherit the id the query was scoped to.
pub fn normalize_report(doc: &RawDocument, fallback_patient_id: &str) -> Report {
    let patient_id = doc
        .get("patientId")
        .and_then(FieldValue::as_text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback_patient_id.to_string());

    Report {
        id: doc.id.clone(),
        patient_id,
        date: date_token(doc.get("date")),
        staff: text_field(doc, STAFF_ALIASES),
        findings: text_field(doc, FINDINGS_ALIASES),
        instruction: text_field(doc, INSTRUCTION_ALIASES),
        vital: text_field(doc, VITAL_ALIASES),
        created_at: coerce::to_millis(doc.get("createdAt")),
        updated_at: coerce::to_millis(doc.get("updatedAt")),
    }
}

fn text_field(doc: &RawDocument, aliases: &[&str]) -> String {
    aliases
        .iter()
        .find_map(|name| doc.get(name).and_then(FieldValue::as_text))
        .unwrap_or_default()
}

/// The visit date was stored three ways over the years: a `YYYY-MM-DD`
/// token, a native store timestamp, and an epoch-millisecond number. All
/// three converge to the token form; anything else becomes empty.
fn date_token(value: Option<&FieldValue>) -> String {
    match value {
        Some(FieldValue::Text(s)) => s.trim().to_string(),
        Some(ts @ FieldValue::Timestamp { .. }) => ts
            .timestamp_millis()
            .and_then(format_millis)
            .unwrap_or_default(),
        Some(FieldValue::Integer(ms)) => format_millis(*ms).unwrap_or_default(),
        Some(FieldValue::Float(ms)) if ms.is_finite() => {
            format_millis(*ms as i64).unwrap_or_default()
        }
        _ => String::new(),
    }
}

fn format_millis(ms: i64) -> Option<String> {
    if ms <= 0 {
        return None;
    }
    DateTime::from_timestamp_millis(ms).map(|dt| dt.format("%Y-%m-%d").to_string())
}
