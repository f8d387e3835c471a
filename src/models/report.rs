use serde::{Deserialize, Serialize};

/// A home-visit report in its canonical, alias-resolved shape.
///
/// Every field is present after normalization: text fields default to the
/// empty string and timestamps to `0` rather than being optional. Values
/// are immutable projections rebuilt on every query, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Store document id. Unique within one partition only.
    pub id: String,
    pub patient_id: String,
    /// Visit date as a `YYYY-MM-DD` token, or empty when the stored value
    /// could not be read. Fixed-width and zero-padded, so lexicographic
    /// order equals chronological order.
    pub date: String,
    /// Display name of the attending person.
    pub staff: String,
    pub findings: String,
    pub instruction: String,
    pub vital: String,
    /// Epoch milliseconds; `0` when absent or unparseable.
    pub created_at: i64,
    pub updated_at: i64,
}

/// Caller-supplied fields for creating or editing a report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDraft {
    pub patient_id: String,
    pub date: String,
    pub staff: String,
    pub findings: String,
    pub instruction: String,
    pub vital: String,
}
