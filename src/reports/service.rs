//! Report write path and point lookup.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::models::{Report, ReportDraft};
use crate::store::{DocumentStore, FieldValue, Partition, StoreError};

use super::normalize::normalize_report;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Creates and edits reports.
///
/// Reads are lenient (see the aggregator); writes are strict and reject
/// incomplete drafts before touching the store.
pub struct ReportService {
    store: Arc<dyn DocumentStore>,
}

impl ReportService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Stores a new report under its patient, creating or refreshing the
    /// patient parent document first so the nested partition always hangs
    /// off an existing patient.
    pub async fn create_report(&self, draft: &ReportDraft) -> Result<String, ReportError> {
        let patient_id = draft.patient_id.trim();
        if patient_id.is_empty() {
            return Err(ReportError::MissingField("patientId"));
        }
        if draft.date.trim().is_empty() {
            return Err(ReportError::MissingField("date"));
        }
        if draft.staff.trim().is_empty() {
            return Err(ReportError::MissingField("staff"));
        }

        let now = Utc::now().timestamp_millis();

        let parent = HashMap::from([
            ("id".to_string(), FieldValue::from(patient_id)),
            ("updatedAt".to_string(), FieldValue::Integer(now)),
        ]);
        self.store
            .upsert(&Partition::Patients, patient_id, parent)
            .await?;

        let mut fields = draft_fields(draft);
        fields.insert("patientId".to_string(), FieldValue::from(patient_id));
        fields.insert("createdAt".to_string(), FieldValue::Integer(now));
        fields.insert("updatedAt".to_string(), FieldValue::Integer(now));

        let partition = Partition::PatientReports {
            patient_id: patient_id.to_string(),
        };
        let id = self.store.insert(&partition, fields).await?;
        tracing::info!(report_id = %id, patient_id = %patient_id, "report created");
        Ok(id)
    }

    /// Applies edited fields to an existing report in the flat partition
    /// (the editing surface operates on that layout) and restamps
    /// `updatedAt`.
    pub async fn update_report(
        &self,
        report_id: &str,
        draft: &ReportDraft,
    ) -> Result<(), ReportError> {
        let mut fields = draft_fields(draft);
        fields.insert(
            "patientId".to_string(),
            FieldValue::from(draft.patient_id.as_str()),
        );
        fields.insert(
            "updatedAt".to_string(),
            FieldValue::Integer(Utc::now().timestamp_millis()),
        );
        self.store
            .update(&Partition::Reports, report_id, fields)
            .await?;
        tracing::info!(report_id = %report_id, "report updated");
        Ok(())
    }

    /// Loads one report from the flat partition, normalized.
    pub async fn get_report(&self, report_id: &str) -> Result<Option<Report>, ReportError> {
        let doc = self.store.get(&Partition::Reports, report_id).await?;
        Ok(doc.map(|doc| normalize_report(&doc, "")))
    }
}

fn draft_fields(draft: &ReportDraft) -> HashMap<String, FieldValue> {
    HashMap::from([
        ("date".to_string(), FieldValue::from(draft.date.as_str())),
        ("staff".to_string(), FieldValue::from(draft.staff.as_str())),
        (
            "findings".to_string(),
            FieldValue::from(draft.findings.as_str()),
        ),
        (
            "instruction".to_string(),
            FieldValue::from(draft.instruction.as_str()),
        ),
        ("vital".to_string(), FieldValue::from(draft.vital.as_str())),
    ])
}
