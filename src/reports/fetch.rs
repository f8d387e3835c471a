//! Source fetchers for the two report partitions.

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{Report, ReportFilter};
use crate::store::{DocumentStore, FieldFilter, Partition, RawDocument, StoreError, StoreQuery};

use super::normalize::normalize_report;

/// Which of the two places reports live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Per-patient partition, the current layout.
    Current,
    /// Flat shared partition, kept for rows that predate the migration.
    Legacy,
}

/// A partition-specific report query.
///
/// Implementations return rows already normalized to the canonical shape;
/// nothing above this trait ever sees a raw record.
#[async_trait]
pub trait ReportSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn fetch(
        &self,
        patient_id: &str,
        filter: &ReportFilter,
    ) -> Result<Vec<Report>, StoreError>;
}

/// Reads `patients/{patientId}/reports`.
pub struct PatientPartitionSource {
    store: Arc<dyn DocumentStore>,
}

impl PatientPartitionSource {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ReportSource for PatientPartitionSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Current
    }

    async fn fetch(
        &self,
        patient_id: &str,
        filter: &ReportFilter,
    ) -> Result<Vec<Report>, StoreError> {
        let query = date_bounded(
            StoreQuery::partition(Partition::PatientReports {
                patient_id: patient_id.to_string(),
            }),
            filter,
        );
        let rows = self.store.run_query(&query).await?;
        Ok(normalize_all(&rows, patient_id))
    }
}

/// Reads the flat `reports` collection through a `patientId` predicate.
pub struct LegacyPartitionSource {
    store: Arc<dyn DocumentStore>,
}

impl LegacyPartitionSource {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ReportSource for LegacyPartitionSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Legacy
    }

    async fn fetch(
        &self,
        patient_id: &str,
        filter: &ReportFilter,
    ) -> Result<Vec<Report>, StoreError> {
        let query = date_bounded(
            StoreQuery::partition(Partition::Reports)
                .filter(FieldFilter::eq("patientId", patient_id)),
            filter,
        );
        let rows = self.store.run_query(&query).await?;
        Ok(normalize_all(&rows, patient_id))
    }
}

/// Ordering lives here, not in callers: both sources ask the store for
/// newest-first rows, and callers never append their own ordering.
fn date_bounded(mut query: StoreQuery, filter: &ReportFilter) -> StoreQuery {
    if let Some(ref from) = filter.date_from {
        query = query.filter(FieldFilter::gte("date", from.as_str()));
    }
    if let Some(ref to) = filter.date_to {
        query = query.filter(FieldFilter::lte("date", to.as_str()));
    }
    query.order_desc("date")
}

fn normalize_all(rows: &[RawDocument], patient_id: &str) -> Vec<Report> {
    rows.iter()
        .map(|doc| normalize_report(doc, patient_id))
        .collect()
}
