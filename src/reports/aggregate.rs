//! Merging the two report sources into one listing.

use std::collections::HashSet;
use std::sync::Arc;

use crate::models::{Report, ReportFilter};
use crate::store::{DocumentStore, StoreError};

use super::fetch::{LegacyPartitionSource, PatientPartitionSource, ReportSource, SourceKind};

/// Reconciles the per-patient partition with the legacy flat partition.
///
/// Reads never fail from the caller's point of view: a source that errors
/// contributes nothing to that call and leaves a diagnostic in the log.
pub struct ReportAggregator {
    current: Arc<dyn ReportSource>,
    legacy: Arc<dyn ReportSource>,
}

impl ReportAggregator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            current: Arc::new(PatientPartitionSource::new(Arc::clone(&store))),
            legacy: Arc::new(LegacyPartitionSource::new(store)),
        }
    }

    /// Swaps in caller-provided sources.
    pub fn with_sources(current: Arc<dyn ReportSource>, legacy: Arc<dyn ReportSource>) -> Self {
        Self { current, legacy }
    }

    /// Lists every report for one patient, newest first.
    ///
    /// A blank patient id short-circuits to an empty listing without
    /// touching the store; an unscoped query would otherwise scan the
    /// whole legacy partition.
    pub async fn reports_for_patient(
        &self,
        patient_id: &str,
        filter: &ReportFilter,
    ) -> Vec<Report> {
        let patient_id = patient_id.trim();
        if patient_id.is_empty() {
            return Vec::new();
        }

        // Both fetches start before either is awaited. Join, not race:
        // both results are required.
        let (current, legacy) = tokio::join!(
            self.current.fetch(patient_id, filter),
            self.legacy.fetch(patient_id, filter),
        );

        let current = degrade_on_failure(current, self.current.kind());
        let legacy = degrade_on_failure(legacy, self.legacy.kind());

        // Same id in both partitions means the same report, migrated; the
        // current-partition copy wins.
        let seen: HashSet<String> = current.iter().map(|r| r.id.clone()).collect();
        let mut merged = current;
        merged.extend(legacy.into_iter().filter(|r| !seen.contains(&r.id)));

        // Each input arrives date-ordered, but their concatenation is not.
        merged.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
        });
        merged
    }
}

fn degrade_on_failure(result: Result<Vec<Report>, StoreError>, kind: SourceKind) -> Vec<Report> {
    match result {
        Ok(rows) => rows,
        Err(err) => {
            match kind {
                SourceKind::Current => tracing::error!(
                    error = %err,
                    "current-partition report fetch failed; listing degrades to legacy rows"
                ),
                SourceKind::Legacy => tracing::warn!(
                    error = %err,
                    "legacy-partition report fetch failed; skipping legacy rows"
                ),
            }
            Vec::new()
        }
    }
}
