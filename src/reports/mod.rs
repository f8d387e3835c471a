//! Report aggregation and normalization.
//!
//! Visit reports live in two partitions written under several historical
//! field-naming schemes. This module converges them: each source fetcher
//! normalizes its raw rows to the canonical [`Report`](crate::models::Report)
//! shape, and the aggregator merges both sources into one deduplicated,
//! date-descending sequence. A malformed record never fails a listing;
//! every field access degrades to a sentinel instead.

pub mod aggregate;
pub mod coerce;
pub mod fetch;
pub mod normalize;
pub mod service;

pub use aggregate::ReportAggregator;
pub use service::{ReportError, ReportService};

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::config::StoreConfig;
    use crate::models::{Report, ReportDraft, ReportFilter};
    use crate::store::{DocumentStore, FieldValue, MemoryStore, Partition, StoreError};

    use super::fetch::{ReportSource, SourceKind};
    use super::*;

    fn memory_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(StoreConfig::new("carelog-test")))
    }

    /// Makes the degrade-path diagnostics visible when a test is run with
    /// `RUST_LOG` set.
    fn init_logging() {
        use tracing_subscriber::EnvFilter;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn visit(patient: &str, date: &str, staff: &str, updated_at: i64) -> HashMap<String, FieldValue> {
        HashMap::from([
            ("patientId".to_string(), FieldValue::from(patient)),
            ("date".to_string(), FieldValue::from(date)),
            ("staff".to_string(), FieldValue::from(staff)),
            ("updatedAt".to_string(), FieldValue::Integer(updated_at)),
        ])
    }

    async fn seed_current(
        store: &MemoryStore,
        patient: &str,
        id: &str,
        fields: HashMap<String, FieldValue>,
    ) {
        let partition = Partition::PatientReports {
            patient_id: patient.to_string(),
        };
        store.upsert(&partition, id, fields).await.unwrap();
    }

    async fn seed_legacy(store: &MemoryStore, id: &str, fields: HashMap<String, FieldValue>) {
        store.upsert(&Partition::Reports, id, fields).await.unwrap();
    }

    fn report(id: &str, date: &str, updated_at: i64) -> Report {
        Report {
            id: id.to_string(),
            patient_id: "0001".to_string(),
            date: date.to_string(),
            staff: "Sato".to_string(),
            findings: String::new(),
            instruction: String::new(),
            vital: String::new(),
            created_at: 0,
            updated_at,
        }
    }

    struct StubSource {
        kind: SourceKind,
        rows: Vec<Report>,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new(kind: SourceKind, rows: Vec<Report>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                rows,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ReportSource for StubSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn fetch(
            &self,
            _patient_id: &str,
            _filter: &ReportFilter,
        ) -> Result<Vec<Report>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.clone())
        }
    }

    struct FailingSource {
        kind: SourceKind,
    }

    #[async_trait]
    impl ReportSource for FailingSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn fetch(
            &self,
            _patient_id: &str,
            _filter: &ReportFilter,
        ) -> Result<Vec<Report>, StoreError> {
            Err(StoreError::Backend("connection reset".into()))
        }
    }

    // ── Aggregation ────────────────────────────────────────────────────

    #[tokio::test]
    async fn blank_patient_id_returns_empty_without_fetching() {
        let current = StubSource::new(SourceKind::Current, vec![report("a", "2024-05-01", 1)]);
        let legacy = StubSource::new(SourceKind::Legacy, vec![report("b", "2024-05-02", 1)]);
        let aggregator = ReportAggregator::with_sources(current.clone(), legacy.clone());

        assert!(aggregator
            .reports_for_patient("", &ReportFilter::default())
            .await
            .is_empty());
        assert!(aggregator
            .reports_for_patient("   ", &ReportFilter::default())
            .await
            .is_empty());
        assert_eq!(current.calls.load(Ordering::SeqCst), 0);
        assert_eq!(legacy.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn merges_both_partitions_newest_first() {
        let store = memory_store();
        seed_current(&store, "0001", "a", visit("0001", "2024-05-01", "Sato", 10)).await;
        seed_legacy(&store, "b", visit("0001", "2024-05-02", "Tanaka", 5)).await;
        seed_legacy(&store, "a", visit("0001", "2024-05-01", "Old Sato", 1)).await;

        let aggregator = ReportAggregator::new(store);
        let reports = aggregator
            .reports_for_patient("0001", &ReportFilter::default())
            .await;

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].id, "b");
        assert_eq!(reports[0].date, "2024-05-02");
        assert_eq!(reports[1].id, "a");
        // The per-patient copy of "a" wins over its legacy twin.
        assert_eq!(reports[1].staff, "Sato");
        assert_eq!(reports[1].updated_at, 10);
    }

    #[tokio::test]
    async fn reorders_interleaved_sources() {
        // Each stub is internally date-ordered, but their concatenation
        // is not; the aggregator must rebuild the order itself.
        let current = StubSource::new(
            SourceKind::Current,
            vec![report("c1", "2024-05-03", 2), report("c2", "2024-05-01", 7)],
        );
        let legacy = StubSource::new(
            SourceKind::Legacy,
            vec![report("l1", "2024-05-04", 1), report("l2", "2024-05-01", 9)],
        );
        let aggregator = ReportAggregator::with_sources(current, legacy);

        let reports = aggregator
            .reports_for_patient("0001", &ReportFilter::default())
            .await;

        let ids: Vec<&str> = reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["l1", "c1", "l2", "c2"]);
        for pair in reports.windows(2) {
            assert!(
                pair[0].date > pair[1].date
                    || (pair[0].date == pair[1].date
                        && pair[0].updated_at >= pair[1].updated_at),
                "listing out of order at {} / {}",
                pair[0].id,
                pair[1].id
            );
        }
    }

    #[tokio::test]
    async fn legacy_failure_degrades_to_current_rows() {
        init_logging();
        let current = StubSource::new(SourceKind::Current, vec![report("a", "2024-05-01", 1)]);
        let legacy = Arc::new(FailingSource {
            kind: SourceKind::Legacy,
        });
        let aggregator = ReportAggregator::with_sources(current, legacy);

        let reports = aggregator
            .reports_for_patient("0001", &ReportFilter::default())
            .await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, "a");
    }

    #[tokio::test]
    async fn current_failure_degrades_to_legacy_rows() {
        init_logging();
        let current = Arc::new(FailingSource {
            kind: SourceKind::Current,
        });
        let legacy = StubSource::new(SourceKind::Legacy, vec![report("b", "2024-05-02", 1)]);
        let aggregator = ReportAggregator::with_sources(current, legacy);

        let reports = aggregator
            .reports_for_patient("0001", &ReportFilter::default())
            .await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, "b");
    }

    #[tokio::test]
    async fn date_bounds_are_inclusive_across_partitions() {
        let store = memory_store();
        seed_current(&store, "0001", "in-low", visit("0001", "2024-05-01", "Sato", 1)).await;
        seed_current(&store, "0001", "out-low", visit("0001", "2024-04-30", "Sato", 1)).await;
        seed_legacy(&store, "in-high", visit("0001", "2024-05-31", "Sato", 1)).await;
        seed_legacy(&store, "out-high", visit("0001", "2024-06-01", "Sato", 1)).await;

        let aggregator = ReportAggregator::new(store);
        let reports = aggregator
            .reports_for_patient("0001", &ReportFilter::between("2024-05-01", "2024-05-31"))
            .await;

        let ids: Vec<&str> = reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["in-high", "in-low"]);
    }

    fn fields_from_json(value: serde_json::Value) -> HashMap<String, FieldValue> {
        match FieldValue::from_json(value) {
            FieldValue::Map(fields) => fields,
            other => panic!("expected a JSON object, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn open_ended_lower_bound_filters_older_rows() {
        let store = memory_store();
        seed_current(&store, "0001", "new", visit("0001", "2024-05-15", "Sato", 1)).await;
        seed_current(&store, "0001", "old", visit("0001", "2024-04-01", "Sato", 1)).await;

        let aggregator = ReportAggregator::new(store);
        let reports = aggregator
            .reports_for_patient("0001", &ReportFilter::since("2024-05-01"))
            .await;
        let ids: Vec<&str> = reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new"]);
    }

    #[tokio::test]
    async fn other_patients_rows_stay_invisible() {
        let store = memory_store();
        let mine = fields_from_json(serde_json::json!({
            "patientId": "0001", "date": "2024-05-01", "staff": "Sato", "updatedAt": 1
        }));
        let theirs = fields_from_json(serde_json::json!({
            "patientId": "0002", "date": "2024-05-02", "staff": "Sato", "updatedAt": 1
        }));
        seed_legacy(&store, "mine", mine).await;
        seed_legacy(&store, "theirs", theirs).await;

        let aggregator = ReportAggregator::new(store);
        let reports = aggregator
            .reports_for_patient("0001", &ReportFilter::default())
            .await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, "mine");
    }

    #[tokio::test]
    async fn repeated_calls_return_identical_sequences() {
        let store = memory_store();
        seed_current(&store, "0001", "a", visit("0001", "2024-05-01", "Sato", 10)).await;
        seed_legacy(&store, "b", visit("0001", "2024-05-01", "Tanaka", 10)).await;
        seed_legacy(&store, "c", visit("0001", "2024-05-02", "Mori", 3)).await;

        let aggregator = ReportAggregator::new(store);
        let first = aggregator
            .reports_for_patient("0001", &ReportFilter::default())
            .await;
        let second = aggregator
            .reports_for_patient("0001", &ReportFilter::default())
            .await;
        assert_eq!(first, second);
    }

    // ── Write path ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn created_report_appears_in_listing() {
        let store = memory_store();
        let service = ReportService::new(store.clone());

        let draft = ReportDraft {
            patient_id: "0001".into(),
            date: "2024-05-10".into(),
            staff: "Sato".into(),
            findings: "stable".into(),
            instruction: "continue meds".into(),
            vital: "BP 118/76".into(),
        };
        let id = service.create_report(&draft).await.unwrap();

        // The parent patient document was created alongside the report.
        let parent = store.get(&Partition::Patients, "0001").await.unwrap();
        assert!(parent.is_some());

        let aggregator = ReportAggregator::new(store);
        let reports = aggregator
            .reports_for_patient("0001", &ReportFilter::default())
            .await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, id);
        assert_eq!(reports[0].findings, "stable");
        assert!(reports[0].created_at > 0);
    }

    #[tokio::test]
    async fn create_rejects_incomplete_drafts() {
        let service = ReportService::new(memory_store());

        let blank_patient = ReportDraft {
            date: "2024-05-10".into(),
            staff: "Sato".into(),
            ..Default::default()
        };
        assert!(matches!(
            service.create_report(&blank_patient).await,
            Err(ReportError::MissingField("patientId"))
        ));

        let blank_date = ReportDraft {
            patient_id: "0001".into(),
            staff: "Sato".into(),
            ..Default::default()
        };
        assert!(matches!(
            service.create_report(&blank_date).await,
            Err(ReportError::MissingField("date"))
        ));

        let blank_staff = ReportDraft {
            patient_id: "0001".into(),
            date: "2024-05-10".into(),
            ..Default::default()
        };
        assert!(matches!(
            service.create_report(&blank_staff).await,
            Err(ReportError::MissingField("staff"))
        ));
    }

    #[tokio::test]
    async fn update_restamps_and_rewrites_fields() {
        let store = memory_store();
        seed_legacy(&store, "r1", visit("0001", "2024-05-01", "Sato", 0)).await;

        let service = ReportService::new(store);
        let draft = ReportDraft {
            patient_id: "0001".into(),
            date: "2024-05-02".into(),
            staff: "Tanaka".into(),
            findings: "improved".into(),
            instruction: String::new(),
            vital: String::new(),
        };
        service.update_report("r1", &draft).await.unwrap();

        let report = service.get_report("r1").await.unwrap().unwrap();
        assert_eq!(report.date, "2024-05-02");
        assert_eq!(report.staff, "Tanaka");
        assert_eq!(report.findings, "improved");
        assert!(report.updated_at > 0);
    }

    #[tokio::test]
    async fn update_missing_report_surfaces_not_found() {
        let service = ReportService::new(memory_store());
        let err = service
            .update_report("ghost", &ReportDraft::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReportError::Store(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn get_missing_report_is_none() {
        let service = ReportService::new(memory_store());
        assert!(service.get_report("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn legacy_aliases_normalize_in_listing() {
        let store = memory_store();
        let legacy_row = HashMap::from([
            ("patientId".to_string(), FieldValue::from("0001")),
            ("date".to_string(), FieldValue::from("2024-05-01")),
            ("assessor".to_string(), FieldValue::from("Yamada")),
            ("notes".to_string(), FieldValue::from("stable")),
            ("guidance".to_string(), FieldValue::from("rest")),
            ("vitals".to_string(), FieldValue::from("SpO2 98%")),
            (
                "updatedAt".to_string(),
                FieldValue::Timestamp {
                    seconds: 1714521600,
                    nanos: 0,
                },
            ),
        ]);
        seed_legacy(&store, "old", legacy_row).await;

        let aggregator = ReportAggregator::new(store);
        let reports = aggregator
            .reports_for_patient("0001", &ReportFilter::default())
            .await;

        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.staff, "Yamada");
        assert_eq!(report.findings, "stable");
        assert_eq!(report.instruction, "rest");
        assert_eq!(report.vital, "SpO2 98%");
        assert_eq!(report.updated_at, 1714521600000);
    }
}
