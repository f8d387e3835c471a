//! Document store abstraction.
//!
//! The store is an external collaborator: a partitioned document database
//! offering equality and inclusive range filters plus ordered retrieval.
//! Everything above it talks through [`DocumentStore`], so the
//! aggregation core never depends on a concrete backend. [`MemoryStore`]
//! implements the same contract in process for tests and embedded use.

pub mod memory;
pub mod value;

pub use memory::MemoryStore;
pub use value::FieldValue;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::StoreConfig;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("document not found: {path}/{id}")]
    NotFound { path: String, id: String },

    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Addressable storage locations.
///
/// `PatientReports` is the current layout, reports nested under their
/// patient. `Reports` is the legacy flat collection that predates the
/// migration and still holds historical rows keyed by an explicit
/// `patientId` field. `Patients` holds one parent document per patient.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Partition {
    Patients,
    PatientReports { patient_id: String },
    Reports,
}

impl Partition {
    /// Slash-joined storage path under the configured collection names.
    pub fn path(&self, config: &StoreConfig) -> String {
        match self {
            Partition::Patients => config.patients_collection.clone(),
            Partition::PatientReports { patient_id } => format!(
                "{}/{}/{}",
                config.patients_collection, patient_id, config.reports_collection
            ),
            Partition::Reports => config.reports_collection.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    /// Inclusive lower bound.
    Gte,
    /// Inclusive upper bound.
    Lte,
}

/// One conjunctive predicate on a named field.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: FieldValue,
}

impl FieldFilter {
    pub fn eq(field: &str, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn gte(field: &str, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOp::Gte,
            value: value.into(),
        }
    }

    pub fn lte(field: &str, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOp::Lte,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// One store read: a partition, conjunctive filters, optional ordering.
#[derive(Debug, Clone)]
pub struct StoreQuery {
    pub partition: Partition,
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<OrderBy>,
}

impl StoreQuery {
    pub fn partition(partition: Partition) -> Self {
        Self {
            partition,
            filters: Vec::new(),
            order_by: None,
        }
    }

    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_desc(mut self, field: &str) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction: Direction::Descending,
        });
        self
    }
}

/// A raw document as the store returns it: loose values, no schema.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub id: String,
    pub fields: HashMap<String, FieldValue>,
}

impl RawDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: HashMap::new(),
        }
    }

    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }
}

/// Capability surface of the document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a filtered, optionally ordered query against one partition.
    async fn run_query(&self, query: &StoreQuery) -> Result<Vec<RawDocument>, StoreError>;

    /// Point lookup by document id.
    async fn get(
        &self,
        partition: &Partition,
        id: &str,
    ) -> Result<Option<RawDocument>, StoreError>;

    /// Insert a new document under a generated id, returning the id.
    async fn insert(
        &self,
        partition: &Partition,
        fields: HashMap<String, FieldValue>,
    ) -> Result<String, StoreError>;

    /// Create or merge-update a document at a known id. Existing fields
    /// not named in `fields` are kept.
    async fn upsert(
        &self,
        partition: &Partition,
        id: &str,
        fields: HashMap<String, FieldValue>,
    ) -> Result<(), StoreError>;

    /// Update an existing document; `NotFound` when the id is absent.
    async fn update(
        &self,
        partition: &Partition,
        id: &str,
        fields: HashMap<String, FieldValue>,
    ) -> Result<(), StoreError>;
}
