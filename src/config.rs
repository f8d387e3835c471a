//! Store connectivity configuration.
//!
//! The surrounding application decides project and collection naming and
//! passes an explicit `StoreConfig` into whatever constructs the store.
//! Nothing in this crate reads the process environment.

use serde::{Deserialize, Serialize};

/// Configuration for one document store connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Project the document store lives in.
    pub project_id: String,
    #[serde(default = "default_database_id")]
    pub database_id: String,
    /// Root collection holding one document per patient.
    #[serde(default = "default_patients_collection")]
    pub patients_collection: String,
    /// Name shared by the per-patient report subcollection and the legacy
    /// flat collection. The historical layout used one name for both.
    #[serde(default = "default_reports_collection")]
    pub reports_collection: String,
}

fn default_database_id() -> String {
    "(default)".into()
}

fn default_patients_collection() -> String {
    "patients".into()
}

fn default_reports_collection() -> String {
    "reports".into()
}

impl StoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database_id: default_database_id(),
            patients_collection: default_patients_collection(),
            reports_collection: default_reports_collection(),
        }
    }
}
