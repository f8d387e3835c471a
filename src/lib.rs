//! Report aggregation and normalization core for home-visit care records.
//!
//! Visit reports live in two structurally different partitions of a
//! document store (a current per-patient partition and a deprecated flat
//! one) and were written under several historical field-naming schemes.
//! This crate reconciles both into one canonical, deduplicated,
//! date-descending listing, and carries the write path that feeds the
//! current partition.

pub mod config;
pub mod models;
pub mod reports;
pub mod store;

pub use config::StoreConfig;
pub use models::{Report, ReportDraft, ReportFilter};
pub use reports::{ReportAggregator, ReportError, ReportService};
pub use store::{DocumentStore, MemoryStore, StoreError};
