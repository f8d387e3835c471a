pub mod filters;
pub mod report;

pub use filters::ReportFilter;
pub use report::{Report, ReportDraft};
