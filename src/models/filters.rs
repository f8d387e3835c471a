use serde::{Deserialize, Serialize};

/// Date bounds for a report listing. Both bounds are inclusive and use
/// the same `YYYY-MM-DD` tokens the store holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFilter {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl ReportFilter {
    pub fn since(date: impl Into<String>) -> Self {
        Self {
            date_from: Some(date.into()),
            date_to: None,
        }
    }

    pub fn between(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            date_from: Some(from.into()),
            date_to: Some(to.into()),
        }
    }
}
