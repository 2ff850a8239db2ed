use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use super::Category;

/// One statement line while it is being classified. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRow {
    pub date: NaiveDate,
    pub detail: String,
    /// Always the magnitude; the sign only decides the initial category.
    pub amount: BigDecimal,
    pub project: String,
    pub category: Option<Category>,
    pub description: String,
}

impl CandidateRow {
    /// True when the user filled project, category and description.
    pub fn is_complete(&self) -> bool {
        !self.project.trim().is_empty()
            && self.category.is_some()
            && !self.description.trim().is_empty()
    }
}
