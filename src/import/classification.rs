use crate::models::{CandidateRow, Category};

/// Editable view over the candidate rows of one import.
///
/// Only project, category and description can change; date, detail and
/// amount come from the statement.
#[derive(Debug, Clone, Default)]
pub struct ClassificationGrid {
    rows: Vec<CandidateRow>,
}

impl ClassificationGrid {
    pub fn new(rows: Vec<CandidateRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[CandidateRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn set_project(&mut self, index: usize, project: &str) {
        if let Some(row) = self.rows.get_mut(index) {
            row.project = project.to_string();
        }
    }

    pub fn set_category(&mut self, index: usize, category: Option<Category>) {
        if let Some(row) = self.rows.get_mut(index) {
            row.category = category;
        }
    }

    pub fn set_description(&mut self, index: usize, description: &str) {
        if let Some(row) = self.rows.get_mut(index) {
            row.description = description.to_string();
        }
    }

    /// Rows ready for submission, trimmed. Incomplete rows are left out.
    pub fn valid_rows(&self) -> Vec<CandidateRow> {
        self.rows
            .iter()
            .filter(|row| row.is_complete())
            .map(|row| CandidateRow {
                project: row.project.trim().to_string(),
                description: row.description.trim().to_string(),
                ..row.clone()
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    use super::*;

    fn row(detail: &str) -> CandidateRow {
        CandidateRow {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            detail: detail.to_string(),
            amount: BigDecimal::from(10),
            project: String::new(),
            category: None,
            description: String::new(),
        }
    }

    #[test]
    fn incomplete_rows_are_excluded() {
        let mut grid = ClassificationGrid::new(vec![row("A"), row("B"), row("C")]);

        grid.set_project(0, "  alpha ");
        grid.set_category(0, Some(Category::Labor));
        grid.set_description(0, " pedreiro ");

        grid.set_project(1, "alpha");
        grid.set_category(1, Some(Category::Other));
        grid.set_description(1, "   ");

        let valid = grid.valid_rows();
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].detail, "A");
        assert_eq!(valid[0].project, "alpha");
        assert_eq!(valid[0].description, "pedreiro");
    }

    #[test]
    fn out_of_range_edits_are_ignored() {
        let mut grid = ClassificationGrid::new(vec![row("A")]);
        grid.set_project(5, "alpha");
        assert_eq!(grid.rows()[0].project, "");
    }
}
