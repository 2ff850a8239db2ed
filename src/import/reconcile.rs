use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::models::{CandidateRow, Category, Item, NewEntry, Project, normalize_name};

/// Known project names (uppercase) and their ids.
#[derive(Debug, Clone, Default)]
pub struct ProjectIndex {
    by_name: HashMap<String, i32>,
}

impl ProjectIndex {
    pub fn from_projects(projects: &[Project]) -> Self {
        let mut index = Self::default();
        for project in projects {
            index.insert(project);
        }
        index
    }

    pub fn insert(&mut self, project: &Project) {
        self.by_name.insert(normalize_name(&project.name), project.id);
    }

    pub fn lookup(&self, name: &str) -> Option<i32> {
        self.by_name.get(&normalize_name(name)).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// A material row waiting to be detailed or written as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMaterial {
    pub project_id: i32,
    pub project_name: String,
    pub date: NaiveDate,
    pub detail: String,
    pub amount: BigDecimal,
    pub description: String,
}

impl PendingMaterial {
    pub fn to_entry(&self, quantity: Option<BigDecimal>, items: Option<Vec<Item>>) -> NewEntry {
        NewEntry {
            project_id: self.project_id,
            date: self.date,
            detail: Some(self.detail.clone()),
            category: Category::Material,
            amount: self.amount.clone(),
            description: self.description.clone(),
            quantity,
            items,
        }
    }
}

/// Rows of one submission split by what has to happen to them next.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub unknown: Vec<CandidateRow>,
    pub needs_detailing: Vec<PendingMaterial>,
    pub ready: Vec<NewEntry>,
}

impl Partition {
    /// While any project is unknown nothing from the batch may be written.
    pub fn is_deferred(&self) -> bool {
        !self.unknown.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.unknown.is_empty() && self.needs_detailing.is_empty() && self.ready.is_empty()
    }

    /// Distinct unknown names, uppercased, in first-seen order.
    pub fn unknown_project_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for row in &self.unknown {
            let name = normalize_name(&row.project);
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Splits complete rows into unknown-project, material and ready buckets.
///
/// The project check comes first, so a material row for an unknown project
/// lands in `unknown`. Incomplete rows are skipped.
pub fn partition(rows: &[CandidateRow], projects: &ProjectIndex) -> Partition {
    let mut out = Partition::default();

    for row in rows.iter().filter(|r| r.is_complete()) {
        let Some(category) = row.category else {
            continue;
        };

        let Some(project_id) = projects.lookup(&row.project) else {
            out.unknown.push(row.clone());
            continue;
        };

        if category == Category::Material {
            out.needs_detailing.push(PendingMaterial {
                project_id,
                project_name: normalize_name(&row.project),
                date: row.date,
                detail: row.detail.clone(),
                amount: row.amount.clone(),
                description: row.description.clone(),
            });
            continue;
        }

        out.ready.push(NewEntry {
            project_id,
            date: row.date,
            detail: Some(row.detail.clone()),
            category,
            amount: row.amount.clone(),
            description: row.description.clone(),
            quantity: None,
            items: None,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: i32, name: &str) -> Project {
        Project {
            id,
            name: name.to_string(),
            address: "Rua A".to_string(),
            client_name: "Cliente".to_string(),
            client_tax_id: "12345678901".to_string(),
            budget: BigDecimal::from(1000),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        }
    }

    fn row(project: &str, category: Category) -> CandidateRow {
        CandidateRow {
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            detail: "BOLETO".to_string(),
            amount: BigDecimal::from(50),
            project: project.to_string(),
            category: Some(category),
            description: "compra".to_string(),
        }
    }

    #[test]
    fn project_names_match_case_insensitively() {
        let index = ProjectIndex::from_projects(&[project(7, "PATAMARES")]);
        assert_eq!(index.lookup("patamares"), Some(7));
        assert_eq!(index.lookup(" Patamares "), Some(7));
        assert_eq!(index.lookup("pituba"), None);
    }

    #[test]
    fn unknown_project_wins_over_material() {
        let index = ProjectIndex::from_projects(&[project(1, "ALPHA")]);
        let rows = vec![
            row("alpha", Category::Other),
            row("beta", Category::Material),
            row("alpha", Category::Material),
            row("Beta", Category::Labor),
            row("gamma", Category::Deposit),
        ];

        let split = partition(&rows, &index);
        assert!(split.is_deferred());
        assert_eq!(split.unknown.len(), 3);
        assert_eq!(split.needs_detailing.len(), 1);
        assert_eq!(split.ready.len(), 1);
        assert_eq!(split.unknown_project_names(), vec!["BETA", "GAMMA"]);
    }

    #[test]
    fn ready_rows_carry_the_project_id_and_detail() {
        let index = ProjectIndex::from_projects(&[project(3, "ALPHA")]);
        let split = partition(&[row("alpha", Category::Labor)], &index);

        assert!(!split.is_deferred());
        let entry = &split.ready[0];
        assert_eq!(entry.project_id, 3);
        assert_eq!(entry.category, Category::Labor);
        assert_eq!(entry.detail.as_deref(), Some("BOLETO"));
        assert!(entry.items.is_none());
    }
}
