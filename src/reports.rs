//! Dashboard figures computed from projects and their entries.

use std::collections::HashMap;

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::NaiveDate;

use crate::models::{Category, Entry, Project};

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSummary {
    pub project_id: i32,
    pub name: String,
    pub client_name: String,
    pub start_date: NaiveDate,
    pub budget: BigDecimal,
    pub spent: BigDecimal,
    pub received: BigDecimal,
    pub balance: BigDecimal,
    pub percent_used: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    /// Highest consumption first.
    pub projects: Vec<ProjectSummary>,
    pub total_budget: BigDecimal,
    pub total_spent: BigDecimal,
    pub total_received: BigDecimal,
    pub balance: BigDecimal,
    pub by_category: Vec<(Category, BigDecimal)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectReport {
    pub project: Project,
    pub spent: BigDecimal,
    pub received: BigDecimal,
    pub balance: BigDecimal,
    pub percent_used: f64,
    pub by_category: Vec<(Category, BigDecimal)>,
    pub entries: Vec<Entry>,
}

/// One itemized material purchase line.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialPurchase {
    pub date: NaiveDate,
    pub project: String,
    pub description: String,
    pub item: String,
    pub quantity: BigDecimal,
    pub value: BigDecimal,
}

impl MaterialPurchase {
    pub fn unit_price(&self) -> Option<BigDecimal> {
        if self.quantity == BigDecimal::from(0) {
            None
        } else {
            Some(&self.value / &self.quantity)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialReport {
    pub subcategory: String,
    /// Newest first.
    pub purchases: Vec<MaterialPurchase>,
    pub total_quantity: BigDecimal,
    pub total_spent: BigDecimal,
    pub average_value: Option<BigDecimal>,
    /// (project, quantity, value), by project name.
    pub by_project: Vec<(String, BigDecimal, BigDecimal)>,
}

fn zero() -> BigDecimal {
    BigDecimal::from(0)
}

fn is_spending(entry: &Entry) -> bool {
    entry.category != Category::Deposit
}

fn percent(part: &BigDecimal, whole: &BigDecimal) -> f64 {
    if whole == &zero() {
        return 0.0;
    }
    (part / whole).to_f64().map(|ratio| ratio * 100.0).unwrap_or(0.0)
}

fn totals_by_category(entries: &[&Entry]) -> Vec<(Category, BigDecimal)> {
    Category::ALL
        .iter()
        .filter_map(|category| {
            let matching: Vec<&&Entry> = entries.iter().filter(|e| e.category == *category).collect();
            if matching.is_empty() {
                return None;
            }
            let total = matching.iter().fold(zero(), |acc, e| acc + &e.amount);
            Some((*category, total))
        })
        .collect()
}

pub fn overview(projects: &[Project], entries: &[Entry]) -> Overview {
    let mut spent: HashMap<i32, BigDecimal> = HashMap::new();
    let mut received: HashMap<i32, BigDecimal> = HashMap::new();
    for entry in entries {
        let bucket = if is_spending(entry) { &mut spent } else { &mut received };
        let total = bucket.entry(entry.project_id).or_insert_with(zero);
        *total = &*total + &entry.amount;
    }

    let mut rows: Vec<ProjectSummary> = projects
        .iter()
        .map(|project| {
            let spent = spent.get(&project.id).cloned().unwrap_or_else(zero);
            let received = received.get(&project.id).cloned().unwrap_or_else(zero);
            ProjectSummary {
                project_id: project.id,
                name: project.name.clone(),
                client_name: project.client_name.clone(),
                start_date: project.start_date,
                budget: project.budget.clone(),
                balance: &project.budget - &spent,
                percent_used: percent(&spent, &project.budget),
                spent,
                received,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.percent_used.total_cmp(&a.percent_used));

    let total_budget = rows.iter().fold(zero(), |acc, r| acc + &r.budget);
    let total_spent = rows.iter().fold(zero(), |acc, r| acc + &r.spent);
    let total_received = rows.iter().fold(zero(), |acc, r| acc + &r.received);
    let all: Vec<&Entry> = entries.iter().collect();

    Overview {
        balance: &total_budget - &total_spent,
        by_category: totals_by_category(&all),
        projects: rows,
        total_budget,
        total_spent,
        total_received,
    }
}

/// Figures for one project. `categories` narrows the entry list only; empty shows all.
pub fn project_report(project: &Project, entries: &[Entry], categories: &[Category]) -> ProjectReport {
    let own: Vec<&Entry> = entries.iter().filter(|e| e.project_id == project.id).collect();

    let spent = own
        .iter()
        .filter(|e| is_spending(e))
        .fold(zero(), |acc, e| acc + &e.amount);
    let received = own
        .iter()
        .filter(|e| !is_spending(e))
        .fold(zero(), |acc, e| acc + &e.amount);

    let listed = own
        .iter()
        .filter(|e| categories.is_empty() || categories.contains(&e.category))
        .map(|e| (*e).clone())
        .collect();

    ProjectReport {
        project: project.clone(),
        balance: &project.budget - &spent,
        percent_used: percent(&spent, &project.budget),
        by_category: totals_by_category(&own),
        entries: listed,
        spent,
        received,
    }
}

/// Expands itemized material entries into purchase lines.
pub fn material_purchases(projects: &[Project], entries: &[Entry]) -> Vec<(String, MaterialPurchase)> {
    let names: HashMap<i32, &str> = projects.iter().map(|p| (p.id, p.name.as_str())).collect();

    entries
        .iter()
        .filter(|e| e.category == Category::Material)
        .flat_map(|entry| {
            let project = names.get(&entry.project_id).copied().unwrap_or("?").to_string();
            entry
                .items
                .iter()
                .flatten()
                .map(move |item| {
                    (
                        item.subcategory.clone(),
                        MaterialPurchase {
                            date: entry.date,
                            project: project.clone(),
                            description: entry.description.clone(),
                            item: item.name.clone(),
                            quantity: item.quantity.clone(),
                            value: item.value.clone(),
                        },
                    )
                })
        })
        .collect()
}

pub fn material_report(projects: &[Project], entries: &[Entry], subcategory: &str) -> MaterialReport {
    let mut purchases: Vec<MaterialPurchase> = material_purchases(projects, entries)
        .into_iter()
        .filter(|(sub, _)| sub == subcategory)
        .map(|(_, purchase)| purchase)
        .collect();
    purchases.sort_by(|a, b| b.date.cmp(&a.date));

    let total_quantity = purchases.iter().fold(zero(), |acc, p| acc + &p.quantity);
    let total_spent = purchases.iter().fold(zero(), |acc, p| acc + &p.value);
    let average_value = if purchases.is_empty() {
        None
    } else {
        Some(&total_spent / BigDecimal::from(purchases.len() as i64))
    };

    let mut per_project: HashMap<String, (BigDecimal, BigDecimal)> = HashMap::new();
    for purchase in &purchases {
        let (quantity, value) = per_project
            .entry(purchase.project.clone())
            .or_insert_with(|| (zero(), zero()));
        *quantity = &*quantity + &purchase.quantity;
        *value = &*value + &purchase.value;
    }
    let mut by_project: Vec<(String, BigDecimal, BigDecimal)> = per_project
        .into_iter()
        .map(|(name, (quantity, value))| (name, quantity, value))
        .collect();
    by_project.sort_by(|a, b| a.0.cmp(&b.0));

    MaterialReport {
        subcategory: subcategory.to_string(),
        purchases,
        total_quantity,
        total_spent,
        average_value,
        by_project,
    }
}

/// `R$ 1234.50` style amount with two decimals.
pub fn money(value: &BigDecimal) -> String {
    format!("R$ {}", value.with_scale(2))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::models::Item;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn project(id: i32, name: &str, budget: &str) -> Project {
        Project {
            id,
            name: name.to_string(),
            address: "Rua".to_string(),
            client_name: "Cliente".to_string(),
            client_tax_id: "12345678901".to_string(),
            budget: dec(budget),
            start_date: date(1, 1),
            end_date: date(12, 1),
        }
    }

    fn entry(id: i64, project_id: i32, category: Category, amount: &str) -> Entry {
        Entry {
            id,
            project_id,
            date: date(3, id as u32),
            detail: None,
            category,
            amount: dec(amount),
            description: format!("entry {id}"),
            quantity: None,
            items: None,
        }
    }

    fn item(name: &str, subcategory: &str, quantity: &str, value: &str) -> Item {
        Item {
            name: name.to_string(),
            subcategory: subcategory.to_string(),
            quantity: dec(quantity),
            value: dec(value),
        }
    }

    #[test]
    fn overview_excludes_deposits_from_spending() {
        let projects = vec![project(1, "ALPHA", "1000"), project(2, "BETA", "0")];
        let entries = vec![
            entry(1, 1, Category::Deposit, "5000"),
            entry(2, 1, Category::Labor, "250"),
            entry(3, 1, Category::Material, "250"),
            entry(4, 2, Category::Other, "10"),
        ];

        let view = overview(&projects, &entries);
        assert_eq!(view.total_budget, dec("1000"));
        assert_eq!(view.total_spent, dec("510"));
        assert_eq!(view.total_received, dec("5000"));
        assert_eq!(view.balance, dec("490"));

        assert_eq!(view.projects[0].name, "ALPHA");
        assert!((view.projects[0].percent_used - 50.0).abs() < 1e-9);
        assert_eq!(view.projects[1].percent_used, 0.0);
        assert_eq!(view.projects[1].balance, dec("-10"));

        assert_eq!(view.by_category.len(), 4);
        assert_eq!(view.by_category[0], (Category::Deposit, dec("5000")));
    }

    #[test]
    fn project_report_filters_listed_entries() {
        let alpha = project(1, "ALPHA", "1000");
        let entries = vec![
            entry(1, 1, Category::Labor, "100"),
            entry(2, 1, Category::Other, "50"),
            entry(3, 2, Category::Labor, "999"),
        ];

        let report = project_report(&alpha, &entries, &[Category::Other]);
        assert_eq!(report.spent, dec("150"));
        assert_eq!(report.balance, dec("850"));
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.by_category.len(), 2);
    }

    #[test]
    fn material_report_expands_items() {
        let projects = vec![project(1, "ALPHA", "1000"), project(2, "BETA", "1000")];
        let mut first = entry(1, 1, Category::Material, "100");
        first.items = Some(vec![
            item("Tinta acrílica", "Painting", "2", "80"),
            item("Prego", "General", "1", "20"),
        ]);
        let mut second = entry(2, 2, Category::Material, "45");
        second.items = Some(vec![item("Tinta esmalte", "Painting", "1", "45")]);
        let plain = entry(3, 1, Category::Material, "70");

        let report = material_report(&projects, &[first, second, plain], "Painting");
        assert_eq!(report.purchases.len(), 2);
        assert_eq!(report.purchases[0].project, "BETA");
        assert_eq!(report.total_quantity, dec("3"));
        assert_eq!(report.total_spent, dec("125"));
        assert_eq!(report.average_value, Some(dec("62.5")));
        assert_eq!(report.purchases[1].unit_price(), Some(dec("40")));
        assert_eq!(report.by_project.len(), 2);

        let empty = material_report(&projects, &[], "Plumbing");
        assert!(empty.purchases.is_empty());
        assert_eq!(empty.average_value, None);
    }

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(money(&dec("1234.5")), "R$ 1234.50");
    }
}
