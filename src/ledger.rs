//! Direct registration of projects and single ledger entries.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::info;

use crate::db::LedgerStore;
use crate::error::{ObrasError, Result};
use crate::import::{WriteReport, write_entries};
use crate::models::{
    Category, Item, NewEntry, Project, ProjectForm, items_total, validate_amount, validate_items,
};

/// Creates a project from the registration form, refusing names already in use.
pub async fn register_project(store: &dyn LedgerStore, form: &ProjectForm) -> Result<Project> {
    let project = form.validate()?;

    if store.find_project_by_name(&project.name).await?.is_some() {
        return Err(ObrasError::DuplicateProject(project.name));
    }

    let created = store.insert_project(&project).await?;
    info!(project_id = created.id, name = %created.name, "Project registered");

    Ok(created)
}

/// A single entry typed in by hand.
#[derive(Debug, Clone)]
pub struct ManualEntryForm {
    pub project_id: i32,
    pub category: Category,
    pub date: NaiveDate,
    pub description: String,
    /// Ignored for materials, whose amount is the item total.
    pub amount: String,
    pub items: Vec<Item>,
}

impl ManualEntryForm {
    pub fn new(project_id: i32, category: Category, date: NaiveDate) -> Self {
        Self {
            project_id,
            category,
            date,
            description: String::new(),
            amount: String::new(),
            items: Vec::new(),
        }
    }

    /// Amount shown in the form: the item total for materials.
    pub fn effective_amount(&self) -> Option<BigDecimal> {
        if self.category == Category::Material {
            Some(items_total(&self.items))
        } else {
            parse_decimal(&self.amount)
        }
    }

    pub fn validate(&self, subcategories: &[String]) -> Result<NewEntry> {
        if self.category == Category::Material {
            if self.items.is_empty() {
                return Err(ObrasError::validation("Add at least one item to the table."));
            }
            let total = items_total(&self.items);
            validate_items(&self.items, &total, subcategories)?;
            validate_amount(&total)?;

            return Ok(NewEntry {
                project_id: self.project_id,
                date: self.date,
                detail: None,
                category: self.category,
                amount: total,
                description: self.description.trim().to_string(),
                quantity: None,
                items: Some(self.items.clone()),
            });
        }

        let amount = parse_decimal(&self.amount)
            .ok_or_else(|| ObrasError::validation(format!("Invalid amount: '{}'", self.amount.trim())))?;
        validate_amount(&amount)?;
        if self.description.trim().is_empty() {
            return Err(ObrasError::validation("Please fill in every field."));
        }

        Ok(NewEntry {
            project_id: self.project_id,
            date: self.date,
            detail: None,
            category: self.category,
            amount,
            description: self.description.trim().to_string(),
            quantity: None,
            items: None,
        })
    }
}

/// Decimal typed in a form; a comma is accepted as the decimal separator.
pub fn parse_decimal(raw: &str) -> Option<BigDecimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    BigDecimal::from_str(&raw.replace(',', ".")).ok()
}

pub async fn record_entry(
    store: &dyn LedgerStore,
    form: &ManualEntryForm,
    subcategories: &[String],
) -> Result<WriteReport> {
    let entry = form.validate(subcategories)?;
    write_entries(store, std::slice::from_ref(&entry)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{EntryFilter, MemoryStore};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn project_form(name: &str) -> ProjectForm {
        ProjectForm {
            name: name.to_string(),
            address: "Rua B, 2".to_string(),
            client_name: "Carla".to_string(),
            client_tax_id: "98765432100".to_string(),
            budget: "80000".to_string(),
            start_date: date(2024, 2, 1),
            end_date: date(2024, 9, 1),
        }
    }

    fn subcategories() -> Vec<String> {
        vec!["General".to_string(), "Painting".to_string()]
    }

    #[tokio::test]
    async fn duplicate_names_are_refused() {
        let store = MemoryStore::new();
        register_project(&store, &project_form("Pituba")).await.unwrap();

        let err = register_project(&store, &project_form("PITUBA")).await.unwrap_err();
        assert!(matches!(err, ObrasError::DuplicateProject(name) if name == "PITUBA"));
    }

    #[tokio::test]
    async fn material_amount_is_the_item_total() {
        let store = MemoryStore::new();
        let mut form = ManualEntryForm::new(1, Category::Material, date(2024, 3, 3));
        form.items = vec![
            Item {
                name: "Tinta".to_string(),
                subcategory: "Painting".to_string(),
                quantity: BigDecimal::from(3),
                value: BigDecimal::from(270),
            },
            Item {
                name: "Rolo".to_string(),
                subcategory: "Painting".to_string(),
                quantity: BigDecimal::from(2),
                value: BigDecimal::from(30),
            },
        ];
        assert_eq!(form.effective_amount(), Some(BigDecimal::from(300)));

        let report = record_entry(&store, &form, &subcategories()).await.unwrap();
        assert_eq!(report.inserted, 1);

        let saved = store.list_entries(&EntryFilter::default()).await.unwrap();
        assert_eq!(saved[0].amount, BigDecimal::from(300));
        assert!(saved[0].detail.is_none());
    }

    #[test]
    fn plain_entries_need_amount_and_description() {
        let mut form = ManualEntryForm::new(1, Category::Labor, date(2024, 3, 3));
        form.amount = "0".to_string();
        form.description = "pedreiro".to_string();
        assert!(matches!(form.validate(&subcategories()), Err(ObrasError::Validation(_))));

        form.amount = "1500,50".to_string();
        form.description = " ".to_string();
        assert!(matches!(form.validate(&subcategories()), Err(ObrasError::Validation(_))));

        form.description = "pedreiro".to_string();
        let entry = form.validate(&subcategories()).unwrap();
        assert_eq!(entry.amount, BigDecimal::from_str("1500.50").unwrap());
    }

    #[test]
    fn amounts_are_kept_to_cents() {
        let mut form = ManualEntryForm::new(1, Category::Other, date(2024, 3, 3));
        form.description = "taxa".to_string();
        form.amount = "10,555".to_string();
        assert!(matches!(form.validate(&subcategories()), Err(ObrasError::Validation(_))));

        let mut material = ManualEntryForm::new(1, Category::Material, date(2024, 3, 3));
        material.items = vec![Item {
            name: "Parafuso".to_string(),
            subcategory: "General".to_string(),
            quantity: BigDecimal::from(100),
            value: BigDecimal::from_str("0.125").unwrap(),
        }];
        assert!(matches!(material.validate(&subcategories()), Err(ObrasError::Validation(_))));
    }

    #[test]
    fn material_without_items_is_rejected() {
        let form = ManualEntryForm::new(1, Category::Material, date(2024, 3, 3));
        assert!(matches!(form.validate(&subcategories()), Err(ObrasError::Validation(_))));
    }
}
