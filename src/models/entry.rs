use std::fmt;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ObrasError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Deposit,
    Labor,
    Material,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Deposit,
        Category::Labor,
        Category::Material,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Deposit => "Deposit",
            Category::Labor => "Labor",
            Category::Material => "Material",
            Category::Other => "Other",
        }
    }

    /// Parses the stored label. The Portuguese labels of older rows are accepted too.
    pub fn parse(label: &str) -> Option<Category> {
        match label.trim().to_lowercase().as_str() {
            "deposit" | "depósito" | "deposito" => Some(Category::Deposit),
            "labor" | "mão de obra" | "mao de obra" => Some(Category::Labor),
            "material" => Some(Category::Material),
            "other" | "outros" => Some(Category::Other),
            _ => None,
        }
    }

    pub fn next(&self) -> Category {
        match self {
            Category::Deposit => Category::Labor,
            Category::Labor => Category::Material,
            Category::Material => Category::Other,
            Category::Other => Category::Deposit,
        }
    }

    pub fn previous(&self) -> Category {
        match self {
            Category::Deposit => Category::Other,
            Category::Labor => Category::Deposit,
            Category::Material => Category::Labor,
            Category::Other => Category::Material,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One itemized line of a material purchase. `value` is the line total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub subcategory: String,
    pub quantity: BigDecimal,
    pub value: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: i64,
    pub project_id: i32,
    pub date: NaiveDate,
    pub detail: Option<String>,
    pub category: Category,
    pub amount: BigDecimal,
    pub description: String,
    pub quantity: Option<BigDecimal>,
    pub items: Option<Vec<Item>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub project_id: i32,
    pub date: NaiveDate,
    pub detail: Option<String>,
    pub category: Category,
    pub amount: BigDecimal,
    pub description: String,
    pub quantity: Option<BigDecimal>,
    pub items: Option<Vec<Item>>,
}

/// Natural key used to skip entries that were already imported.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupKey {
    pub project_id: i32,
    pub date: NaiveDate,
    pub detail: Option<String>,
    pub amount: BigDecimal,
    pub category: Category,
    pub description: String,
}

impl NewEntry {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            project_id: self.project_id,
            date: self.date,
            detail: self.detail.clone(),
            amount: self.amount.clone(),
            category: self.category,
            description: self.description.clone(),
        }
    }
}

impl Entry {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            project_id: self.project_id,
            date: self.date,
            detail: self.detail.clone(),
            amount: self.amount.clone(),
            category: self.category,
            description: self.description.clone(),
        }
    }

    pub fn is_itemized(&self) -> bool {
        self.items.as_ref().is_some_and(|items| !items.is_empty())
    }
}

/// Ledger amounts are positive and carry at most two decimal places.
pub fn validate_amount(amount: &BigDecimal) -> Result<()> {
    if *amount <= BigDecimal::from(0) {
        return Err(ObrasError::validation("The amount must be greater than zero."));
    }
    if amount.with_scale(2) != *amount {
        return Err(ObrasError::validation(
            "The amount cannot have more than two decimal places.",
        ));
    }
    Ok(())
}

pub fn items_total(items: &[Item]) -> BigDecimal {
    items
        .iter()
        .fold(BigDecimal::from(0), |acc, item| acc + &item.value)
}

/// Checks each item and that the item values add up to `declared` exactly.
pub fn validate_items(items: &[Item], declared: &BigDecimal, subcategories: &[String]) -> Result<()> {
    if items.is_empty() {
        return Err(ObrasError::validation(
            "Add at least one item to detail the purchase.",
        ));
    }

    let zero = BigDecimal::from(0);
    for (i, item) in items.iter().enumerate() {
        let line = i + 1;
        if item.name.trim().is_empty() {
            return Err(ObrasError::validation(format!("Item {line}: the name is required.")));
        }
        if !subcategories.iter().any(|s| s == &item.subcategory) {
            return Err(ObrasError::validation(format!(
                "Item {line}: unknown subcategory '{}'.",
                item.subcategory
            )));
        }
        if item.quantity <= zero {
            return Err(ObrasError::validation(format!(
                "Item {line}: the quantity must be greater than zero."
            )));
        }
        if item.value < zero {
            return Err(ObrasError::validation(format!(
                "Item {line}: the value cannot be negative."
            )));
        }
    }

    let total = items_total(items);
    if &total != declared {
        return Err(ObrasError::AmountMismatch {
            items_total: total,
            declared: declared.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn subcategories() -> Vec<String> {
        vec!["General".to_string(), "Painting".to_string()]
    }

    fn item(name: &str, value: &str) -> Item {
        Item {
            name: name.to_string(),
            subcategory: "General".to_string(),
            quantity: dec("1"),
            value: dec(value),
        }
    }

    #[test]
    fn items_must_match_declared_total_exactly() {
        let declared = dec("100.00");
        let ok = vec![item("Cimento", "40.00"), item("Areia", "60.00")];
        assert!(validate_items(&ok, &declared, &subcategories()).is_ok());

        let off = vec![item("Cimento", "40.00"), item("Areia", "59.99")];
        match validate_items(&off, &declared, &subcategories()) {
            Err(ObrasError::AmountMismatch { items_total, .. }) => {
                assert_eq!(items_total, dec("99.99"))
            }
            other => panic!("expected amount mismatch, got {other:?}"),
        }
    }

    #[test]
    fn empty_item_list_is_a_validation_error() {
        let res = validate_items(&[], &dec("10"), &subcategories());
        assert!(matches!(res, Err(ObrasError::Validation(_))));
    }

    #[test]
    fn item_quantity_must_be_positive() {
        let mut it = item("Tinta", "10");
        it.quantity = dec("0");
        let res = validate_items(&[it], &dec("10"), &subcategories());
        assert!(matches!(res, Err(ObrasError::Validation(_))));
    }

    #[test]
    fn unknown_subcategory_is_rejected() {
        let mut it = item("Fio", "10");
        it.subcategory = "Electrical".to_string();
        let res = validate_items(&[it], &dec("10"), &subcategories());
        assert!(matches!(res, Err(ObrasError::Validation(_))));
    }

    #[test]
    fn amounts_must_be_positive_cents() {
        assert!(validate_amount(&dec("0.01")).is_ok());
        assert!(validate_amount(&dec("1500.50")).is_ok());
        assert!(matches!(validate_amount(&dec("0")), Err(ObrasError::Validation(_))));
        assert!(matches!(validate_amount(&dec("0.00")), Err(ObrasError::Validation(_))));
        assert!(matches!(validate_amount(&dec("-3")), Err(ObrasError::Validation(_))));
        assert!(matches!(validate_amount(&dec("10.555")), Err(ObrasError::Validation(_))));
    }

    #[test]
    fn category_labels_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::parse(category.as_str()), Some(category));
        }
        assert_eq!(Category::parse("Mão de Obra"), Some(Category::Labor));
        assert_eq!(Category::parse("unknown"), None);
    }
}
