use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::error::{ObrasError, Result};

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Project {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub client_name: String,
    pub client_tax_id: String,
    pub budget: BigDecimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// A validated project, ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub name: String,
    pub address: String,
    pub client_name: String,
    pub client_tax_id: String,
    pub budget: BigDecimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Raw registration form input, as typed by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectForm {
    pub name: String,
    pub address: String,
    pub client_name: String,
    pub client_tax_id: String,
    pub budget: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ProjectForm {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            name: String::new(),
            address: String::new(),
            client_name: String::new(),
            client_tax_id: String::new(),
            budget: String::new(),
            start_date: today,
            end_date: today,
        }
    }

    /// Form pre-filled with a project name discovered during an import.
    pub fn for_name(name: &str, today: NaiveDate) -> Self {
        Self {
            name: normalize_name(name),
            ..Self::new(today)
        }
    }

    pub fn validate(&self) -> Result<NewProject> {
        let fields = [
            &self.name,
            &self.address,
            &self.client_name,
            &self.client_tax_id,
            &self.budget,
        ];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(ObrasError::validation("Please fill in every field."));
        }

        let tax_id = self.client_tax_id.trim();
        if !is_valid_tax_id(tax_id) {
            return Err(ObrasError::validation(
                "Invalid client tax id. It must have exactly 11 digits.",
            ));
        }

        let budget = parse_budget(&self.budget)?;

        if self.end_date <= self.start_date {
            return Err(ObrasError::validation(
                "The end date must be after the start date.",
            ));
        }

        Ok(NewProject {
            name: normalize_name(&self.name),
            address: self.address.trim().to_string(),
            client_name: self.client_name.trim().to_string(),
            client_tax_id: tax_id.to_string(),
            budget,
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}

/// Project names are stored and compared uppercased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}

pub fn is_valid_tax_id(tax_id: &str) -> bool {
    tax_id.len() == 11 && tax_id.chars().all(|c| c.is_ascii_digit())
}

fn parse_budget(raw: &str) -> Result<BigDecimal> {
    let budget = BigDecimal::from_str(raw.trim().replace(',', ".").as_str())
        .map_err(|_| ObrasError::validation(format!("Invalid budget: '{}'", raw.trim())))?;
    if budget < BigDecimal::from(0) {
        return Err(ObrasError::validation("The budget cannot be negative."));
    }
    Ok(budget)
}
