//! Ledger for construction projects: budgets, spending and bank statement imports.

pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod ledger;
pub mod models;
pub mod reports;
pub mod ui;
