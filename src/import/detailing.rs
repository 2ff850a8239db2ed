use std::collections::VecDeque;

use bigdecimal::BigDecimal;
use tracing::info;

use super::reconcile::PendingMaterial;
use super::writer::{WriteReport, write_entries};
use crate::db::LedgerStore;
use crate::error::{ObrasError, Result};
use crate::models::{Item, validate_items};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailingStep {
    /// Choose which material entries get itemized.
    Select,
    /// Item grid for the entry at the front of the queue.
    Detail,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRow {
    pub material: PendingMaterial,
    pub detail_now: bool,
    /// Needed when the entry is saved without items.
    pub quantity: Option<BigDecimal>,
}

/// Walks the material entries of a batch, writing each one as-is or itemized.
#[derive(Debug, Clone)]
pub struct DetailingFlow {
    selection: Vec<SelectionRow>,
    queue: VecDeque<PendingMaterial>,
    step: DetailingStep,
}

impl DetailingFlow {
    pub fn new(materials: Vec<PendingMaterial>) -> Self {
        let selection = materials
            .into_iter()
            .map(|material| SelectionRow {
                material,
                detail_now: false,
                quantity: None,
            })
            .collect();

        Self {
            selection,
            queue: VecDeque::new(),
            step: DetailingStep::Select,
        }
    }

    pub fn step(&self) -> DetailingStep {
        self.step
    }

    pub fn selection(&self) -> &[SelectionRow] {
        &self.selection
    }

    pub fn toggle(&mut self, index: usize) {
        if let Some(row) = self.selection.get_mut(index) {
            row.detail_now = !row.detail_now;
        }
    }

    pub fn set_quantity(&mut self, index: usize, quantity: Option<BigDecimal>) {
        if let Some(row) = self.selection.get_mut(index) {
            row.quantity = quantity;
        }
    }

    pub fn current(&self) -> Option<&PendingMaterial> {
        match self.step {
            DetailingStep::Detail => self.queue.front(),
            _ => None,
        }
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Writes the unflagged rows as they are and queues the flagged ones.
    ///
    /// Every unflagged row needs a positive quantity; if one is missing nothing is written.
    pub async fn confirm_selection(&mut self, store: &dyn LedgerStore) -> Result<WriteReport> {
        if self.step != DetailingStep::Select {
            return Err(ObrasError::validation("The selection was already confirmed."));
        }

        let zero = BigDecimal::from(0);
        let mut as_is = Vec::new();
        for row in self.selection.iter().filter(|r| !r.detail_now) {
            match &row.quantity {
                Some(quantity) if quantity > &zero => {
                    as_is.push(row.material.to_entry(Some(quantity.clone()), None));
                }
                _ => {
                    return Err(ObrasError::validation(format!(
                        "Enter the quantity for '{}' or mark it to be detailed.",
                        row.material.detail
                    )));
                }
            }
        }

        let report = write_entries(store, &as_is).await?;

        self.queue = self
            .selection
            .iter()
            .filter(|r| r.detail_now)
            .map(|r| r.material.clone())
            .collect();
        self.step = if self.queue.is_empty() {
            DetailingStep::Done
        } else {
            DetailingStep::Detail
        };

        info!(
            written = as_is.len(),
            to_detail = self.queue.len(),
            "Material selection confirmed"
        );

        Ok(report)
    }

    /// Saves the current entry with its items and moves to the next one.
    pub async fn submit_items(
        &mut self,
        items: Vec<Item>,
        subcategories: &[String],
        store: &dyn LedgerStore,
    ) -> Result<WriteReport> {
        let Some(current) = self.current() else {
            return Err(ObrasError::validation("No material entry is waiting for items."));
        };

        validate_items(&items, &current.amount, subcategories)?;

        let entry = current.to_entry(None, Some(items));
        let report = write_entries(store, std::slice::from_ref(&entry)).await?;

        self.queue.pop_front();
        if self.queue.is_empty() {
            self.step = DetailingStep::Done;
        }

        Ok(report)
    }
}
