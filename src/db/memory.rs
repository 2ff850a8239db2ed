use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use tokio::sync::Mutex;

use super::{EntryFilter, LedgerStore};
use crate::error::{ObrasError, Result};
use crate::models::{Entry, NewEntry, NewProject, Project};

/// In-process store with the same dedup semantics as the database.
#[derive(Default)]
pub struct MemoryStore {
    projects: Mutex<Vec<Project>>,
    entries: Mutex<Vec<Entry>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following call fail like an unreachable backend.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ObrasError::Write("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.check_online()?;
        let mut projects = self.projects.lock().await.clone();
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }

    async fn find_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        self.check_online()?;
        let projects = self.projects.lock().await;
        Ok(projects.iter().find(|p| p.name == name).cloned())
    }

    async fn insert_project(&self, project: &NewProject) -> Result<Project> {
        self.check_online()?;
        let mut projects = self.projects.lock().await;
        if projects.iter().any(|p| p.name == project.name) {
            return Err(ObrasError::DuplicateProject(project.name.clone()));
        }

        let created = Project {
            id: projects.len() as i32 + 1,
            name: project.name.clone(),
            address: project.address.clone(),
            client_name: project.client_name.clone(),
            client_tax_id: project.client_tax_id.clone(),
            budget: project.budget.clone(),
            start_date: project.start_date,
            end_date: project.end_date,
        };
        projects.push(created.clone());

        Ok(created)
    }

    async fn upsert_entries(&self, entries: &[NewEntry]) -> Result<Vec<Entry>> {
        self.check_online()?;
        // same outcome as the CHECK on entries.amount: the whole batch fails
        if let Some(bad) = entries.iter().find(|e| e.amount <= BigDecimal::from(0)) {
            return Err(ObrasError::Write(format!(
                "amount {} violates check constraint \"entries_amount_check\"",
                bad.amount
            )));
        }

        let mut stored = self.entries.lock().await;
        let mut inserted = Vec::new();

        for entry in entries {
            let key = entry.dedup_key();
            if stored.iter().any(|e| e.dedup_key() == key) {
                continue;
            }

            let created = Entry {
                id: stored.len() as i64 + 1,
                project_id: entry.project_id,
                date: entry.date,
                detail: entry.detail.clone(),
                category: entry.category,
                amount: entry.amount.clone(),
                description: entry.description.clone(),
                quantity: entry.quantity.clone(),
                items: entry.items.clone(),
            };
            stored.push(created.clone());
            inserted.push(created);
        }

        Ok(inserted)
    }

    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>> {
        self.check_online()?;
        let entries = self.entries.lock().await;
        let mut matching: Vec<Entry> = entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::Category;

    fn entry(detail: &str, amount: i32) -> NewEntry {
        NewEntry {
            project_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            detail: Some(detail.to_string()),
            category: Category::Other,
            amount: BigDecimal::from(amount),
            description: "tarifa".to_string(),
            quantity: None,
            items: None,
        }
    }

    #[tokio::test]
    async fn non_positive_amount_fails_the_whole_batch() {
        let store = MemoryStore::new();

        let err = store
            .upsert_entries(&[entry("PIX", 10), entry("TARIFA", 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, ObrasError::Write(_)));
        assert_eq!(store.entry_count().await, 0);
    }

    #[tokio::test]
    async fn repeated_entries_are_skipped() {
        let store = MemoryStore::new();

        let first = store.upsert_entries(&[entry("PIX", 10)]).await.unwrap();
        let second = store.upsert_entries(&[entry("PIX", 10), entry("TED", 20)]).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].detail.as_deref(), Some("TED"));
        assert_eq!(store.entry_count().await, 2);
    }
}
