use std::collections::VecDeque;

use chrono::NaiveDate;
use tracing::info;

use crate::db::LedgerStore;
use crate::error::{ObrasError, Result};
use crate::models::{Project, ProjectForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    /// Unknown names listed; waiting for proceed or cancel.
    Prompt,
    /// Registration form for the name at the front of the queue.
    Form,
    Done,
    Cancelled,
}

/// Registers the projects an import referenced but the ledger does not know, one at a time.
#[derive(Debug, Clone)]
pub struct OnboardingFlow {
    queue: VecDeque<String>,
    step: OnboardingStep,
    created: Vec<Project>,
}

impl OnboardingFlow {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            queue: names.into(),
            step: OnboardingStep::Prompt,
            created: Vec::new(),
        }
    }

    pub fn step(&self) -> OnboardingStep {
        self.step
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(String::as_str)
    }

    pub fn current(&self) -> Option<&str> {
        self.queue.front().map(String::as_str)
    }

    pub fn created(&self) -> &[Project] {
        &self.created
    }

    pub fn is_done(&self) -> bool {
        self.step == OnboardingStep::Done
    }

    pub fn proceed(&mut self) {
        if self.step == OnboardingStep::Prompt {
            self.step = if self.queue.is_empty() {
                OnboardingStep::Done
            } else {
                OnboardingStep::Form
            };
        }
    }

    pub fn cancel(&mut self) {
        self.queue.clear();
        self.step = OnboardingStep::Cancelled;
    }

    /// Blank form for the current name; the name itself is not editable.
    pub fn form(&self, today: NaiveDate) -> Option<ProjectForm> {
        match self.step {
            OnboardingStep::Form => self.current().map(|name| ProjectForm::for_name(name, today)),
            _ => None,
        }
    }

    /// Validates and creates the current project. On error the form stays open.
    pub async fn submit(&mut self, form: &ProjectForm, store: &dyn LedgerStore) -> Result<Project> {
        if self.step != OnboardingStep::Form {
            return Err(ObrasError::validation("No project is waiting to be registered."));
        }
        let Some(name) = self.current().map(str::to_string) else {
            return Err(ObrasError::validation("No project is waiting to be registered."));
        };

        let mut project = form.validate()?;
        project.name = name;

        let created = store.insert_project(&project).await?;
        info!(name = %created.name, remaining = self.queue.len() - 1, "Project onboarded");

        self.queue.pop_front();
        self.created.push(created.clone());
        if self.queue.is_empty() {
            self.step = OnboardingStep::Done;
        }

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn filled(form: ProjectForm) -> ProjectForm {
        ProjectForm {
            address: "Av. Sete, 10".to_string(),
            client_name: "João".to_string(),
            client_tax_id: "12345678901".to_string(),
            budget: "50000".to_string(),
            end_date: date(2024, 12, 31),
            ..form
        }
    }

    #[tokio::test]
    async fn names_are_registered_in_order() {
        let store = MemoryStore::new();
        let mut flow = OnboardingFlow::new(vec!["BETA".to_string(), "GAMMA".to_string()]);
        assert_eq!(flow.step(), OnboardingStep::Prompt);
        assert!(flow.form(date(2024, 1, 1)).is_none());

        flow.proceed();
        let form = flow.form(date(2024, 1, 1)).unwrap();
        assert_eq!(form.name, "BETA");
        flow.submit(&filled(form), &store).await.unwrap();
        assert_eq!(flow.step(), OnboardingStep::Form);
        assert_eq!(flow.current(), Some("GAMMA"));

        let form = flow.form(date(2024, 1, 1)).unwrap();
        flow.submit(&filled(form), &store).await.unwrap();
        assert!(flow.is_done());
        assert_eq!(flow.created().len(), 2);
        assert_eq!(store.list_projects().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_form_keeps_the_name_queued() {
        let store = MemoryStore::new();
        let mut flow = OnboardingFlow::new(vec!["BETA".to_string()]);
        flow.proceed();

        let mut form = filled(flow.form(date(2024, 1, 1)).unwrap());
        form.client_tax_id = "12345".to_string();
        let err = flow.submit(&form, &store).await.unwrap_err();
        assert!(matches!(err, ObrasError::Validation(_)));
        assert_eq!(flow.step(), OnboardingStep::Form);
        assert_eq!(flow.current(), Some("BETA"));

        form.client_tax_id = "12345678901".to_string();
        form.end_date = form.start_date;
        assert!(flow.submit(&form, &store).await.is_err());
        assert_eq!(flow.current(), Some("BETA"));
    }

    #[tokio::test]
    async fn edited_name_is_ignored() {
        let store = MemoryStore::new();
        let mut flow = OnboardingFlow::new(vec!["BETA".to_string()]);
        flow.proceed();

        let mut form = filled(flow.form(date(2024, 1, 1)).unwrap());
        form.name = "SOMETHING ELSE".to_string();
        let created = flow.submit(&form, &store).await.unwrap();
        assert_eq!(created.name, "BETA");
    }

    #[test]
    fn cancel_clears_the_queue() {
        let mut flow = OnboardingFlow::new(vec!["BETA".to_string()]);
        flow.cancel();
        assert_eq!(flow.step(), OnboardingStep::Cancelled);
        assert_eq!(flow.pending().count(), 0);
    }
}
