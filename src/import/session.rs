use chrono::NaiveDate;
use tracing::{info, warn};

use super::classification::ClassificationGrid;
use super::detailing::{DetailingFlow, DetailingStep};
use super::onboarding::{OnboardingFlow, OnboardingStep};
use super::reconcile::{ProjectIndex, partition};
use super::writer::{WriteReport, write_entries};
use crate::db::LedgerStore;
use crate::error::{ObrasError, Result};
use crate::models::{CandidateRow, Item, Project, ProjectForm, validate_amount};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStep {
    Classify,
    ConfirmOnboarding,
    Onboarding,
    SelectMaterial,
    DetailMaterial,
    Finished,
    Cancelled,
}

/// Everything one statement import needs between user actions.
pub struct ImportSession {
    grid: ClassificationGrid,
    projects: ProjectIndex,
    subcategories: Vec<String>,
    step: ImportStep,
    onboarding: Option<OnboardingFlow>,
    detailing: Option<DetailingFlow>,
    reports: Vec<WriteReport>,
}

impl ImportSession {
    pub fn new(rows: Vec<CandidateRow>, projects: &[Project], subcategories: Vec<String>) -> Self {
        Self {
            grid: ClassificationGrid::new(rows),
            projects: ProjectIndex::from_projects(projects),
            subcategories,
            step: ImportStep::Classify,
            onboarding: None,
            detailing: None,
            reports: Vec::new(),
        }
    }

    pub fn step(&self) -> ImportStep {
        self.step
    }

    pub fn grid(&self) -> &ClassificationGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut ClassificationGrid {
        &mut self.grid
    }

    pub fn onboarding(&self) -> Option<&OnboardingFlow> {
        self.onboarding.as_ref()
    }

    pub fn detailing(&self) -> Option<&DetailingFlow> {
        self.detailing.as_ref()
    }

    pub fn detailing_mut(&mut self) -> Option<&mut DetailingFlow> {
        self.detailing.as_mut()
    }

    pub fn subcategories(&self) -> &[String] {
        &self.subcategories
    }

    pub fn reports(&self) -> &[WriteReport] {
        &self.reports
    }

    pub fn last_report(&self) -> Option<&WriteReport> {
        self.reports.last()
    }

    pub fn total_inserted(&self) -> usize {
        self.reports.iter().map(|r| r.inserted).sum()
    }

    pub fn is_over(&self) -> bool {
        matches!(self.step, ImportStep::Finished | ImportStep::Cancelled)
    }

    pub fn has_submittable_rows(&self) -> bool {
        self.grid.rows().iter().any(CandidateRow::is_complete)
    }

    /// Reconciles the classified rows and writes or defers them.
    pub async fn submit(&mut self, store: &dyn LedgerStore) -> Result<()> {
        if self.step != ImportStep::Classify {
            return Err(ObrasError::validation("This import is not waiting for classification."));
        }

        let rows = self.grid.valid_rows();
        for row in &rows {
            validate_amount(&row.amount).map_err(|err| {
                ObrasError::validation(format!(
                    "{} ({}): {err} Clear its project to leave it out.",
                    row.detail,
                    row.date.format("%d/%m/%Y")
                ))
            })?;
        }

        let split = partition(&rows, &self.projects);
        if split.is_empty() {
            return Err(ObrasError::validation(
                "Fill in project, category and description for at least one row.",
            ));
        }

        if split.is_deferred() {
            let names = split.unknown_project_names();
            info!(unknown = ?names, "Import deferred until projects are registered");
            self.onboarding = Some(OnboardingFlow::new(names));
            self.step = ImportStep::ConfirmOnboarding;
            return Ok(());
        }

        let report = write_entries(store, &split.ready).await?;
        if report.submitted > 0 {
            self.reports.push(report);
        }

        if split.needs_detailing.is_empty() {
            self.step = ImportStep::Finished;
        } else {
            info!(count = split.needs_detailing.len(), "Material entries need detailing");
            self.detailing = Some(DetailingFlow::new(split.needs_detailing));
            self.step = ImportStep::SelectMaterial;
        }

        Ok(())
    }

    pub fn proceed_onboarding(&mut self) -> Result<()> {
        match (&mut self.onboarding, self.step) {
            (Some(flow), ImportStep::ConfirmOnboarding) => {
                flow.proceed();
                self.step = ImportStep::Onboarding;
                Ok(())
            }
            _ => Err(ObrasError::validation("No projects are waiting to be registered.")),
        }
    }

    /// Abandons the import; rows not written yet are discarded.
    pub fn cancel(&mut self) {
        if let Some(flow) = &mut self.onboarding {
            flow.cancel();
        }
        warn!(step = ?self.step, "Import cancelled");
        self.grid.clear();
        self.onboarding = None;
        self.detailing = None;
        self.step = ImportStep::Cancelled;
    }

    pub fn onboarding_form(&self, today: NaiveDate) -> Option<ProjectForm> {
        self.onboarding.as_ref().and_then(|flow| flow.form(today))
    }

    /// Registers the current unknown project. Once the last one exists the
    /// original submission is retried.
    pub async fn submit_project(&mut self, form: &ProjectForm, store: &dyn LedgerStore) -> Result<Project> {
        if self.step != ImportStep::Onboarding {
            return Err(ObrasError::validation("No project is waiting to be registered."));
        }
        let Some(flow) = self.onboarding.as_mut() else {
            return Err(ObrasError::validation("No project is waiting to be registered."));
        };

        let project = flow.submit(form, store).await?;
        self.projects.insert(&project);

        if flow.step() == OnboardingStep::Done {
            self.onboarding = None;
            self.step = ImportStep::Classify;
            self.submit(store).await?;
        }

        Ok(project)
    }

    pub async fn confirm_selection(&mut self, store: &dyn LedgerStore) -> Result<()> {
        if self.step != ImportStep::SelectMaterial {
            return Err(ObrasError::validation("No material selection is pending."));
        }
        let Some(flow) = self.detailing.as_mut() else {
            return Err(ObrasError::validation("No material selection is pending."));
        };

        let report = flow.confirm_selection(store).await?;
        if report.submitted > 0 {
            self.reports.push(report);
        }
        self.step = match flow.step() {
            DetailingStep::Detail => ImportStep::DetailMaterial,
            _ => ImportStep::Finished,
        };

        Ok(())
    }

    pub async fn submit_items(&mut self, items: Vec<Item>, store: &dyn LedgerStore) -> Result<()> {
        if self.step != ImportStep::DetailMaterial {
            return Err(ObrasError::validation("No material entry is waiting for items."));
        }
        let Some(flow) = self.detailing.as_mut() else {
            return Err(ObrasError::validation("No material entry is waiting for items."));
        };

        let report = flow.submit_items(items, &self.subcategories, store).await?;
        self.reports.push(report);
        if flow.step() == DetailingStep::Done {
            self.step = ImportStep::Finished;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::Category;

    fn row(project: &str, category: Option<Category>, description: &str) -> CandidateRow {
        CandidateRow {
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            detail: format!("PIX {description}"),
            amount: BigDecimal::from(120),
            project: project.to_string(),
            category,
            description: description.to_string(),
        }
    }

    #[tokio::test]
    async fn nothing_to_submit_is_a_validation_error() {
        let store = MemoryStore::new();
        let mut session = ImportSession::new(vec![row("", None, "")], &[], vec![]);
        assert!(!session.has_submittable_rows());

        let err = session.submit(&store).await.unwrap_err();
        assert!(matches!(err, ObrasError::Validation(_)));
        assert_eq!(session.step(), ImportStep::Classify);
    }

    #[tokio::test]
    async fn cancelling_onboarding_discards_the_batch() {
        let store = MemoryStore::new();
        let mut session = ImportSession::new(
            vec![row("nova", Some(Category::Labor), "pedreiro")],
            &[],
            vec![],
        );

        session.submit(&store).await.unwrap();
        assert_eq!(session.step(), ImportStep::ConfirmOnboarding);

        session.cancel();
        assert_eq!(session.step(), ImportStep::Cancelled);
        assert!(session.grid().is_empty());
        assert_eq!(store.entry_count().await, 0);
    }

    #[tokio::test]
    async fn write_failure_keeps_the_rows_for_a_retry() {
        let store = MemoryStore::new();
        let project = store
            .insert_project(&crate::models::NewProject {
                name: "ALPHA".to_string(),
                address: "Rua A".to_string(),
                client_name: "Ana".to_string(),
                client_tax_id: "12345678901".to_string(),
                budget: BigDecimal::from(1000),
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
            })
            .await
            .unwrap();

        let mut session = ImportSession::new(
            vec![row("alpha", Some(Category::Other), "taxa")],
            &[project],
            vec![],
        );

        store.set_offline(true);
        let err = session.submit(&store).await.unwrap_err();
        assert!(matches!(err, ObrasError::Write(_)));
        assert_eq!(session.step(), ImportStep::Classify);

        store.set_offline(false);
        session.submit(&store).await.unwrap();
        assert_eq!(session.step(), ImportStep::Finished);
        assert_eq!(session.total_inserted(), 1);
    }
}
