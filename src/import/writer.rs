use tracing::info;

use crate::db::LedgerStore;
use crate::error::Result;
use crate::models::NewEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Nothing,
    AllNew,
    SomeDuplicates,
    AllDuplicates,
}

/// How many of the submitted entries were actually new.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    pub submitted: usize,
    pub inserted: usize,
}

impl WriteReport {
    pub fn skipped(&self) -> usize {
        self.submitted - self.inserted
    }

    pub fn outcome(&self) -> WriteOutcome {
        if self.submitted == 0 {
            WriteOutcome::Nothing
        } else if self.inserted == 0 {
            WriteOutcome::AllDuplicates
        } else if self.inserted < self.submitted {
            WriteOutcome::SomeDuplicates
        } else {
            WriteOutcome::AllNew
        }
    }

    pub fn message(&self) -> String {
        match self.outcome() {
            WriteOutcome::Nothing => "Nothing to save.".to_string(),
            WriteOutcome::AllNew => format!("{} entries saved.", self.inserted),
            WriteOutcome::SomeDuplicates => format!(
                "{} new entries saved, {} duplicates ignored.",
                self.inserted,
                self.skipped()
            ),
            WriteOutcome::AllDuplicates => {
                "Nothing new: every entry was already in the ledger.".to_string()
            }
        }
    }
}

/// Writes entries, skipping the ones whose dedup key already exists.
pub async fn write_entries(store: &dyn LedgerStore, entries: &[NewEntry]) -> Result<WriteReport> {
    if entries.is_empty() {
        return Ok(WriteReport {
            submitted: 0,
            inserted: 0,
        });
    }

    let inserted = store.upsert_entries(entries).await?;
    let report = WriteReport {
        submitted: entries.len(),
        inserted: inserted.len(),
    };

    info!(
        submitted = report.submitted,
        inserted = report.inserted,
        "Entries written"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    use super::*;
    use crate::db::MemoryStore;
    use crate::error::ObrasError;
    use crate::models::Category;

    fn entry(description: &str) -> NewEntry {
        NewEntry {
            project_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            detail: Some("PIX".to_string()),
            category: Category::Labor,
            amount: BigDecimal::from(300),
            description: description.to_string(),
            quantity: None,
            items: None,
        }
    }

    #[tokio::test]
    async fn second_submission_inserts_nothing() {
        let store = MemoryStore::new();
        let batch = vec![entry("pedreiro"), entry("servente")];

        let first = write_entries(&store, &batch).await.unwrap();
        assert_eq!(first.outcome(), WriteOutcome::AllNew);
        assert_eq!(first.inserted, 2);

        let second = write_entries(&store, &batch).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.outcome(), WriteOutcome::AllDuplicates);
        assert_eq!(store.entry_count().await, 2);
    }

    #[tokio::test]
    async fn partial_duplicates_are_counted() {
        let store = MemoryStore::new();
        write_entries(&store, &[entry("pedreiro")]).await.unwrap();

        let report = write_entries(&store, &[entry("pedreiro"), entry("eletricista")])
            .await
            .unwrap();
        assert_eq!(report.outcome(), WriteOutcome::SomeDuplicates);
        assert_eq!(report.skipped(), 1);
    }

    #[tokio::test]
    async fn backend_failure_is_a_write_error() {
        let store = MemoryStore::new();
        store.set_offline(true);

        let err = write_entries(&store, &[entry("pedreiro")]).await.unwrap_err();
        assert!(matches!(err, ObrasError::Write(_)));
    }

    #[test]
    fn empty_report_is_nothing() {
        let report = WriteReport {
            submitted: 0,
            inserted: 0,
        };
        assert_eq!(report.outcome(), WriteOutcome::Nothing);
    }
}
