pub mod memory;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::{ObrasError, Result};
use crate::models::{Category, Entry, Item, NewEntry, NewProject, Project};

pub use memory::MemoryStore;

/// Which entries to fetch. Empty filter means everything.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub project_id: Option<i32>,
    pub category: Option<Category>,
}

impl EntryFilter {
    pub fn project(project_id: i32) -> Self {
        Self {
            project_id: Some(project_id),
            category: None,
        }
    }

    pub fn category(category: Category) -> Self {
        Self {
            project_id: None,
            category: Some(category),
        }
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        self.project_id.is_none_or(|id| entry.project_id == id)
            && self.category.is_none_or(|c| entry.category == c)
    }
}

/// The remote relational store holding projects and their ledger entries.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>>;

    async fn find_project_by_name(&self, name: &str) -> Result<Option<Project>>;

    /// Fails with `DuplicateProject` when the name is taken.
    async fn insert_project(&self, project: &NewProject) -> Result<Project>;

    /// Inserts entries whose dedup key is new; returns only the rows written.
    async fn upsert_entries(&self, entries: &[NewEntry]) -> Result<Vec<Entry>>;

    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>>;
}

/// Database connection pool
pub struct Database {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: i64,
    project_id: i32,
    date: NaiveDate,
    detail: Option<String>,
    category: String,
    amount: BigDecimal,
    description: String,
    quantity: Option<BigDecimal>,
    items: Option<Json<Vec<Item>>>,
}

impl TryFrom<EntryRow> for Entry {
    type Error = ObrasError;

    fn try_from(row: EntryRow) -> Result<Self> {
        let category = Category::parse(&row.category).ok_or_else(|| {
            ObrasError::Write(format!(
                "entry {} has unknown category '{}'",
                row.id, row.category
            ))
        })?;

        Ok(Entry {
            id: row.id,
            project_id: row.project_id,
            date: row.date,
            detail: row.detail,
            category,
            amount: row.amount,
            description: row.description,
            quantity: row.quantity,
            items: row.items.map(|json| json.0),
        })
    }
}

const PROJECT_COLUMNS: &str =
    "id, name, address, client_name, client_tax_id, budget, start_date, end_date";

const ENTRY_COLUMNS: &str =
    "id, project_id, date, detail, category, amount, description, quantity, items";

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(config.database_url())
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for Database {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY name ASC"
        ))
        .fetch_all(self.get_pool())
        .await?;

        Ok(projects)
    }

    async fn find_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(project)
    }

    #[instrument(skip(self, project), fields(name = %project.name))]
    async fn insert_project(&self, project: &NewProject) -> Result<Project> {
        let created = sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects (name, address, client_name, client_tax_id, budget, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(&project.name)
        .bind(&project.address)
        .bind(&project.client_name)
        .bind(&project.client_tax_id)
        .bind(&project.budget)
        .bind(project.start_date)
        .bind(project.end_date)
        .fetch_one(self.get_pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                ObrasError::DuplicateProject(project.name.clone())
            }
            _ => ObrasError::from(e),
        })?;

        info!(project_id = created.id, "Project created");

        Ok(created)
    }

    #[instrument(skip(self, entries), fields(submitted = entries.len()))]
    async fn upsert_entries(&self, entries: &[NewEntry]) -> Result<Vec<Entry>> {
        // One transaction so a failure never leaves half a batch behind
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(entries.len());

        for entry in entries {
            let row = sqlx::query_as::<_, EntryRow>(&format!(
                r#"
                INSERT INTO entries (project_id, date, detail, category, amount, description, quantity, items)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT ON CONSTRAINT entries_dedup_key DO NOTHING
                RETURNING {ENTRY_COLUMNS}
                "#
            ))
            .bind(entry.project_id)
            .bind(entry.date)
            .bind(&entry.detail)
            .bind(entry.category.as_str())
            .bind(&entry.amount)
            .bind(&entry.description)
            .bind(&entry.quantity)
            .bind(entry.items.as_ref().map(Json))
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(row) = row {
                inserted.push(Entry::try_from(row)?);
            }
        }

        tx.commit().await?;

        if inserted.len() < entries.len() {
            warn!(
                skipped = entries.len() - inserted.len(),
                "Duplicate entries skipped"
            );
        }

        Ok(inserted)
    }

    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM entries
            WHERE ($1::int IS NULL OR project_id = $1)
              AND ($2::text IS NULL OR category = $2)
            ORDER BY date ASC, id ASC
            "#
        ))
        .bind(filter.project_id)
        .bind(filter.category.map(|c| c.as_str()))
        .fetch_all(self.get_pool())
        .await?;

        rows.into_iter().map(Entry::try_from).collect()
    }
}

/// Initialize the database connection pool and apply pending migrations
pub async fn init(config: &Config) -> anyhow::Result<Database> {
    let db = Database::new(config).await?;

    sqlx::migrate!().run(db.get_pool()).await?;
    info!("Database migrations applied");

    Ok(db)
}
