//! SQLite compound warehouse.
//!
//! Serves potency records from a single table:
//!
//! ```sql
//! compounds(drug_name, protein_target, uniprot_id, pubmed_id, potency_ic50, standard_units)
//! ```
//!
//! The pipeline only reads. [`SqliteStructuredStore::insert`] exists for
//! seeding a database in tests and demos.

use async_trait::async_trait;
use neurocite_core::error::RetrievalError;
use neurocite_core::evidence::StructuredFact;
use neurocite_core::retrieval::StructuredStore;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// Structured store backed by a SQLite `compounds` table.
pub struct SqliteStructuredStore {
    pool: SqlitePool,
}

impl SqliteStructuredStore {
    /// Open (or create) the warehouse at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, RetrievalError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| RetrievalError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| RetrievalError::Unreachable(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("Compound warehouse opened at {path}");
        Ok(store)
    }

    /// Create the compounds table and its name index if absent.
    async fn run_migrations(&self) -> Result<(), RetrievalError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS compounds (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                drug_name      TEXT NOT NULL,
                protein_target TEXT NOT NULL,
                uniprot_id     TEXT,
                pubmed_id      TEXT,
                potency_ic50   REAL,
                standard_units TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RetrievalError::Storage(format!("compounds table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_compounds_drug_name ON compounds(drug_name)")
            .execute(&self.pool)
            .await
            .map_err(|e| RetrievalError::Storage(format!("drug_name index: {e}")))?;

        Ok(())
    }

    /// Insert one potency record.
    pub async fn insert(&self, fact: &StructuredFact) -> Result<(), RetrievalError> {
        sqlx::query(
            "INSERT INTO compounds (drug_name, protein_target, uniprot_id, pubmed_id, potency_ic50, standard_units)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&fact.entity)
        .bind(&fact.target)
        .bind(&fact.uniprot_id)
        .bind(&fact.source_pmid)
        .bind(fact.potency)
        .bind(&fact.units)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, RetrievalError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM compounds")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.try_get("n").map_err(map_sqlx_error)
    }
}

/// Connection-level failures are worth retrying; anything else is not.
fn map_sqlx_error(e: sqlx::Error) -> RetrievalError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RetrievalError::Unreachable(e.to_string())
        }
        other => RetrievalError::LookupFailed(other.to_string()),
    }
}

/// Escape LIKE wildcards so a name containing `%` or `_` matches literally.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .to_uppercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn row_to_fact(row: &SqliteRow) -> Result<StructuredFact, RetrievalError> {
    Ok(StructuredFact {
        entity: row.try_get("drug_name").map_err(map_sqlx_error)?,
        target: row.try_get("protein_target").map_err(map_sqlx_error)?,
        potency: row.try_get("potency_ic50").map_err(map_sqlx_error)?,
        units: row.try_get("standard_units").map_err(map_sqlx_error)?,
        uniprot_id: row.try_get("uniprot_id").map_err(map_sqlx_error)?,
        source_pmid: row.try_get("pubmed_id").map_err(map_sqlx_error)?,
    })
}

#[async_trait]
impl StructuredStore for SqliteStructuredStore {
    async fn lookup(&self, query: &str, limit: usize) -> Result<Vec<StructuredFact>, RetrievalError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT drug_name, protein_target, uniprot_id, pubmed_id, potency_ic50, standard_units
            FROM compounds
            WHERE UPPER(drug_name) LIKE ? ESCAPE '\'
            ORDER BY drug_name, id
            LIMIT ?
            "#,
        )
        .bind(like_pattern(query))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let facts = rows.iter().map(row_to_fact).collect::<Result<Vec<_>, _>>()?;
        debug!(query, found = facts.len(), "Compound lookup");
        Ok(facts)
    }
}
