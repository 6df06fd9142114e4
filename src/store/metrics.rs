//! Metric record storage.
//!
//! SQLite-backed store of company ESG facts. Records are immutable and
//! externally sourced (seed file or batch ingestion); queries are filtered
//! lookups biased toward the shortest, highest-signal descriptions.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

/// ESG report pillar. Stored as its single-letter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "E")]
    Environmental,
    #[serde(rename = "S")]
    Social,
    #[serde(rename = "G")]
    Governance,
}

impl Topic {
    pub fn code(&self) -> &'static str {
        match self {
            Topic::Environmental => "E",
            Topic::Social => "S",
            Topic::Governance => "G",
        }
    }

    /// Parse from a single-letter code or a category name ("Environmental").
    pub fn parse(input: &str) -> Option<Topic> {
        match input.trim().chars().next()?.to_ascii_uppercase() {
            'E' => Some(Topic::Environmental),
            'S' => Some(Topic::Social),
            'G' => Some(Topic::Governance),
            _ => None,
        }
    }
}

/// A structured fact about a company's ESG performance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRecord {
    pub company: String,
    pub topic: Topic,
    /// Searchable tag text, matched by case-insensitive substring.
    pub tags: String,
    /// Distinguishes quantifiable facts from narrative text.
    pub is_metric: bool,
    pub value: String,
    pub description: String,
}

/// The value/description pair returned by retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFact {
    pub value: String,
    pub description: String,
}

#[derive(Clone)]
pub struct MetricStore {
    pool: SqlitePool,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl MetricStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, ApiError> {
        Self::with_path(paths.db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS metric_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company TEXT NOT NULL,
                topic TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '',
                is_metric INTEGER NOT NULL DEFAULT 1,
                value TEXT NOT NULL,
                description TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_metric_company_topic
             ON metric_records(company, topic)",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    /// The two shortest matching facts for a (company, topic, phrase) cell.
    ///
    /// Matches rows whose tags contain `phrase` case-insensitively and that
    /// are flagged as metrics. Ordered by description length (code points)
    /// ascending; ties break on insertion order. Empty result is not an
    /// error.
    pub async fn get_metrics(
        &self,
        company: &str,
        topic: Topic,
        phrase: &str,
    ) -> Result<Vec<MetricFact>, ApiError> {
        if phrase.trim().is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT value, description FROM metric_records
             WHERE company = ?1
               AND topic = ?2
               AND is_metric = 1
               AND instr(lower(tags), lower(?3)) > 0
             ORDER BY length(description) ASC, id ASC
             LIMIT 2",
        )
        .bind(company)
        .bind(topic.code())
        .bind(phrase.trim())
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows
            .iter()
            .map(|row| MetricFact {
                value: row.get("value"),
                description: row.get("description"),
            })
            .collect())
    }

    /// All distinct company names, sorted.
    pub async fn distinct_companies(&self) -> Result<Vec<String>, ApiError> {
        let rows = sqlx::query("SELECT DISTINCT company FROM metric_records ORDER BY company")
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(rows.iter().map(|row| row.get("company")).collect())
    }

    pub async fn insert(&self, record: &MetricRecord) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO metric_records (company, topic, tags, is_metric, value, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&record.company)
        .bind(record.topic.code())
        .bind(&record.tags)
        .bind(record.is_metric)
        .bind(&record.value)
        .bind(&record.description)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    pub async fn insert_batch(&self, records: &[MetricRecord]) -> Result<(), ApiError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for record in records {
            sqlx::query(
                "INSERT INTO metric_records (company, topic, tags, is_metric, value, description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&record.company)
            .bind(record.topic.code())
            .bind(&record.tags)
            .bind(record.is_metric)
            .bind(&record.value)
            .bind(&record.description)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    pub async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM metric_records")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(count as usize)
    }

    /// Load records from a JSON seed file on first start. No-op when the
    /// store already holds data or the file is absent.
    pub async fn seed_from_file(&self, path: &Path) -> Result<usize, ApiError> {
        if self.count().await? > 0 {
            return Ok(0);
        }
        if !path.exists() {
            tracing::warn!("Seed file not found: {}", path.display());
            return Ok(0);
        }

        let contents = std::fs::read_to_string(path).map_err(ApiError::internal)?;
        let records: Vec<MetricRecord> = serde_json::from_str(&contents)
            .map_err(|e| ApiError::BadRequest(format!("invalid seed file: {}", e)))?;

        self.insert_batch(&records).await?;
        tracing::info!("Seeded {} metric records from {}", records.len(), path.display());
        Ok(records.len())
    }
}
