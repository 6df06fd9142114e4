//! Embedding index for nearest-neighbor fact lookup.
//!
//! SQLite for rows and metadata, brute-force cosine similarity for search.
//! Query embeddings are produced by the model provider; this index never
//! talks to the network.

use std::path::PathBuf;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::metrics::{MetricFact, Topic};
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

/// A fact plus the text its stored embedding was computed from.
#[derive(Debug, Clone)]
pub struct IndexedFact {
    pub company: String,
    pub topic: Topic,
    pub is_metric: bool,
    pub value: String,
    pub description: String,
}

#[derive(Clone)]
pub struct VectorIndex {
    pool: SqlitePool,
}

impl VectorIndex {
    pub async fn new(paths: &AppPaths) -> Result<Self, ApiError> {
        Self::with_path(paths.data_dir.join("esg_index.db")).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let index = Self { pool };
        index.init_schema().await?;
        Ok(index)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS fact_embeddings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company TEXT NOT NULL,
                topic TEXT NOT NULL,
                is_metric INTEGER NOT NULL DEFAULT 1,
                value TEXT NOT NULL,
                description TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_embeddings_company_topic
             ON fact_embeddings(company, topic)",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    pub async fn insert(&self, fact: &IndexedFact, embedding: &[f32]) -> Result<(), ApiError> {
        let blob = Self::serialize_embedding(embedding);

        sqlx::query(
            "INSERT INTO fact_embeddings (company, topic, is_metric, value, description, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&fact.company)
        .bind(fact.topic.code())
        .bind(fact.is_metric)
        .bind(&fact.value)
        .bind(&fact.description)
        .bind(&blob)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    pub async fn insert_batch(&self, items: &[(IndexedFact, Vec<f32>)]) -> Result<(), ApiError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for (fact, embedding) in items {
            let blob = Self::serialize_embedding(embedding);
            sqlx::query(
                "INSERT INTO fact_embeddings (company, topic, is_metric, value, description, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&fact.company)
            .bind(fact.topic.code())
            .bind(fact.is_metric)
            .bind(&fact.value)
            .bind(&fact.description)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    /// The single best-scoring fact for the filtered (company, topic) set.
    ///
    /// Errors with `NotFound` when no indexed fact matches the filter, so
    /// callers must decide how absence degrades.
    pub async fn closest_fact(
        &self,
        company: &str,
        topic: Topic,
        query_embedding: &[f32],
    ) -> Result<MetricFact, ApiError> {
        let rows = sqlx::query(
            "SELECT value, description, embedding FROM fact_embeddings
             WHERE company = ?1 AND topic = ?2 AND is_metric = 1",
        )
        .bind(company)
        .bind(topic.code())
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        if rows.is_empty() {
            return Err(ApiError::NotFound(format!(
                "no indexed facts for company '{}' topic '{}'",
                company,
                topic.code()
            )));
        }

        let mut best: Option<(f32, MetricFact)> = None;
        for row in &rows {
            let bytes: Vec<u8> = row.get("embedding");
            let stored = Self::deserialize_embedding(&bytes);
            let score = Self::cosine_similarity(query_embedding, &stored);

            let fact = MetricFact {
                value: row.get("value"),
                description: row.get("description"),
            };

            let improves = match &best {
                Some((top, _)) => score > *top,
                None => true,
            };
            if improves {
                best = Some((score, fact));
            }
        }

        best.map(|(_, fact)| fact)
            .ok_or_else(|| ApiError::internal("candidate set drained during ranking"))
    }

    pub async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fact_embeddings")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(count as usize)
    }
}
