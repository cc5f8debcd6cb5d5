//! Search history: completed analyses, newest first.

use analysis_core::{AnalysisError, AnalysisResult, AnalysisStore};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tokio::sync::RwLock;

fn storage_error(e: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Storage(e.to_string())
}

/// SQLite-backed store writing one row per analysis into `beta_searches`
#[derive(Clone)]
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Connect to `database_url`, creating the file and table if missing
    pub async fn new(database_url: &str) -> Result<Self, AnalysisError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(storage_error)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(storage_error)?;

        Self::with_pool(pool).await
    }

    /// Private in-memory database; a single long-lived connection keeps it alive
    pub async fn in_memory() -> Result<Self, AnalysisError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(storage_error)?;

        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self, AnalysisError> {
        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    async fn init_tables(&self) -> Result<(), AnalysisError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS beta_searches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject_ticker TEXT NOT NULL,
                resolved_symbol TEXT NOT NULL,
                market_index TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                beta REAL NOT NULL,
                peer_count INTEGER NOT NULL,
                result_json TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl AnalysisStore for SqliteHistoryStore {
    async fn save(&self, result: &AnalysisResult) -> Result<(), AnalysisError> {
        let result_json = serde_json::to_string(result).map_err(storage_error)?;

        sqlx::query(
            "INSERT INTO beta_searches (
                subject_ticker, resolved_symbol, market_index, start_date, end_date,
                beta, peer_count, result_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&result.subject_ticker)
        .bind(&result.resolved_symbol)
        .bind(&result.market_index_name)
        .bind(result.start_date.to_string())
        .bind(result.end_date.to_string())
        .bind(result.beta)
        .bind(result.peers.len() as i64)
        .bind(&result_json)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AnalysisResult>, AnalysisError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT result_json FROM beta_searches ORDER BY id DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        rows.into_iter()
            .map(|(json,)| serde_json::from_str(&json).map_err(storage_error))
            .collect()
    }
}

/// Process-local store, used when no database is configured
#[derive(Default)]
pub struct InMemoryHistoryStore {
    results: RwLock<Vec<AnalysisResult>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisStore for InMemoryHistoryStore {
    async fn save(&self, result: &AnalysisResult) -> Result<(), AnalysisError> {
        self.results.write().await.push(result.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AnalysisResult>, AnalysisError> {
        let results = self.results.read().await;
        Ok(results.iter().rev().take(limit).cloned().collect())
    }
}
