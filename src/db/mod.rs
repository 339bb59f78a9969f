use std::{path::Path, str::FromStr, time::Duration};

use anyhow::Result;
use futures::future::BoxFuture;
use sqlx::{
    query,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
};
use thiserror::Error;

use crate::domain::LogRecord;

pub mod predictions;

#[derive(Debug, Error)]
#[error("failed to persist prediction: {0}")]
pub struct PersistenceError(#[from] sqlx::Error);

pub trait OutcomeLog: Send + Sync {
    fn log_outcome(&self, record: LogRecord) -> BoxFuture<'_, Result<(), PersistenceError>>;
}

pub async fn init_pool(db_path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

async fn create_schema(pool: &SqlitePool) -> Result<()> {
    query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            prediction TEXT NOT NULL CHECK (prediction IN ('spam', 'ham')),
            confidence REAL NOT NULL,
            threshold_used REAL NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}
