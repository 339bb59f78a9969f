use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use sqlx::{
    query, query_as,
    sqlite::{SqlitePool, SqliteRow},
    FromRow, Row,
};

use crate::domain::{Label, LogRecord};

use super::{OutcomeLog, PersistenceError};

#[derive(Clone)]
pub struct PredictionRepository {
    pool: SqlitePool,
}

impl PredictionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn append(&self, record: &LogRecord) -> Result<i64, PersistenceError> {
        let id = query(
            r#"INSERT INTO messages (content, prediction, confidence, threshold_used, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(record.content())
        .bind(record.prediction().as_str())
        .bind(record.confidence())
        .bind(record.threshold_used())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    pub async fn recent(&self, limit: u32) -> Result<Vec<PredictionRow>, PersistenceError> {
        let rows = query_as::<_, PredictionRow>(
            r#"SELECT id, content, prediction, confidence, threshold_used, created_at
                FROM messages ORDER BY id DESC LIMIT ?1"#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

impl OutcomeLog for PredictionRepository {
    fn log_outcome(&self, record: LogRecord) -> BoxFuture<'_, Result<(), PersistenceError>> {
        Box::pin(async move {
            let id = self.append(&record).await?;
            tracing::debug!(target: "db", id, prediction = %record.prediction(), "prediction stored");
            Ok(())
        })
    }
}

#[derive(Debug, Clone)]
pub struct PredictionRow {
    pub id: i64,
    pub content: String,
    pub prediction: Label,
    pub confidence: f64,
    pub threshold_used: f64,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for PredictionRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let raw_label: String = row.try_get("prediction")?;
        let prediction = match raw_label.as_str() {
            "spam" => Label::Spam,
            "ham" => Label::Ham,
            other => {
                return Err(sqlx::Error::ColumnDecode {
                    index: "prediction".to_string(),
                    source: format!("unknown label {other}").into(),
                })
            }
        };
        Ok(Self {
            id: row.try_get("id")?,
            content: row.try_get("content")?,
            prediction,
            confidence: row.try_get("confidence")?,
            threshold_used: row.try_get("threshold_used")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::init_memory_pool,
        domain::{ClassificationResult, Label},
    };

    fn record(content: &str, label: Label, confidence: f64, threshold: f64) -> LogRecord {
        LogRecord::from_result(content, &ClassificationResult::new(label, confidence), threshold)
    }

    #[tokio::test]
    async fn append_then_read_back_newest_first() {
        let repo = PredictionRepository::new(init_memory_pool().await.unwrap());

        let first = repo
            .append(&record("Lunch at noon tomorrow?", Label::Ham, 0.04, 0.6))
            .await
            .unwrap();
        let second = repo
            .append(&record("WINNER!! Claim your prize", Label::Spam, 0.97, 0.5))
            .await
            .unwrap();
        assert!(second > first);

        let rows = repo.recent(10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].content, "WINNER!! Claim your prize");
        assert_eq!(rows[0].prediction, Label::Spam);
        assert_eq!(rows[0].confidence, 0.97);
        assert_eq!(rows[0].threshold_used, 0.5);
        assert_eq!(rows[1].prediction, Label::Ham);

        assert_eq!(repo.recent(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn log_outcome_fails_once_pool_is_closed() {
        let repo = PredictionRepository::new(init_memory_pool().await.unwrap());
        repo.close().await;

        let result = repo
            .log_outcome(record("Lunch at noon tomorrow?", Label::Ham, 0.04, 0.6))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn file_backed_pool_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("predictions.db");
        let repo = PredictionRepository::new(crate::db::init_pool(&db_path).await.unwrap());

        repo.log_outcome(record("Lunch at noon tomorrow?", Label::Ham, 0.04, 0.6))
            .await
            .unwrap();
        assert!(db_path.exists());
        assert_eq!(repo.recent(5).await.unwrap().len(), 1);
        repo.close().await;
    }
}
