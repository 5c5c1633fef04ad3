//! SQLite storage backend.
//!
//! Outcome history and the persisted `ModelWeight` set live in a local
//! SQLite database. Timestamps are stored as RFC3339 TEXT so rows stay
//! readable with plain sqlite3 tooling. Weight saves run as one
//! delete-and-insert transaction — readers restored at startup always see
//! a complete set from a single recalibration run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::info;

use crate::store::Storage;
use crate::types::{ModelWeight, OutcomeStatus, PredictionOutcome, RecalError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS prediction_outcomes (
    algorithm_id  TEXT NOT NULL,
    match_id      TEXT NOT NULL,
    confidence    REAL NOT NULL,
    predicted_at  TEXT NOT NULL,
    status        TEXT NOT NULL,
    PRIMARY KEY (algorithm_id, match_id)
);
CREATE INDEX IF NOT EXISTS idx_outcomes_algo_at
    ON prediction_outcomes (algorithm_id, predicted_at);
CREATE TABLE IF NOT EXISTS model_weights (
    algorithm_id             TEXT PRIMARY KEY,
    base_weight              REAL NOT NULL,
    adjusted_weight          REAL NOT NULL,
    confidence_multiplier    REAL NOT NULL,
    min_confidence_threshold REAL NOT NULL,
    is_paused                INTEGER NOT NULL,
    last_changed_at          TEXT NOT NULL
);
"#;

/// SQLite-backed store.
pub struct PersistentStore {
    pool: SqlitePool,
}

impl PersistentStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub async fn open(path: &str) -> Result<Self, RecalError> {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| RecalError::Storage(format!("open {path}: {e}")))?;

        // raw_sql: the schema is multiple statements
        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| RecalError::Storage(format!("schema: {e}")))?;

        info!(path, "SQLite store ready");
        Ok(Self { pool })
    }

    fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RecalError> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| RecalError::Storage(format!("bad timestamp {raw}: {e}")))
    }
}

#[async_trait]
impl Storage for PersistentStore {
    async fn fetch_outcomes(
        &self,
        algorithm_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PredictionOutcome>, RecalError> {
        let rows = sqlx::query(
            "SELECT algorithm_id, match_id, confidence, predicted_at, status \
             FROM prediction_outcomes \
             WHERE algorithm_id = ?1 AND predicted_at >= ?2 \
             ORDER BY predicted_at DESC",
        )
        .bind(algorithm_id)
        .bind(since.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RecalError::DataUnavailable {
            source_name: "sqlite".to_string(),
            message: e.to_string(),
        })?;

        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_status: String = row
                .try_get("status")
                .map_err(|e| RecalError::Storage(e.to_string()))?;
            let raw_at: String = row
                .try_get("predicted_at")
                .map_err(|e| RecalError::Storage(e.to_string()))?;
            let match_id: String = row
                .try_get("match_id")
                .map_err(|e| RecalError::Storage(e.to_string()))?;

            // A row with an unreadable status is malformed, not a storage
            // outage; the caller skips this algorithm for the tick.
            let status: OutcomeStatus =
                raw_status
                    .parse()
                    .map_err(|_| RecalError::MalformedRecord {
                        algorithm_id: algorithm_id.to_string(),
                        match_id: match_id.clone(),
                        message: format!("unknown status {raw_status}"),
                    })?;

            outcomes.push(PredictionOutcome {
                algorithm_id: row
                    .try_get("algorithm_id")
                    .map_err(|e| RecalError::Storage(e.to_string()))?,
                match_id,
                confidence: row
                    .try_get("confidence")
                    .map_err(|e| RecalError::Storage(e.to_string()))?,
                predicted_at: Self::parse_timestamp(&raw_at)?,
                status,
            });
        }
        Ok(outcomes)
    }

    async fn record_outcome(&self, outcome: &PredictionOutcome) -> Result<(), RecalError> {
        sqlx::query(
            "INSERT OR REPLACE INTO prediction_outcomes \
             (algorithm_id, match_id, confidence, predicted_at, status) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&outcome.algorithm_id)
        .bind(&outcome.match_id)
        .bind(outcome.confidence)
        .bind(outcome.predicted_at.to_rfc3339())
        .bind(outcome.status.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RecalError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn load_weights(&self) -> Result<Vec<ModelWeight>, RecalError> {
        let rows = sqlx::query(
            "SELECT algorithm_id, base_weight, adjusted_weight, confidence_multiplier, \
             min_confidence_threshold, is_paused, last_changed_at \
             FROM model_weights ORDER BY algorithm_id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RecalError::Storage(e.to_string()))?;

        let mut weights = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_at: String = row
                .try_get("last_changed_at")
                .map_err(|e| RecalError::Storage(e.to_string()))?;
            let paused: i64 = row
                .try_get("is_paused")
                .map_err(|e| RecalError::Storage(e.to_string()))?;
            weights.push(ModelWeight {
                algorithm_id: row
                    .try_get("algorithm_id")
                    .map_err(|e| RecalError::Storage(e.to_string()))?,
                base_weight: row
                    .try_get("base_weight")
                    .map_err(|e| RecalError::Storage(e.to_string()))?,
                adjusted_weight: row
                    .try_get("adjusted_weight")
                    .map_err(|e| RecalError::Storage(e.to_string()))?,
                confidence_multiplier: row
                    .try_get("confidence_multiplier")
                    .map_err(|e| RecalError::Storage(e.to_string()))?,
                min_confidence_threshold: row
                    .try_get("min_confidence_threshold")
                    .map_err(|e| RecalError::Storage(e.to_string()))?,
                is_paused: paused != 0,
                last_changed_at: Self::parse_timestamp(&raw_at)?,
            });
        }
        Ok(weights)
    }

    async fn save_weights(&self, weights: &[ModelWeight]) -> Result<(), RecalError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RecalError::Storage(e.to_string()))?;

        sqlx::query("DELETE FROM model_weights")
            .execute(&mut *tx)
            .await
            .map_err(|e| RecalError::Storage(e.to_string()))?;

        for w in weights {
            sqlx::query(
                "INSERT INTO model_weights \
                 (algorithm_id, base_weight, adjusted_weight, confidence_multiplier, \
                  min_confidence_threshold, is_paused, last_changed_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(&w.algorithm_id)
            .bind(w.base_weight)
            .bind(w.adjusted_weight)
            .bind(w.confidence_multiplier)
            .bind(w.min_confidence_threshold)
            .bind(if w.is_paused { 1_i64 } else { 0_i64 })
            .bind(w.last_changed_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| RecalError::Storage(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RecalError::Storage(e.to_string()))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
