//! Storage backends.
//!
//! Defines the `Storage` capability trait and provides implementations for:
//! - MemoryStore — in-process maps, used by tests and single-node deployments
//! - PersistentStore — SQLite via sqlx, survives restarts
//!
//! The backend is selected once from configuration; callers hold a
//! `Arc<dyn Storage>` and never branch on the concrete type.

pub mod memory;
pub mod persistent;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{ModelWeight, PredictionOutcome, RecalError};

/// Abstraction over outcome history and weight persistence.
///
/// `fetch_outcomes` is the engine's only view of settled predictions; the
/// engine never mutates outcome rows. Weight saves are whole-set
/// replacements so readers restored at startup never see a torn mix of
/// two recalibration runs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Storage: Send + Sync {
    /// All predictions for one algorithm made at or after `since`,
    /// pending rows included. An empty result is valid (no signal).
    async fn fetch_outcomes(
        &self,
        algorithm_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PredictionOutcome>, RecalError>;

    /// Append one prediction row (ingestion side; unused by the engine
    /// itself).
    async fn record_outcome(&self, outcome: &PredictionOutcome) -> Result<(), RecalError>;

    /// The persisted control state from the previous run, if any.
    async fn load_weights(&self) -> Result<Vec<ModelWeight>, RecalError>;

    /// Replace the full weight set in a single transaction.
    async fn save_weights(&self, weights: &[ModelWeight]) -> Result<(), RecalError>;

    /// Backend name for logging and identification.
    fn name(&self) -> &str;
}
