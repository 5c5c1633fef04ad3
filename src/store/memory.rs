//! In-memory storage backend.
//!
//! Keeps outcomes and weights in `RwLock`-guarded maps. This is the
//! default backend for tests and for deployments where the platform's
//! main database is the system of record and RECAL only needs a cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::store::Storage;
use crate::types::{ModelWeight, PredictionOutcome, RecalError};

/// In-process store backed by per-algorithm outcome vectors.
#[derive(Default)]
pub struct MemoryStore {
    outcomes: RwLock<HashMap<String, Vec<PredictionOutcome>>>,
    weights: RwLock<Vec<ModelWeight>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-seed outcomes (test and replay helper).
    pub fn seed(&self, outcomes: Vec<PredictionOutcome>) {
        let mut map = self.outcomes.write().unwrap_or_else(|e| e.into_inner());
        for o in outcomes {
            map.entry(o.algorithm_id.clone()).or_default().push(o);
        }
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn fetch_outcomes(
        &self,
        algorithm_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PredictionOutcome>, RecalError> {
        let map = self.outcomes.read().unwrap_or_else(|e| e.into_inner());
        Ok(map
            .get(algorithm_id)
            .map(|rows| {
                rows.iter()
                    .filter(|o| o.predicted_at >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn record_outcome(&self, outcome: &PredictionOutcome) -> Result<(), RecalError> {
        let mut map = self.outcomes.write().unwrap_or_else(|e| e.into_inner());
        map.entry(outcome.algorithm_id.clone())
            .or_default()
            .push(outcome.clone());
        Ok(())
    }

    async fn load_weights(&self) -> Result<Vec<ModelWeight>, RecalError> {
        let weights = self.weights.read().unwrap_or_else(|e| e.into_inner());
        Ok(weights.clone())
    }

    async fn save_weights(&self, weights: &[ModelWeight]) -> Result<(), RecalError> {
        let mut stored = self.weights.write().unwrap_or_else(|e| e.into_inner());
        *stored = weights.to_vec();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutcomeStatus;
    use chrono::Duration;

    fn outcome(algo: &str, match_id: &str, days_ago: i64) -> PredictionOutcome {
        PredictionOutcome {
            algorithm_id: algo.to_string(),
            match_id: match_id.to_string(),
            confidence: 65.0,
            predicted_at: Utc::now() - Duration::days(days_ago),
            status: OutcomeStatus::Won,
        }
    }

    #[tokio::test]
    async fn test_fetch_empty_for_unknown_algorithm() {
        let store = MemoryStore::new();
        let rows = store
            .fetch_outcomes("nope", Utc::now() - Duration::days(30))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_record_and_fetch() {
        let store = MemoryStore::new();
        store.record_outcome(&outcome("elo", "m1", 1)).await.unwrap();
        store.record_outcome(&outcome("elo", "m2", 2)).await.unwrap();
        store.record_outcome(&outcome("form", "m1", 1)).await.unwrap();

        let rows = store
            .fetch_outcomes("elo", Utc::now() - Duration::days(7))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_respects_since() {
        let store = MemoryStore::new();
        store.seed(vec![outcome("elo", "old", 20), outcome("elo", "new", 2)]);

        let rows = store
            .fetch_outcomes("elo", Utc::now() - Duration::days(7))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].match_id, "new");
    }

    #[tokio::test]
    async fn test_weights_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load_weights().await.unwrap().is_empty());

        let weights = vec![
            ModelWeight::neutral("elo", 2),
            ModelWeight::neutral("form", 2),
        ];
        store.save_weights(&weights).await.unwrap();

        let loaded = store.load_weights().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].algorithm_id, "elo");
    }

    #[tokio::test]
    async fn test_save_replaces_whole_set() {
        let store = MemoryStore::new();
        store
            .save_weights(&[
                ModelWeight::neutral("elo", 2),
                ModelWeight::neutral("form", 2),
            ])
            .await
            .unwrap();
        store
            .save_weights(&[ModelWeight::neutral("poisson", 1)])
            .await
            .unwrap();

        let loaded = store.load_weights().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].algorithm_id, "poisson");
    }
}
