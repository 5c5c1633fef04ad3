//! Weight registry — the shared control state.
//!
//! Holds the current `ModelWeight` set, the latest `RecalibrationResult`
//! snapshot, and the append-only action audit log. Writers publish a whole
//! new set under one lock; readers (`trust`, dashboard) always observe a
//! fully consistent prior or current set, never an interleaved one.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::types::{Action, ModelWeight, RecalibrationResult, TrustInfo};

struct Inner {
    weights: BTreeMap<String, ModelWeight>,
    latest: Option<Arc<RecalibrationResult>>,
    /// Monotonic publish counter; 0 means no recalibration has completed.
    version: u64,
}

/// Snapshot-read / atomic-swap store for per-algorithm control state.
pub struct WeightRegistry {
    roster: Vec<String>,
    inner: RwLock<Inner>,
    audit: RwLock<Vec<Action>>,
}

impl WeightRegistry {
    /// Create a registry for the configured algorithm roster, optionally
    /// seeded with weights restored from storage.
    pub fn new(roster: Vec<String>, restored: Vec<ModelWeight>) -> Self {
        let weights = restored
            .into_iter()
            .filter(|w| roster.iter().any(|a| a == &w.algorithm_id))
            .map(|w| (w.algorithm_id.clone(), w))
            .collect();
        Self {
            roster,
            inner: RwLock::new(Inner {
                weights,
                latest: None,
                version: 0,
            }),
            audit: RwLock::new(Vec::new()),
        }
    }

    /// The configured algorithm ids, in config order.
    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    /// Current weight records keyed by algorithm id. Algorithms with no
    /// record yet (cold start) get a neutral equal-split entry so the
    /// adjuster always has a prior to rate-limit against.
    pub fn current_weights(&self) -> BTreeMap<String, ModelWeight> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut out = inner.weights.clone();
        for algo in &self.roster {
            out.entry(algo.clone())
                .or_insert_with(|| ModelWeight::neutral(algo, self.roster.len()));
        }
        out
    }

    /// Atomically replace the weight set and snapshot, appending the tick's
    /// actions to the audit log. One writer per tick by construction.
    pub fn publish(
        &self,
        weights: Vec<ModelWeight>,
        snapshot: RecalibrationResult,
        actions: Vec<Action>,
    ) {
        {
            let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
            inner.weights = weights
                .into_iter()
                .map(|w| (w.algorithm_id.clone(), w))
                .collect();
            inner.latest = Some(Arc::new(snapshot));
            inner.version += 1;
        }
        let mut audit = self.audit.write().unwrap_or_else(|e| e.into_inner());
        audit.extend(actions);
    }

    /// The latest published snapshot, if any tick has completed.
    pub fn latest_recalibration(&self) -> Option<Arc<RecalibrationResult>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.latest.clone()
    }

    /// Number of successful publishes so far.
    pub fn version(&self) -> u64 {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.version
    }

    /// TrustQuery: current trust state for one algorithm. Before the first
    /// successful recalibration (or for an unknown id) this degrades to the
    /// neutral equal-split default rather than an error.
    pub fn trust(&self, algorithm_id: &str) -> TrustInfo {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        if inner.version == 0 {
            return TrustInfo::neutral(self.roster.len());
        }
        match inner.weights.get(algorithm_id) {
            Some(w) => {
                let health = inner
                    .latest
                    .as_deref()
                    .and_then(|r| r.health_scores.get(algorithm_id).copied());
                TrustInfo {
                    trusted: !w.is_paused,
                    weight: w.adjusted_weight,
                    confidence_multiplier: w.confidence_multiplier,
                    min_confidence: w.min_confidence_threshold,
                    health_score: health,
                }
            }
            None => TrustInfo::neutral(self.roster.len()),
        }
    }

    /// Full audit log, oldest first.
    pub fn actions(&self) -> Vec<Action> {
        let audit = self.audit.read().unwrap_or_else(|e| e.into_inner());
        audit.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, ActionType};
    use chrono::Utc;

    fn roster() -> Vec<String> {
        vec!["elo".to_string(), "form".to_string(), "poisson".to_string()]
    }

    fn snapshot(weights: Vec<ModelWeight>) -> RecalibrationResult {
        RecalibrationResult {
            timestamp: Utc::now(),
            window_days: 7,
            algorithm_performance: vec![],
            model_weights: weights,
            health_scores: BTreeMap::new(),
            overall_health_score: 70,
            recommendations: vec![],
            actions_taken: vec![],
        }
    }

    #[test]
    fn test_cold_start_neutral_trust() {
        let reg = WeightRegistry::new(roster(), vec![]);
        let t = reg.trust("elo");
        assert!(t.trusted);
        assert!((t.weight - 1.0 / 3.0).abs() < 1e-10);
        assert!((t.confidence_multiplier - 1.0).abs() < 1e-10);
        assert!(t.health_score.is_none());
        assert!(reg.latest_recalibration().is_none());
        assert_eq!(reg.version(), 0);
    }

    #[test]
    fn test_current_weights_fills_missing_with_neutral() {
        let reg = WeightRegistry::new(roster(), vec![ModelWeight::neutral("elo", 3)]);
        let weights = reg.current_weights();
        assert_eq!(weights.len(), 3);
        assert!(weights.contains_key("poisson"));
    }

    #[test]
    fn test_restored_weights_outside_roster_dropped() {
        let reg = WeightRegistry::new(roster(), vec![ModelWeight::neutral("retired_algo", 4)]);
        let weights = reg.current_weights();
        assert!(!weights.contains_key("retired_algo"));
        assert_eq!(weights.len(), 3);
    }

    #[test]
    fn test_publish_swaps_and_bumps_version() {
        let reg = WeightRegistry::new(roster(), vec![]);
        let mut w = ModelWeight::neutral("elo", 3);
        w.adjusted_weight = 0.5;
        w.is_paused = false;
        let all = vec![
            w,
            ModelWeight::neutral("form", 3),
            ModelWeight::neutral("poisson", 3),
        ];
        reg.publish(all.clone(), snapshot(all), vec![]);

        assert_eq!(reg.version(), 1);
        let t = reg.trust("elo");
        assert!((t.weight - 0.5).abs() < 1e-10);
        assert!(reg.latest_recalibration().is_some());
    }

    #[test]
    fn test_trust_paused_algorithm() {
        let reg = WeightRegistry::new(roster(), vec![]);
        let mut w = ModelWeight::neutral("elo", 3);
        w.is_paused = true;
        w.adjusted_weight = 0.0;
        let all = vec![
            w,
            ModelWeight::neutral("form", 3),
            ModelWeight::neutral("poisson", 3),
        ];
        reg.publish(all.clone(), snapshot(all), vec![]);

        let t = reg.trust("elo");
        assert!(!t.trusted);
        assert_eq!(t.weight, 0.0);
    }

    #[test]
    fn test_unknown_algorithm_gets_neutral() {
        let reg = WeightRegistry::new(roster(), vec![]);
        let all = vec![ModelWeight::neutral("elo", 3)];
        reg.publish(all.clone(), snapshot(all), vec![]);
        let t = reg.trust("mystery");
        assert!(t.trusted);
    }

    #[test]
    fn test_audit_log_appends() {
        let reg = WeightRegistry::new(roster(), vec![]);
        let all = vec![ModelWeight::neutral("elo", 3)];
        reg.publish(
            all.clone(),
            snapshot(all.clone()),
            vec![Action::new("elo", ActionType::Paused, "health low".to_string(), 0.3)],
        );
        reg.publish(
            all.clone(),
            snapshot(all),
            vec![Action::new("elo", ActionType::Resumed, "recovered".to_string(), 0.0)],
        );

        let log = reg.actions();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].action_type, ActionType::Paused);
        assert_eq!(log[1].action_type, ActionType::Resumed);
        assert_eq!(reg.version(), 2);
    }
}
