//! Recalibration orchestrator.
//!
//! Drives one tick end to end: fetch outcome history, analyze performance
//! windows, score health, adjust weights, persist, publish. A tick that
//! fails at any point leaves the registry's last published snapshot
//! untouched, so consumers always read a coherent (if stale) weight set.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::{CalibrationConfig, EngineConfig};
use crate::engine::{adjuster, analyzer, health};
use crate::engine::adjuster::HealthInput;
use crate::registry::WeightRegistry;
use crate::store::Storage;
use crate::types::{RecalError, RecalibrationResult};

/// Where a tick currently is. Exposed for the dashboard's status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickPhase {
    Idle,
    Fetching,
    Analyzing,
    Adjusting,
    Publishing,
}

impl std::fmt::Display for TickPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TickPhase::Idle => "idle",
            TickPhase::Fetching => "fetching",
            TickPhase::Analyzing => "analyzing",
            TickPhase::Adjusting => "adjusting",
            TickPhase::Publishing => "publishing",
        };
        write!(f, "{s}")
    }
}

/// What a call to `run_tick` did.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    Completed(Arc<RecalibrationResult>),
    /// A previous tick was still running; this call did nothing.
    Skipped,
}

pub struct Orchestrator {
    storage: Arc<dyn Storage>,
    registry: Arc<WeightRegistry>,
    engine: EngineConfig,
    calibration: CalibrationConfig,
    // Held for the duration of a tick; try_lock makes overlap a skip
    // rather than a queue.
    tick_gate: tokio::sync::Mutex<()>,
    phase: std::sync::Mutex<TickPhase>,
}

impl Orchestrator {
    pub fn new(
        storage: Arc<dyn Storage>,
        registry: Arc<WeightRegistry>,
        engine: EngineConfig,
        calibration: CalibrationConfig,
    ) -> Self {
        Self {
            storage,
            registry,
            engine,
            calibration,
            tick_gate: tokio::sync::Mutex::new(()),
            phase: std::sync::Mutex::new(TickPhase::Idle),
        }
    }

    pub fn phase(&self) -> TickPhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, phase: TickPhase) {
        debug!(%phase, "Tick phase");
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = phase;
    }

    /// Run one recalibration tick, bounded by the configured time budget.
    /// Returns `Skipped` without touching anything if a tick is already
    /// in flight.
    ///
    /// Only the fetch/analyze/adjust work runs under the budget; the
    /// persist-and-publish commit happens after the timeout is resolved,
    /// so an expiry can never leave the stored weights a step ahead of
    /// the published snapshot.
    pub async fn run_tick(&self) -> Result<TickOutcome, RecalError> {
        let _guard = match self.tick_gate.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("Previous tick still running, skipping this interval");
                return Ok(TickOutcome::Skipped);
            }
        };

        let budget = Duration::from_secs(self.engine.tick_budget_secs);
        let outcome = match timeout(budget, self.prepare_tick()).await {
            Ok(Ok(prepared)) => self.commit(prepared).await.map(TickOutcome::Completed),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RecalError::TickCancelled(format!(
                "tick exceeded the {}s budget",
                self.engine.tick_budget_secs
            ))),
        };
        self.set_phase(TickPhase::Idle);
        outcome
    }

    async fn prepare_tick(&self) -> Result<PreparedTick, RecalError> {
        let started = std::time::Instant::now();
        let now = Utc::now();
        let since = now - ChronoDuration::days(self.calibration.long_term_days as i64);
        let fetch_budget = Duration::from_secs(self.engine.fetch_timeout_secs);

        // Fetch. One slow or broken source costs that algorithm its
        // evidence for this tick, never the whole tick.
        self.set_phase(TickPhase::Fetching);
        let roster: Vec<String> = self.registry.roster().to_vec();
        let mut fetched: Vec<(String, Vec<crate::types::PredictionOutcome>)> = Vec::new();
        for algo in &roster {
            match timeout(fetch_budget, self.storage.fetch_outcomes(algo, since)).await {
                Ok(Ok(rows)) => {
                    let (valid, rejected): (Vec<_>, Vec<_>) =
                        rows.into_iter().partition(|r| r.is_valid());
                    if !rejected.is_empty() {
                        warn!(
                            algorithm = %algo,
                            rejected = rejected.len(),
                            "Dropped malformed outcome rows"
                        );
                    }
                    fetched.push((algo.clone(), valid));
                }
                Ok(Err(e)) => {
                    warn!(algorithm = %algo, error = %e, "Outcome fetch failed, skipping algorithm");
                }
                Err(_) => {
                    warn!(
                        algorithm = %algo,
                        timeout_secs = self.engine.fetch_timeout_secs,
                        "Outcome fetch timed out, skipping algorithm"
                    );
                }
            }
        }

        // A successful fetch with zero rows is evidence (of nothing); a tick
        // where every fetch failed has nothing to publish.
        if fetched.is_empty() && !roster.is_empty() {
            return Err(RecalError::DataUnavailable {
                source_name: self.storage.name().to_string(),
                message: "all outcome fetches failed".to_string(),
            });
        }

        // Analyze and score.
        self.set_phase(TickPhase::Analyzing);
        let cal = &self.calibration;
        let mut inputs: Vec<HealthInput> = Vec::with_capacity(fetched.len());
        let mut recommendations: Vec<String> = Vec::new();
        for (algo, outcomes) in &fetched {
            let short = analyzer::analyze(algo, outcomes, cal.short_term_days, now);
            let medium = analyzer::analyze(algo, outcomes, cal.medium_term_days, now);
            let long = analyzer::analyze(algo, outcomes, cal.long_term_days, now);
            let short_score = health::score(&short, cal);

            if short_score >= cal.boost_health_threshold
                && short.has_sufficient_sample(cal.min_sample_size)
            {
                recommendations.push(format!(
                    "{algo}: short-term health {short_score}, candidate for a larger share"
                ));
            }
            if let Some(streak) = short.streak {
                if streak.kind == crate::types::StreakKind::Loss && streak.length >= 5 {
                    recommendations.push(format!(
                        "{algo}: on a {streak} run, watch the next recalibration closely"
                    ));
                }
            }
            if let (Some(mid_wr), Some(long_wr)) = (medium.win_rate, long.win_rate) {
                if long.has_sufficient_sample(cal.min_sample_size) && mid_wr + 0.10 < long_wr {
                    recommendations.push(format!(
                        "{algo}: {}d win rate {:.0}% trails the {}d rate {:.0}%, possible drift",
                        cal.medium_term_days,
                        mid_wr * 100.0,
                        cal.long_term_days,
                        long_wr * 100.0
                    ));
                }
            }

            inputs.push(HealthInput {
                algorithm_id: algo.clone(),
                short_score,
                short_window: short,
                medium_window: medium,
            });
        }

        // Adjust.
        self.set_phase(TickPhase::Adjusting);
        let priors = self.registry.current_weights();
        let adjustment = adjuster::adjust(&inputs, &priors, cal);
        for w in adjustment.weights.iter().filter(|w| w.is_paused) {
            recommendations.push(format!("{}: paused pending recovery", w.algorithm_id));
        }

        let health_scores: std::collections::BTreeMap<String, u8> = inputs
            .iter()
            .map(|i| (i.algorithm_id.clone(), i.short_score))
            .collect();
        let overall = overall_health(&adjustment.weights, &health_scores);
        let snapshot = RecalibrationResult {
            timestamp: now,
            window_days: cal.short_term_days,
            algorithm_performance: inputs.iter().map(|i| i.short_window.clone()).collect(),
            model_weights: adjustment.weights.clone(),
            health_scores,
            overall_health_score: overall,
            recommendations,
            actions_taken: adjustment.actions.clone(),
        };

        Ok(PreparedTick {
            started,
            roster_size: roster.len(),
            adjustment,
            snapshot,
        })
    }

    /// Persist, then publish, as one uninterruptible step. A storage
    /// failure aborts before the publish, leaving the registry on its
    /// previous snapshot; the tick budget no longer applies here, so the
    /// two stores cannot be split by a cancellation.
    async fn commit(&self, prepared: PreparedTick) -> Result<Arc<RecalibrationResult>, RecalError> {
        self.set_phase(TickPhase::Publishing);
        self.storage.save_weights(&prepared.adjustment.weights).await?;

        let published = Arc::new(prepared.snapshot.clone());
        self.registry.publish(
            prepared.adjustment.weights,
            prepared.snapshot,
            prepared.adjustment.actions,
        );

        info!(
            algorithms = prepared.roster_size,
            scored = published.health_scores.len(),
            overall_health = published.overall_health_score,
            version = self.registry.version(),
            elapsed_ms = prepared.started.elapsed().as_millis() as u64,
            "Recalibration tick complete"
        );
        Ok(published)
    }
}

/// Everything a finished analysis pass hands to the commit step.
struct PreparedTick {
    started: std::time::Instant,
    roster_size: usize,
    adjustment: adjuster::Adjustment,
    snapshot: RecalibrationResult,
}

/// Ensemble health: weight-averaged per-algorithm scores. Neutral 50 when
/// nothing was scored this tick.
fn overall_health(
    weights: &[crate::types::ModelWeight],
    scores: &std::collections::BTreeMap<String, u8>,
) -> u8 {
    let mut total_weight = 0.0;
    let mut acc = 0.0;
    for w in weights.iter().filter(|w| !w.is_paused) {
        if let Some(score) = scores.get(&w.algorithm_id) {
            total_weight += w.adjusted_weight;
            acc += w.adjusted_weight * *score as f64;
        }
    }
    if total_weight > 0.0 {
        return (acc / total_weight).round().clamp(0.0, 100.0) as u8;
    }
    // All paused or nothing scored: plain mean of whatever we have
    if scores.is_empty() {
        return 50;
    }
    let mean = scores.values().map(|&s| s as f64).sum::<f64>() / scores.len() as f64;
    mean.round().clamp(0.0, 100.0) as u8
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
