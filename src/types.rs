//! Shared types for the RECAL engine.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that store, engine, and
//! dashboard modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Prediction outcomes
// ---------------------------------------------------------------------------

/// Settlement state of a prediction. Immutable once it leaves `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Pending,
    Won,
    Lost,
    /// Stake returned (e.g. a postponed match). Settled, but carries no
    /// binary outcome, so it never enters win-rate or calibration stats.
    Push,
}

impl OutcomeStatus {
    /// Whether the prediction has settled (any status except `Pending`).
    pub fn is_settled(&self) -> bool {
        !matches!(self, OutcomeStatus::Pending)
    }

    /// Whether the prediction settled with a binary win/loss outcome.
    pub fn is_decisive(&self) -> bool {
        matches!(self, OutcomeStatus::Won | OutcomeStatus::Lost)
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Pending => write!(f, "PENDING"),
            OutcomeStatus::Won => write!(f, "WON"),
            OutcomeStatus::Lost => write!(f, "LOST"),
            OutcomeStatus::Push => write!(f, "PUSH"),
        }
    }
}

impl std::str::FromStr for OutcomeStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OutcomeStatus::Pending),
            "won" | "win" => Ok(OutcomeStatus::Won),
            "lost" | "loss" => Ok(OutcomeStatus::Lost),
            "push" | "void" => Ok(OutcomeStatus::Push),
            _ => Err(anyhow::anyhow!("Unknown outcome status: {s}")),
        }
    }
}

/// A single prediction made by one algorithm for one match, together with
/// its eventual settled outcome. Produced by the outcome store; this engine
/// only ever reads these rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub algorithm_id: String,
    pub match_id: String,
    /// Stated confidence at prediction time, 0–100.
    pub confidence: f64,
    pub predicted_at: DateTime<Utc>,
    pub status: OutcomeStatus,
}

impl fmt::Display for PredictionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} conf={:.0}% {} @ {}",
            self.algorithm_id,
            self.match_id,
            self.confidence,
            self.status,
            self.predicted_at.format("%Y-%m-%d %H:%M"),
        )
    }
}

impl PredictionOutcome {
    /// Whether the row is well-formed. Malformed rows are skipped with a
    /// warning rather than aborting a recalibration tick.
    pub fn is_valid(&self) -> bool {
        !self.algorithm_id.is_empty()
            && !self.match_id.is_empty()
            && self.confidence.is_finite()
            && (0.0..=100.0).contains(&self.confidence)
    }

    /// Realized outcome as a probability (1.0 win, 0.0 loss).
    /// None for pending or push rows.
    pub fn realized(&self) -> Option<f64> {
        match self.status {
            OutcomeStatus::Won => Some(1.0),
            OutcomeStatus::Lost => Some(0.0),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Performance windows
// ---------------------------------------------------------------------------

/// Direction of a consecutive same-outcome run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreakKind {
    Win,
    Loss,
}

/// Current consecutive run of same-outcome results, most recent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub kind: StreakKind,
    pub length: u32,
}

impl fmt::Display for Streak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StreakKind::Win => write!(f, "W{}", self.length),
            StreakKind::Loss => write!(f, "L{}", self.length),
        }
    }
}

/// Rolling-window view over one algorithm's settled outcomes.
/// Derived and recomputed every tick; never persisted as ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmPerformanceWindow {
    pub algorithm_id: String,
    pub window_days: u32,
    /// Decisive (won/lost) settled predictions in the window.
    pub sample_size: u32,
    pub wins: u32,
    pub losses: u32,
    /// None when `wins + losses == 0` — no signal, never 0.0.
    pub win_rate: Option<f64>,
    pub avg_confidence: f64,
    /// Mean |confidence/100 − realized outcome|. Lower is better-calibrated.
    pub calibration_error: f64,
    pub streak: Option<Streak>,
}

impl fmt::Display for AlgorithmPerformanceWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wr = match self.win_rate {
            Some(r) => format!("{:.1}%", r * 100.0),
            None => "n/a".to_string(),
        };
        let streak = match self.streak {
            Some(s) => s.to_string(),
            None => "-".to_string(),
        };
        write!(
            f,
            "[{}] {}d n={} W{}/L{} wr={wr} calib_err={:.3} streak={streak}",
            self.algorithm_id,
            self.window_days,
            self.sample_size,
            self.wins,
            self.losses,
            self.calibration_error,
        )
    }
}

impl AlgorithmPerformanceWindow {
    /// An empty window (no settled predictions).
    pub fn empty(algorithm_id: &str, window_days: u32) -> Self {
        Self {
            algorithm_id: algorithm_id.to_string(),
            window_days,
            sample_size: 0,
            wins: 0,
            losses: 0,
            win_rate: None,
            avg_confidence: 0.0,
            calibration_error: 0.0,
            streak: None,
        }
    }

    /// Whether the window holds enough data to act on.
    pub fn has_sufficient_sample(&self, min_sample_size: u32) -> bool {
        self.sample_size >= min_sample_size
    }
}

// ---------------------------------------------------------------------------
// Model weights
// ---------------------------------------------------------------------------

/// Per-algorithm control state. The one entity carried forward between
/// ticks; updates are whole-record replacements, never partial patches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelWeight {
    pub algorithm_id: String,
    /// Configured starting weight before any adjustment.
    pub base_weight: f64,
    /// Current normalized ensemble weight (0 while paused).
    pub adjusted_weight: f64,
    /// Scales the algorithm's stated confidence downstream, 0–1.5.
    pub confidence_multiplier: f64,
    /// Picks below this stated confidence are ignored by the synthesizer.
    pub min_confidence_threshold: f64,
    pub is_paused: bool,
    pub last_changed_at: DateTime<Utc>,
}

impl fmt::Display for ModelWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_paused { "PAUSED" } else { "active" };
        write!(
            f,
            "[{}] w={:.3} mult={:.2} min_conf={:.0} ({state})",
            self.algorithm_id,
            self.adjusted_weight,
            self.confidence_multiplier,
            self.min_confidence_threshold,
        )
    }
}

impl ModelWeight {
    /// Neutral starting record for an algorithm in a roster of `roster_size`.
    pub fn neutral(algorithm_id: &str, roster_size: usize) -> Self {
        let equal = if roster_size == 0 {
            1.0
        } else {
            1.0 / roster_size as f64
        };
        Self {
            algorithm_id: algorithm_id.to_string(),
            base_weight: equal,
            adjusted_weight: equal,
            confidence_multiplier: 1.0,
            min_confidence_threshold: 55.0,
            is_paused: false,
            last_changed_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Actions & snapshots
// ---------------------------------------------------------------------------

/// Kind of control decision taken during a recalibration tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    WeightIncreased,
    WeightDecreased,
    Paused,
    Resumed,
    ConfidenceAdjusted,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::WeightIncreased => write!(f, "weight+"),
            ActionType::WeightDecreased => write!(f, "weight-"),
            ActionType::Paused => write!(f, "paused"),
            ActionType::Resumed => write!(f, "resumed"),
            ActionType::ConfidenceAdjusted => write!(f, "conf-adj"),
        }
    }
}

/// Append-only audit trail entry for one control decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    pub algorithm_id: String,
    pub action_type: ActionType,
    pub reason: String,
    /// Magnitude of the change (weight delta, multiplier delta, …).
    pub magnitude: f64,
    pub at: DateTime<Utc>,
}

impl Action {
    pub fn new(
        algorithm_id: &str,
        action_type: ActionType,
        reason: String,
        magnitude: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            algorithm_id: algorithm_id.to_string(),
            action_type,
            reason,
            magnitude,
            at: Utc::now(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} Δ{:.3}: {}",
            self.algorithm_id, self.action_type, self.magnitude, self.reason,
        )
    }
}

/// Point-in-time snapshot published at the end of a successful tick.
/// Consumers always read the latest snapshot and never mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecalibrationResult {
    pub timestamp: DateTime<Utc>,
    /// The control window length the pause/weight decisions were driven by.
    pub window_days: u32,
    pub algorithm_performance: Vec<AlgorithmPerformanceWindow>,
    pub model_weights: Vec<ModelWeight>,
    /// Short-term health per algorithm, keyed by id.
    pub health_scores: BTreeMap<String, u8>,
    /// Mean short-term health across algorithms that produced a window.
    pub overall_health_score: u8,
    /// Advisory notes from the medium/long windows.
    pub recommendations: Vec<String>,
    pub actions_taken: Vec<Action>,
}

impl fmt::Display for RecalibrationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "recalibration @ {} | health={} | {} algos | {} actions",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.overall_health_score,
            self.model_weights.len(),
            self.actions_taken.len(),
        )
    }
}

// ---------------------------------------------------------------------------
// Trust query
// ---------------------------------------------------------------------------

/// Answer to "is algorithm X currently trusted, and at what weight?".
/// Before the first successful recalibration the engine answers with a
/// neutral equal-split default so consumers degrade gracefully.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustInfo {
    pub trusted: bool,
    pub weight: f64,
    pub confidence_multiplier: f64,
    pub min_confidence: f64,
    /// Latest short-term health score, if a recalibration has completed.
    pub health_score: Option<u8>,
}

impl TrustInfo {
    /// Cold-start default for a roster of `roster_size` algorithms.
    pub fn neutral(roster_size: usize) -> Self {
        let n = roster_size.max(1);
        Self {
            trusted: true,
            weight: 1.0 / n as f64,
            confidence_multiplier: 1.0,
            min_confidence: 55.0,
            health_score: None,
        }
    }
}

impl fmt::Display for TrustInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "trusted={} w={:.3} mult={:.2}",
            self.trusted, self.weight, self.confidence_multiplier,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for RECAL.
///
/// Insufficient sample is deliberately *not* here: it is a first-class state
/// on the performance window, not a failure.
#[derive(Debug, thiserror::Error)]
pub enum RecalError {
    #[error("Data unavailable ({source_name}): {message}")]
    DataUnavailable { source_name: String, message: String },

    #[error("Malformed outcome row ({algorithm_id}/{match_id}): {message}")]
    MalformedRecord {
        algorithm_id: String,
        match_id: String,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Recalibration tick cancelled: {0}")]
    TickCancelled(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
