//! Ensemble synthesis.
//!
//! Folds the per-algorithm picks for one match into a single meta-pick
//! using the current trust state: paused algorithms are excluded, picks
//! below an algorithm's confidence gate are excluded, and the rest vote
//! with `weight * calibrated confidence`. An optional narrator turns the
//! result into prose; narration is best-effort and never blocks a pick.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::registry::WeightRegistry;
use crate::types::RecalError;

/// One algorithm's call on one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmPick {
    pub algorithm_id: String,
    pub match_id: String,
    /// The side picked, e.g. "home", "away", "over_2.5".
    pub selection: String,
    /// Stated confidence, 0 to 100.
    pub confidence: f64,
}

/// The ensemble's combined call.
#[derive(Debug, Clone, Serialize)]
pub struct MetaPick {
    pub match_id: String,
    pub selection: String,
    /// Calibrated confidence, 0 to 100, discounted by disagreement.
    pub confidence: f64,
    /// Share of the eligible vote mass behind the winning selection.
    pub agreement: f64,
    /// Algorithms that voted for the winning selection, id ascending.
    pub contributors: Vec<String>,
    pub narrative: Option<String>,
}

/// Combine picks under the registry's current trust state.
///
/// Returns `None` when no pick survives the trust and confidence gates.
/// Ties between selections break toward the lexicographically smallest
/// selection so repeated calls on the same inputs agree.
pub fn synthesize(registry: &WeightRegistry, picks: &[AlgorithmPick]) -> Option<MetaPick> {
    let match_id = picks.first()?.match_id.clone();

    // selection -> (vote mass, confidence-weighted accumulator, voters)
    let mut tally: BTreeMap<String, (f64, f64, Vec<String>)> = BTreeMap::new();
    let mut total_mass = 0.0;

    for pick in picks {
        if !pick.confidence.is_finite() || !(0.0..=100.0).contains(&pick.confidence) {
            warn!(
                algorithm = %pick.algorithm_id,
                confidence = pick.confidence,
                "Ignoring pick with invalid confidence"
            );
            continue;
        }
        let trust = registry.trust(&pick.algorithm_id);
        if !trust.trusted {
            debug!(algorithm = %pick.algorithm_id, "Pick excluded, algorithm paused");
            continue;
        }
        let calibrated = (pick.confidence * trust.confidence_multiplier).min(100.0);
        if calibrated < trust.min_confidence {
            debug!(
                algorithm = %pick.algorithm_id,
                calibrated,
                gate = trust.min_confidence,
                "Pick excluded, below confidence gate"
            );
            continue;
        }
        let mass = trust.weight * (calibrated / 100.0);
        if mass <= 0.0 {
            continue;
        }
        let entry = tally.entry(pick.selection.clone()).or_default();
        entry.0 += mass;
        entry.1 += mass * calibrated;
        entry.2.push(pick.algorithm_id.clone());
        total_mass += mass;
    }

    if total_mass <= 0.0 {
        return None;
    }

    // BTreeMap iteration is selection-ascending, so on equal mass the
    // first (smallest) selection wins.
    let (selection, (mass, conf_acc, mut contributors)) = tally
        .into_iter()
        .reduce(|best, cand| if cand.1 .0 > best.1 .0 { cand } else { best })?;

    contributors.sort();
    let agreement = mass / total_mass;
    let confidence = ((conf_acc / mass) * agreement).clamp(0.0, 100.0);

    Some(MetaPick {
        match_id,
        selection,
        confidence,
        agreement,
        contributors,
        narrative: None,
    })
}

/// Turns a meta-pick into a human-readable rationale.
#[async_trait]
pub trait AnalysisNarrator: Send + Sync {
    async fn narrate(
        &self,
        meta: &MetaPick,
        picks: &[AlgorithmPick],
    ) -> Result<String, RecalError>;
}

/// Default narrator: a one-line template, no external calls.
pub struct TemplateNarrator;

#[async_trait]
impl AnalysisNarrator for TemplateNarrator {
    async fn narrate(
        &self,
        meta: &MetaPick,
        picks: &[AlgorithmPick],
    ) -> Result<String, RecalError> {
        Ok(format!(
            "{} of {} algorithms back {} at {:.0}% calibrated confidence ({:.0}% agreement)",
            meta.contributors.len(),
            picks.len(),
            meta.selection,
            meta.confidence,
            meta.agreement * 100.0
        ))
    }
}

/// `synthesize`, then attach a narrative if the narrator answers in time.
/// A slow or failing narrator costs only the prose.
pub async fn synthesize_narrated(
    registry: &WeightRegistry,
    picks: &[AlgorithmPick],
    narrator: &dyn AnalysisNarrator,
    narration_budget: Duration,
) -> Option<MetaPick> {
    let mut meta = synthesize(registry, picks)?;
    match timeout(narration_budget, narrator.narrate(&meta, picks)).await {
        Ok(Ok(text)) => meta.narrative = Some(text),
        Ok(Err(e)) => warn!(error = %e, "Narration failed, returning pick without prose"),
        Err(_) => warn!("Narration timed out, returning pick without prose"),
    }
    Some(meta)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
