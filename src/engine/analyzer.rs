//! Performance analysis.
//!
//! Reduces a raw list of one algorithm's predictions to an
//! `AlgorithmPerformanceWindow` for a given rolling window. Pure function
//! of its inputs — `now` is passed in so recomputing over the same data
//! yields the same window, which is what makes ticks deterministic and
//! testable.

use chrono::{DateTime, Duration, Utc};

use crate::types::{
    AlgorithmPerformanceWindow, OutcomeStatus, PredictionOutcome, Streak, StreakKind,
};

/// Build the performance window for one algorithm.
///
/// Filters to rows predicted at or after `now - window_days` that have
/// settled. Pending rows carry no information yet; push rows settle but
/// have no binary outcome, so they are excluded from the sample, the win
/// rate, and the calibration error alike. Malformed rows are the caller's
/// problem (they are filtered out before this function).
pub fn analyze(
    algorithm_id: &str,
    outcomes: &[PredictionOutcome],
    window_days: u32,
    now: DateTime<Utc>,
) -> AlgorithmPerformanceWindow {
    let cutoff = now - Duration::days(window_days as i64);

    let mut decisive: Vec<&PredictionOutcome> = outcomes
        .iter()
        .filter(|o| o.predicted_at >= cutoff && o.status.is_decisive())
        .collect();

    if decisive.is_empty() {
        return AlgorithmPerformanceWindow::empty(algorithm_id, window_days);
    }

    // Most recent first; streaks are read off the head of this ordering.
    decisive.sort_by(|a, b| b.predicted_at.cmp(&a.predicted_at));

    let wins = decisive
        .iter()
        .filter(|o| o.status == OutcomeStatus::Won)
        .count() as u32;
    let losses = decisive.len() as u32 - wins;
    let sample_size = wins + losses;

    let win_rate = Some(wins as f64 / sample_size as f64);

    let avg_confidence =
        decisive.iter().map(|o| o.confidence).sum::<f64>() / sample_size as f64;

    // Mean absolute gap between stated confidence and realized outcome.
    let calibration_error = decisive
        .iter()
        .filter_map(|o| o.realized().map(|r| (o.confidence / 100.0 - r).abs()))
        .sum::<f64>()
        / sample_size as f64;

    let streak = current_streak(&decisive);

    AlgorithmPerformanceWindow {
        algorithm_id: algorithm_id.to_string(),
        window_days,
        sample_size,
        wins,
        losses,
        win_rate,
        avg_confidence,
        calibration_error,
        streak,
    }
}

/// Length of the leading same-outcome run, `decisive` ordered most recent
/// first. Used downstream to flag regression risk in recommendations, not
/// to move weights (streak-chasing is exactly what this engine exists to
/// avoid).
fn current_streak(decisive: &[&PredictionOutcome]) -> Option<Streak> {
    let first = decisive.first()?;
    let kind = match first.status {
        OutcomeStatus::Won => StreakKind::Win,
        OutcomeStatus::Lost => StreakKind::Loss,
        _ => return None,
    };
    let length = decisive
        .iter()
        .take_while(|o| o.status == first.status)
        .count() as u32;
    Some(Streak { kind, length })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
