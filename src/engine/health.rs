//! Health scoring.
//!
//! Reduces a performance window to a single 0–100 health score combining
//! sample-size confidence, win-rate edge over baseline, and calibration
//! quality. The sample sub-score lower-bounds the other two so a lucky
//! streak on three bets can never read as "excellent".

use crate::config::CalibrationConfig;
use crate::types::AlgorithmPerformanceWindow;

/// Sub-score blend weights. Relative performance dominates because it is
/// the signal staking actually cares about; calibration and sample size
/// temper it.
const SAMPLE_WEIGHT: f64 = 0.25;
const PERFORMANCE_WEIGHT: f64 = 0.45;
const CALIBRATION_WEIGHT: f64 = 0.30;

/// Ceiling applied while the sample is below `min_sample_size`.
const SMALL_SAMPLE_CAP: u8 = 60;

/// Score with no evidence either way.
const NEUTRAL_SCORE: u8 = 50;

/// Score one algorithm's window. Pure; returns 0..=100.
pub fn score(window: &AlgorithmPerformanceWindow, cfg: &CalibrationConfig) -> u8 {
    if window.sample_size == 0 {
        return NEUTRAL_SCORE;
    }

    let sample = sample_confidence(window.sample_size, cfg.min_sample_size);
    let performance = relative_performance(window, cfg);
    let calibration = calibration_quality(window);

    let blended = sample * SAMPLE_WEIGHT
        + performance * PERFORMANCE_WEIGHT
        + calibration * CALIBRATION_WEIGHT;

    let mut final_score = blended.round().clamp(0.0, 100.0) as u8;
    if !window.has_sufficient_sample(cfg.min_sample_size) {
        final_score = final_score.min(SMALL_SAMPLE_CAP);
    }
    final_score
}

/// Saturating curve: 0 at n=0, 100 at n >= 3 × min_sample_size.
fn sample_confidence(sample_size: u32, min_sample_size: u32) -> f64 {
    let saturation = (min_sample_size * 3).max(1) as f64;
    (100.0 * sample_size as f64 / saturation).min(100.0)
}

/// 50 is "no edge"; each point of win rate over baseline adds
/// `win_rate_scale` points, clamped to 0..100.
fn relative_performance(window: &AlgorithmPerformanceWindow, cfg: &CalibrationConfig) -> f64 {
    match window.win_rate {
        Some(wr) => (50.0 + (wr - cfg.baseline_win_rate) * cfg.win_rate_scale).clamp(0.0, 100.0),
        None => 50.0,
    }
}

/// 100 at zero calibration error, falling linearly.
fn calibration_quality(window: &AlgorithmPerformanceWindow) -> f64 {
    (100.0 * (1.0 - window.calibration_error)).clamp(0.0, 100.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CalibrationConfig {
        CalibrationConfig::default() // min_sample_size 10, baseline 0.5, scale 200
    }

    fn window(sample_size: u32, wins: u32, calibration_error: f64) -> AlgorithmPerformanceWindow {
        let losses = sample_size - wins;
        AlgorithmPerformanceWindow {
            algorithm_id: "elo".to_string(),
            window_days: 7,
            sample_size,
            wins,
            losses,
            win_rate: if sample_size == 0 {
                None
            } else {
                Some(wins as f64 / sample_size as f64)
            },
            avg_confidence: 65.0,
            calibration_error,
            streak: None,
        }
    }

    #[test]
    fn test_zero_sample_is_neutral() {
        assert_eq!(score(&window(0, 0, 0.0), &cfg()), 50);
    }

    #[test]
    fn test_small_sample_capped_at_60() {
        // 3 wins / 0 losses, perfectly calibrated — still capped
        let w = window(3, 3, 0.0);
        let s = score(&w, &cfg());
        assert!(s <= 60, "score {s} exceeds small-sample cap");
    }

    #[test]
    fn test_strong_performer_scores_high() {
        // 45W/20L over a full sample (wr ≈ 0.69), low calibration error
        let w = window(65, 45, 0.30);
        let s = score(&w, &cfg());
        assert!(s >= 75, "score {s} too low for a strong performer");
    }

    #[test]
    fn test_poor_performer_scores_low() {
        // 20% win rate on a big sample with bad calibration
        let w = window(60, 12, 0.7);
        let s = score(&w, &cfg());
        assert!(s < 40, "score {s} too high for a poor performer");
    }

    #[test]
    fn test_score_bounded() {
        for (n, wins, err) in [(0, 0, 0.0), (5, 5, 0.0), (200, 200, 0.0), (200, 0, 1.0)] {
            let s = score(&window(n, wins, err), &cfg());
            assert!(s <= 100);
        }
    }

    #[test]
    fn test_better_win_rate_scores_higher() {
        let low = score(&window(40, 20, 0.4), &cfg());
        let high = score(&window(40, 28, 0.4), &cfg());
        assert!(high > low);
    }

    #[test]
    fn test_better_calibration_scores_higher() {
        let sloppy = score(&window(40, 24, 0.6), &cfg());
        let sharp = score(&window(40, 24, 0.3), &cfg());
        assert!(sharp > sloppy);
    }

    #[test]
    fn test_sample_confidence_saturates() {
        assert!((sample_confidence(30, 10) - 100.0).abs() < 1e-10);
        assert!((sample_confidence(60, 10) - 100.0).abs() < 1e-10);
        assert!((sample_confidence(15, 10) - 50.0).abs() < 1e-10);
        assert!(sample_confidence(0, 10).abs() < 1e-10);
    }

    #[test]
    fn test_relative_performance_clamps() {
        let mut w = window(40, 40, 0.2); // 100% win rate → way over 100 pre-clamp
        assert!((relative_performance(&w, &cfg()) - 100.0).abs() < 1e-10);
        w = window(40, 0, 0.2); // 0% win rate → clamped to 0
        assert!(relative_performance(&w, &cfg()).abs() < 1e-10);
    }

    #[test]
    fn test_deterministic() {
        let w = window(25, 15, 0.35);
        assert_eq!(score(&w, &cfg()), score(&w, &cfg()));
    }
}
