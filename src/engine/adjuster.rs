//! Weight adjustment.
//!
//! Turns per-algorithm health scores into the next `ModelWeight` set:
//! pause/resume with hysteresis, proportional-to-health target allocation
//! with a floor, a per-tick delta clamp, confidence multipliers from
//! medium-term calibration, and a clamp-respecting renormalization. Pure
//! function of its inputs; every decision is logged as an `Action`.

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::config::CalibrationConfig;
use crate::types::{Action, ActionType, AlgorithmPerformanceWindow, ModelWeight};

/// Calibration error at which the confidence multiplier is exactly 1.0.
/// A 60–70% confidence book that wins at its stated rate lands near here.
const CALIBRATION_REFERENCE_ERROR: f64 = 0.35;

/// Multiplier points per unit of calibration error away from the reference.
const CALIBRATION_SLOPE: f64 = 2.0;

/// Multiplier clamp. The floor is 0.5 rather than 0: silencing an
/// algorithm entirely is the pause mechanism's job, not the multiplier's.
const MULTIPLIER_MIN: f64 = 0.5;
const MULTIPLIER_MAX: f64 = 1.5;

/// Weight moves below this don't produce audit actions.
const WEIGHT_ACTION_NOISE: f64 = 0.005;

/// Health evidence for one algorithm, one tick.
#[derive(Debug, Clone)]
pub struct HealthInput {
    pub algorithm_id: String,
    /// Short-term health score — the only window that drives control.
    pub short_score: u8,
    pub short_window: AlgorithmPerformanceWindow,
    /// Medium-term window — drives the confidence multiplier only.
    pub medium_window: AlgorithmPerformanceWindow,
}

/// Output of one adjustment pass.
#[derive(Debug, Clone)]
pub struct Adjustment {
    /// New weight set, sorted by algorithm id.
    pub weights: Vec<ModelWeight>,
    pub actions: Vec<Action>,
}

/// Compute the next weight set.
///
/// Algorithms present in `priors` but absent from `inputs` (skipped this
/// tick, e.g. their fetch failed) carry their pause state, multiplier and
/// weight share forward untouched.
/// Iteration is in `algorithm_id` ascending order throughout, so ties and
/// the rounding remainder land deterministically.
pub fn adjust(
    inputs: &[HealthInput],
    priors: &BTreeMap<String, ModelWeight>,
    cfg: &CalibrationConfig,
) -> Adjustment {
    let by_id: BTreeMap<&str, &HealthInput> = inputs
        .iter()
        .map(|i| (i.algorithm_id.as_str(), i))
        .collect();

    let ids: BTreeSet<String> = priors
        .keys()
        .cloned()
        .chain(inputs.iter().map(|i| i.algorithm_id.clone()))
        .collect();

    let mut actions: Vec<Action> = Vec::new();
    let roster_size = ids.len();

    // Phase 1: pause / resume transitions, plus per-algorithm state that
    // doesn't depend on the rest of the ensemble.
    let mut records: Vec<ModelWeight> = Vec::with_capacity(roster_size);
    for id in &ids {
        let prior = priors
            .get(id)
            .cloned()
            .unwrap_or_else(|| ModelWeight::neutral(id, roster_size));
        let mut record = prior.clone();

        if let Some(input) = by_id.get(id.as_str()) {
            let sufficient = input
                .short_window
                .has_sufficient_sample(cfg.min_sample_size);

            if !record.is_paused
                && sufficient
                && input.short_score < cfg.pause_health_threshold
            {
                record.is_paused = true;
                actions.push(Action::new(
                    id,
                    ActionType::Paused,
                    format!(
                        "short-term health {} below pause threshold {} (n={})",
                        input.short_score, cfg.pause_health_threshold, input.short_window.sample_size,
                    ),
                    prior.adjusted_weight,
                ));
            } else if record.is_paused
                && sufficient
                && input.short_score >= cfg.resume_threshold()
            {
                record.is_paused = false;
                actions.push(Action::new(
                    id,
                    ActionType::Resumed,
                    format!(
                        "short-term health {} cleared resume bar {} (n={})",
                        input.short_score,
                        cfg.resume_threshold(),
                        input.short_window.sample_size,
                    ),
                    0.0,
                ));
            }

            // Confidence multiplier from medium-term calibration. Held at
            // the prior value on insufficient sample.
            if input
                .medium_window
                .has_sufficient_sample(cfg.min_sample_size)
            {
                let err = input.medium_window.calibration_error;
                let target_mult = (1.0 + (CALIBRATION_REFERENCE_ERROR - err) * CALIBRATION_SLOPE)
                    .clamp(MULTIPLIER_MIN, MULTIPLIER_MAX);
                let delta = target_mult - prior.confidence_multiplier;
                if delta.abs() > cfg.multiplier_noise_threshold {
                    record.confidence_multiplier = target_mult;
                    actions.push(Action::new(
                        id,
                        ActionType::ConfidenceAdjusted,
                        format!(
                            "medium-term calibration error {:.3} (n={})",
                            err, input.medium_window.sample_size,
                        ),
                        delta,
                    ));
                }
            }

            record.min_confidence_threshold = min_confidence_for(input.short_score);
        }

        records.push(record);
    }

    // Phase 2: proportional-to-health targets over the active set, with a
    // floor so no active algorithm starves.
    let targets = allocate_targets(&records, &by_id, cfg);

    // Phase 3: delta clamp against priors, then exact renormalization.
    let active_count = records.iter().filter(|r| !r.is_paused).count();
    for (record, target) in records.iter_mut().zip(targets.iter()) {
        if record.is_paused {
            record.adjusted_weight = 0.0;
            continue;
        }
        let prior_w = priors
            .get(&record.algorithm_id)
            .map(|p| p.adjusted_weight)
            .unwrap_or(1.0 / roster_size.max(1) as f64);
        let delta = (target - prior_w).clamp(-cfg.max_weight_delta, cfg.max_weight_delta);
        record.adjusted_weight = (prior_w + delta).clamp(0.0, 1.0);
    }

    if active_count == 0 {
        // Everything paused: fall back to the equal-split baseline so
        // downstream consumers still have usable weights.
        let equal = 1.0 / roster_size.max(1) as f64;
        for record in &mut records {
            record.adjusted_weight = equal;
        }
    } else {
        settle_active(&mut records, priors, cfg, roster_size);
    }

    // Weight-change audit entries, measured after renormalization.
    for record in &records {
        if record.is_paused {
            continue;
        }
        let prior_w = priors
            .get(&record.algorithm_id)
            .map(|p| p.adjusted_weight)
            .unwrap_or(record.adjusted_weight);
        let moved = record.adjusted_weight - prior_w;
        if moved > WEIGHT_ACTION_NOISE {
            actions.push(Action::new(
                &record.algorithm_id,
                ActionType::WeightIncreased,
                format!("weight {:.3} -> {:.3}", prior_w, record.adjusted_weight),
                moved,
            ));
        } else if moved < -WEIGHT_ACTION_NOISE {
            actions.push(Action::new(
                &record.algorithm_id,
                ActionType::WeightDecreased,
                format!("weight {:.3} -> {:.3}", prior_w, record.adjusted_weight),
                moved,
            ));
        }
    }

    // Stamp records that materially changed.
    let now = Utc::now();
    for record in &mut records {
        let changed = match priors.get(&record.algorithm_id) {
            Some(p) => {
                (record.adjusted_weight - p.adjusted_weight).abs() > f64::EPSILON
                    || record.is_paused != p.is_paused
                    || (record.confidence_multiplier - p.confidence_multiplier).abs() > f64::EPSILON
            }
            None => true,
        };
        if changed {
            record.last_changed_at = now;
        }
    }

    debug!(
        algorithms = records.len(),
        active = active_count,
        actions = actions.len(),
        "Weight adjustment pass complete"
    );

    Adjustment {
        weights: records,
        actions,
    }
}

/// Picks from an algorithm with weaker short-term health need a higher
/// stated confidence before the synthesizer counts them.
fn min_confidence_for(short_score: u8) -> f64 {
    (60.0 - (short_score as f64 - 50.0) * 0.2).clamp(50.0, 70.0)
}

/// Linear proportional-to-health allocation over the active set.
///
/// Active algorithms that produced no evidence this tick hold their prior
/// share; only the mass belonging to scored algorithms is reallocated. A
/// tick where every fetch failed therefore moves nothing.
fn allocate_targets(
    records: &[ModelWeight],
    by_id: &BTreeMap<&str, &HealthInput>,
    cfg: &CalibrationConfig,
) -> Vec<f64> {
    let mut targets = vec![0.0; records.len()];
    let active: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_paused)
        .map(|(i, _)| i)
        .collect();
    if active.is_empty() {
        return targets;
    }

    let (scored, carried): (Vec<usize>, Vec<usize>) = active
        .iter()
        .copied()
        .partition(|&i| by_id.contains_key(records[i].algorithm_id.as_str()));

    // Records still hold the prior weight at this point.
    for &i in &carried {
        targets[i] = records[i].adjusted_weight;
    }
    if scored.is_empty() {
        return targets;
    }

    let carried_mass: f64 = carried.iter().map(|&i| targets[i]).sum();
    let available = (1.0 - carried_mass).max(0.0);
    let total: f64 = scored
        .iter()
        .map(|&i| by_id[records[i].algorithm_id.as_str()].short_score as f64)
        .sum();
    if total <= 0.0 || available <= 0.0 {
        let equal = available.max(0.0) / scored.len() as f64;
        for &i in &scored {
            targets[i] = equal;
        }
        return targets;
    }

    for &i in &scored {
        targets[i] =
            by_id[records[i].algorithm_id.as_str()].short_score as f64 / total * available;
    }

    // Lift starved scored algorithms to the floor and rescale the rest
    // into what remains of their mass.
    let floor = cfg.min_weight_floor;
    let floored: Vec<usize> = scored
        .iter()
        .copied()
        .filter(|&i| targets[i] < floor)
        .collect();
    if !floored.is_empty() && floored.len() < scored.len() {
        let rest: Vec<usize> = scored
            .iter()
            .copied()
            .filter(|i| !floored.contains(i))
            .collect();
        let rest_total: f64 = rest.iter().map(|&i| targets[i]).sum();
        let rest_available = available - floor * floored.len() as f64;
        if rest_total > 0.0 && rest_available > 0.0 {
            for &i in &floored {
                targets[i] = floor;
            }
            for &i in &rest {
                targets[i] = targets[i] / rest_total * rest_available;
            }
        }
    }

    targets
}

/// Residual below this is treated as settled.
const SETTLE_EPS: f64 = 1e-12;

/// Bring active weights to an exact sum of 1.0 without re-breaking the
/// per-tick delta clamp.
///
/// A plain rescale can drag an already-clamped weight far past the clamp,
/// so the residual left after clamping is instead water-filled over the
/// algorithms whose delta bound still has headroom in the residual's
/// direction, saturating bounds as they bind. The priors themselves sum to
/// 1 and sit inside every bound, so a feasible point always exists while
/// the roster is unchanged; only mass freed by a pause (or demanded by a
/// resume) that the active set cannot legally absorb spills past the
/// bounds, spread proportionally.
fn settle_active(
    records: &mut [ModelWeight],
    priors: &BTreeMap<String, ModelWeight>,
    cfg: &CalibrationConfig,
    roster_size: usize,
) {
    let fallback = 1.0 / roster_size.max(1) as f64;
    // (record index, lower bound, upper bound) for each active algorithm.
    let active: Vec<(usize, f64, f64)> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_paused)
        .map(|(i, r)| {
            let prior_w = priors
                .get(&r.algorithm_id)
                .map(|p| p.adjusted_weight)
                .unwrap_or(fallback);
            let lo = (prior_w - cfg.max_weight_delta).max(cfg.min_weight_floor.min(prior_w));
            let hi = (prior_w + cfg.max_weight_delta).min(1.0);
            (i, lo.min(hi), hi)
        })
        .collect();
    if active.is_empty() {
        return;
    }

    let sum: f64 = active
        .iter()
        .map(|&(i, _, _)| records[i].adjusted_weight)
        .sum();
    let mut residual = 1.0 - sum;

    for _ in 0..active.len() {
        if residual.abs() < SETTLE_EPS {
            break;
        }
        let free: Vec<(usize, f64, f64)> = active
            .iter()
            .copied()
            .filter(|&(i, lo, hi)| {
                let w = records[i].adjusted_weight;
                let headroom = if residual > 0.0 { hi - w } else { w - lo };
                headroom > SETTLE_EPS
            })
            .collect();
        if free.is_empty() {
            break;
        }
        let share = residual / free.len() as f64;
        for (i, lo, hi) in free {
            let before = records[i].adjusted_weight;
            let after = (before + share).clamp(lo, hi);
            records[i].adjusted_weight = after;
            residual -= after - before;
        }
    }

    // Every bound is binding and mass is still unplaced: a pause/resume
    // changed the roster by more than the bounds can absorb. Spill the
    // remainder proportionally; summing to 1 outranks the clamp here.
    if residual.abs() >= SETTLE_EPS {
        let sum: f64 = active
            .iter()
            .map(|&(i, _, _)| records[i].adjusted_weight)
            .sum();
        if sum > 0.0 {
            for &(i, _, _) in &active {
                records[i].adjusted_weight += residual * records[i].adjusted_weight / sum;
            }
        } else {
            let equal = 1.0 / active.len() as f64;
            for &(i, _, _) in &active {
                records[i].adjusted_weight = equal;
            }
        }
    }

    // Floating-point remainder lands on the first active algorithm in id order.
    let after: f64 = active
        .iter()
        .map(|&(i, _, _)| records[i].adjusted_weight)
        .sum();
    if let Some(&(first, _, _)) = active.first() {
        records[first].adjusted_weight += 1.0 - after;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CalibrationConfig {
        CalibrationConfig::default() // pause 30, margin 10, delta 0.10, min n 10
    }

    fn window(algo: &str, days: u32, sample_size: u32, calibration_error: f64) -> AlgorithmPerformanceWindow {
        let wins = sample_size / 2;
        AlgorithmPerformanceWindow {
            algorithm_id: algo.to_string(),
            window_days: days,
            sample_size,
            wins,
            losses: sample_size - wins,
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

    fn input(algo: &str, short_score: u8, sample_size: u32) -> HealthInput {
        HealthInput {
            algorithm_id: algo.to_string(),
            short_score,
            short_window: window(algo, 7, sample_size, 0.35),
            medium_window: window(algo, 30, sample_size * 2, 0.35),
        }
    }

    fn priors(entries: &[(&str, f64, bool)]) -> BTreeMap<String, ModelWeight> {
        entries
            .iter()
            .map(|(id, w, paused)| {
                let mut m = ModelWeight::neutral(id, entries.len());
                m.adjusted_weight = *w;
                m.is_paused = *paused;
                (id.to_string(), m)
            })
            .collect()
    }

    fn weight_of<'a>(adj: &'a Adjustment, id: &str) -> &'a ModelWeight {
        adj.weights
            .iter()
            .find(|w| w.algorithm_id == id)
            .unwrap()
    }

    fn active_sum(adj: &Adjustment) -> f64 {
        adj.weights
            .iter()
            .filter(|w| !w.is_paused)
            .map(|w| w.adjusted_weight)
            .sum()
    }

    #[test]
    fn test_weight_conservation() {
        let inputs = vec![input("a", 80, 40), input("b", 55, 40), input("c", 30, 5)];
        let adj = adjust(
            &inputs,
            &priors(&[("a", 0.4, false), ("b", 0.35, false), ("c", 0.25, false)]),
            &cfg(),
        );
        assert!((active_sum(&adj) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounded_multiplier() {
        // Absurdly bad and absurdly good calibration both stay in bounds
        let mut bad = input("a", 60, 40);
        bad.medium_window.calibration_error = 1.0;
        let mut good = input("b", 60, 40);
        good.medium_window.calibration_error = 0.0;
        let adj = adjust(
            &[bad, good],
            &priors(&[("a", 0.5, false), ("b", 0.5, false)]),
            &cfg(),
        );
        for w in &adj.weights {
            assert!(w.confidence_multiplier >= 0.0 && w.confidence_multiplier <= 1.5);
        }
        assert!(weight_of(&adj, "a").confidence_multiplier < 1.0);
        assert!(weight_of(&adj, "b").confidence_multiplier > 1.0);
    }

    #[test]
    fn test_no_premature_pause() {
        // Health 5 but only 3 settled predictions: must not pause
        let adj = adjust(
            &[input("a", 5, 3), input("b", 70, 40)],
            &priors(&[("a", 0.5, false), ("b", 0.5, false)]),
            &cfg(),
        );
        assert!(!weight_of(&adj, "a").is_paused);
        assert!(!adj
            .actions
            .iter()
            .any(|a| a.action_type == ActionType::Paused));
    }

    #[test]
    fn test_pause_with_sufficient_sample() {
        let adj = adjust(
            &[input("a", 15, 20), input("b", 70, 40)],
            &priors(&[("a", 0.5, false), ("b", 0.5, false)]),
            &cfg(),
        );
        let a = weight_of(&adj, "a");
        assert!(a.is_paused);
        assert_eq!(a.adjusted_weight, 0.0);
        assert!(adj
            .actions
            .iter()
            .any(|x| x.action_type == ActionType::Paused && x.algorithm_id == "a"));
        // Remaining active weight re-sums to 1
        assert!((active_sum(&adj) - 1.0).abs() < 1e-6);
        assert!((weight_of(&adj, "b").adjusted_weight - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_hysteresis_no_resume_below_bar() {
        // Paused; threshold 30, margin 10 → resume bar is 40. 31 < 40 stays paused.
        let adj = adjust(
            &[input("a", 31, 20), input("b", 70, 40)],
            &priors(&[("a", 0.0, true), ("b", 1.0, false)]),
            &cfg(),
        );
        assert!(weight_of(&adj, "a").is_paused);
        assert!(!adj
            .actions
            .iter()
            .any(|x| x.action_type == ActionType::Resumed));
    }

    #[test]
    fn test_hysteresis_resume_at_bar() {
        let adj = adjust(
            &[input("a", 40, 20), input("b", 70, 40)],
            &priors(&[("a", 0.0, true), ("b", 1.0, false)]),
            &cfg(),
        );
        let a = weight_of(&adj, "a");
        assert!(!a.is_paused);
        assert!(adj
            .actions
            .iter()
            .any(|x| x.action_type == ActionType::Resumed && x.algorithm_id == "a"));
        // Resuming from zero, climb is rate-limited
        assert!(a.adjusted_weight <= cfg().max_weight_delta + 1e-9);
        assert!((active_sum(&adj) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_resume_on_insufficient_sample() {
        // Score clears the bar but with no fresh evidence: stay paused
        let adj = adjust(
            &[input("a", 50, 2), input("b", 70, 40)],
            &priors(&[("a", 0.0, true), ("b", 1.0, false)]),
            &cfg(),
        );
        assert!(weight_of(&adj, "a").is_paused);
    }

    #[test]
    fn test_rate_limiting_exact_two_algorithms() {
        // Priors 0.5/0.5; scores 80/20 → targets 0.8/0.2; clamped to
        // 0.6/0.4 which already sums to 1, so renormalization is a no-op
        // and the deltas are exactly max_weight_delta.
        let inputs = vec![input("a", 80, 40), input("b", 20, 40)];
        let mut c = cfg();
        c.pause_health_threshold = 10; // keep "b" active for this test
        let adj = adjust(&inputs, &priors(&[("a", 0.5, false), ("b", 0.5, false)]), &c);
        let a = weight_of(&adj, "a").adjusted_weight;
        let b = weight_of(&adj, "b").adjusted_weight;
        assert!((a - 0.6).abs() < 1e-9, "a = {a}");
        assert!((b - 0.4).abs() < 1e-9, "b = {b}");
    }

    #[test]
    fn test_rate_limit_holds_under_renormalization() {
        // Priors 0.8/0.1/0.1 with scores 35/90/90: the clamped weights
        // 0.7/0.2/0.2 sum to 1.1, and a plain rescale would drag "a" down
        // to ~0.636, a 0.164 move against a 0.10 cap. The residual has to
        // land on the algorithms whose clamp bound is not binding.
        let inputs = vec![input("a", 35, 40), input("b", 90, 40), input("c", 90, 40)];
        let prior = priors(&[("a", 0.8, false), ("b", 0.1, false), ("c", 0.1, false)]);
        let adj = adjust(&inputs, &prior, &cfg());
        let cap = cfg().max_weight_delta;
        for w in &adj.weights {
            let moved = (w.adjusted_weight - prior[&w.algorithm_id].adjusted_weight).abs();
            assert!(
                moved <= cap + 1e-6,
                "{} moved {moved:.4} in one tick, cap is {cap}",
                w.algorithm_id
            );
        }
        assert!((active_sum(&adj) - 1.0).abs() < 1e-6);
        assert!((weight_of(&adj, "a").adjusted_weight - 0.7).abs() < 1e-9);
        assert!((weight_of(&adj, "b").adjusted_weight - 0.15).abs() < 1e-9);
        assert!((weight_of(&adj, "c").adjusted_weight - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_weight_floor_holds() {
        // Three algorithms, one near-zero score: its target is floored
        let inputs = vec![input("a", 95, 40), input("b", 90, 40), input("c", 2, 5)];
        // Run several ticks so weights converge past the delta clamp
        let mut current = priors(&[("a", 0.34, false), ("b", 0.33, false), ("c", 0.33, false)]);
        for _ in 0..12 {
            let adj = adjust(&inputs, &current, &cfg());
            current = adj
                .weights
                .iter()
                .map(|w| (w.algorithm_id.clone(), w.clone()))
                .collect();
        }
        let floor = cfg().min_weight_floor;
        let c_weight = current.get("c").unwrap().adjusted_weight;
        assert!(
            c_weight >= floor - 1e-6,
            "c converged below floor: {c_weight}"
        );
    }

    #[test]
    fn test_all_paused_equal_split() {
        let adj = adjust(
            &[input("a", 10, 20), input("b", 10, 20)],
            &priors(&[("a", 0.5, false), ("b", 0.5, false)]),
            &cfg(),
        );
        assert!(adj.weights.iter().all(|w| w.is_paused));
        for w in &adj.weights {
            assert!((w.adjusted_weight - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_deterministic_id_order_output() {
        let inputs = vec![input("zeta", 60, 40), input("alpha", 60, 40)];
        let adj = adjust(
            &inputs,
            &priors(&[("zeta", 0.5, false), ("alpha", 0.5, false)]),
            &cfg(),
        );
        let ids: Vec<&str> = adj.weights.iter().map(|w| w.algorithm_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
        // Identical evidence → identical weights
        assert!(
            (adj.weights[0].adjusted_weight - adj.weights[1].adjusted_weight).abs() < 1e-9
        );
    }

    #[test]
    fn test_missing_input_carries_prior_forward() {
        // "b" produced no evidence this tick: pause state and multiplier
        // are untouched and the set still sums to 1.
        let adj = adjust(
            &[input("a", 70, 40)],
            &priors(&[("a", 0.5, false), ("b", 0.5, false)]),
            &cfg(),
        );
        let b = weight_of(&adj, "b");
        assert!(!b.is_paused);
        assert!((b.adjusted_weight - 0.5).abs() < 1e-9);
        assert!((b.confidence_multiplier - 1.0).abs() < 1e-9);
        assert!((active_sum(&adj) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_confidence_noise_threshold_suppresses_action() {
        // Calibration error equal to the reference → target multiplier 1.0,
        // same as prior: no ConfidenceAdjusted action.
        let mut i = input("a", 60, 40);
        i.medium_window.calibration_error = CALIBRATION_REFERENCE_ERROR;
        let adj = adjust(&[i], &priors(&[("a", 1.0, false)]), &cfg());
        assert!(!adj
            .actions
            .iter()
            .any(|a| a.action_type == ActionType::ConfidenceAdjusted));
    }

    #[test]
    fn test_multiplier_held_on_insufficient_medium_sample() {
        let mut i = input("a", 60, 40);
        i.medium_window = window("a", 30, 3, 0.9); // tiny sample, awful error
        let adj = adjust(&[i], &priors(&[("a", 1.0, false)]), &cfg());
        assert!((weight_of(&adj, "a").confidence_multiplier - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_weight_actions_emitted() {
        let inputs = vec![input("a", 90, 40), input("b", 30, 40)];
        let mut c = cfg();
        c.pause_health_threshold = 10;
        let adj = adjust(&inputs, &priors(&[("a", 0.5, false), ("b", 0.5, false)]), &c);
        assert!(adj
            .actions
            .iter()
            .any(|a| a.action_type == ActionType::WeightIncreased && a.algorithm_id == "a"));
        assert!(adj
            .actions
            .iter()
            .any(|a| a.action_type == ActionType::WeightDecreased && a.algorithm_id == "b"));
    }

    #[test]
    fn test_min_confidence_tracks_health() {
        assert!((min_confidence_for(100) - 50.0).abs() < 1e-9);
        assert!((min_confidence_for(50) - 60.0).abs() < 1e-9);
        assert!((min_confidence_for(0) - 70.0).abs() < 1e-9);
    }
}
