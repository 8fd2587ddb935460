//! Weight progression advisor
//!
//! Turns the last logged session of an exercise into a per-set weight
//! suggestion for the next one: +5% per set, rounded up to the nearest
//! loadable weight. Pure arithmetic, no I/O; callers validate input
//! before handing it over.

use thiserror::Error;

use crate::db::SetEntry;

/// Flat progression applied to every set
const PROGRESSION_FACTOR: f64 = 1.05;

/// Tolerance for float comparison when matching plate values
const EPS: f64 = 1e-9;

/// Fatal plate configuration error, not recoverable at call sites
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("plate increment set is empty")]
    EmptyPlateSet,
    #[error("plate increment must be positive, got {0}")]
    NonPositiveIncrement(f64),
}

/// What a recommendation does with a bodyweight (0 kg) set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroWeightPolicy {
    /// Suggest the smallest loadable weight: time to add equipment
    #[default]
    SmallestPlate,
    /// Keep 0: the exercise stays unloaded
    KeepZero,
}

/// Ascending set of loadable target weights (kg)
#[derive(Debug, Clone, PartialEq)]
pub struct PlateSet {
    increments: Vec<f64>,
}

impl PlateSet {
    /// Build from a list of loadable weights; sorted and deduplicated
    pub fn new(mut increments: Vec<f64>) -> Result<Self, ConfigurationError> {
        if increments.is_empty() {
            return Err(ConfigurationError::EmptyPlateSet);
        }
        if let Some(&bad) = increments.iter().find(|w| **w <= 0.0) {
            return Err(ConfigurationError::NonPositiveIncrement(bad));
        }
        increments.sort_by(|a, b| a.total_cmp(b));
        increments.dedup_by(|a, b| (*a - *b).abs() < EPS);
        Ok(Self { increments })
    }

    /// Standard plate increments for a home barbell set
    pub fn default_kg() -> Self {
        Self {
            increments: vec![1.25, 2.5, 5.0, 10.0, 15.0, 20.0],
        }
    }

    /// Loadable weights in fixed steps up to a maximum, for barbell math
    /// where any multiple of the smallest plate pair is reachable
    pub fn steps(step: f64, max: f64) -> Result<Self, ConfigurationError> {
        if step <= 0.0 {
            return Err(ConfigurationError::NonPositiveIncrement(step));
        }
        let count = (max / step).floor() as usize;
        if count == 0 {
            return Err(ConfigurationError::EmptyPlateSet);
        }
        let increments = (1..=count).map(|i| i as f64 * step).collect();
        Ok(Self { increments })
    }

    pub fn smallest(&self) -> f64 {
        self.increments[0]
    }

    pub fn largest(&self) -> f64 {
        self.increments[self.increments.len() - 1]
    }

    /// Round a candidate weight up to the nearest loadable value.
    /// A candidate above every value clamps to the largest; never rounds
    /// below the smallest.
    pub fn round_up(&self, candidate: f64) -> f64 {
        self.increments
            .iter()
            .copied()
            .find(|w| *w >= candidate - EPS)
            .unwrap_or_else(|| self.largest())
    }
}

/// Per-set weight recommendation engine
#[derive(Debug, Clone)]
pub struct ProgressAdvisor {
    plates: PlateSet,
    zero_weight: ZeroWeightPolicy,
}

impl ProgressAdvisor {
    pub fn new(plates: PlateSet) -> Self {
        Self {
            plates,
            zero_weight: ZeroWeightPolicy::default(),
        }
    }

    pub fn with_zero_weight_policy(mut self, policy: ZeroWeightPolicy) -> Self {
        self.zero_weight = policy;
        self
    }

    /// Suggest next-session weights, one per set of the last session,
    /// preserving set order. The session must be non-empty and already
    /// validated (no negative reps or weights).
    pub fn recommend(&self, last_session: &[SetEntry]) -> Vec<f64> {
        last_session
            .iter()
            .map(|set| {
                if set.weight == 0.0 && self.zero_weight == ZeroWeightPolicy::KeepZero {
                    return 0.0;
                }
                self.plates.round_up(set.weight * PROGRESSION_FACTOR)
            })
            .collect()
    }
}

/// Estimate an equivalent weight for a different rep target via the
/// Epley one-rep-max approximation, rounded up to a whole kilogram.
/// Degenerate rep counts (<= 0) return the previous weight unchanged.
pub fn estimate_weight_for_rep_target(prev_weight: f64, prev_reps: i32, new_reps: i32) -> f64 {
    if prev_reps <= 0 || new_reps <= 0 {
        return prev_weight;
    }
    let one_rep_max = prev_weight * (1.0 + prev_reps as f64 / 30.0);
    let new_weight = one_rep_max / (1.0 + new_reps as f64 / 30.0);
    // EPS keeps x*(a)/(a) from ceiling one kilo too high
    (new_weight - 1e-6).ceil()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(reps: i32, weight: f64) -> SetEntry {
        SetEntry { reps, weight }
    }

    fn plates(weights: &[f64]) -> PlateSet {
        PlateSet::new(weights.to_vec()).unwrap()
    }

    #[test]
    fn test_empty_plate_set_rejected() {
        let err = PlateSet::new(vec![]).unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyPlateSet);
    }

    #[test]
    fn test_non_positive_increment_rejected() {
        let err = PlateSet::new(vec![2.5, -5.0]).unwrap_err();
        assert_eq!(err, ConfigurationError::NonPositiveIncrement(-5.0));

        let err = PlateSet::new(vec![0.0]).unwrap_err();
        assert_eq!(err, ConfigurationError::NonPositiveIncrement(0.0));
    }

    #[test]
    fn test_plate_set_sorted_and_deduped() {
        let plates = plates(&[20.0, 2.5, 2.5, 10.0]);
        assert_eq!(plates.smallest(), 2.5);
        assert_eq!(plates.largest(), 20.0);
        assert_eq!(plates.round_up(3.0), 10.0);
    }

    #[test]
    fn test_round_up_exact_member_unchanged() {
        let plates = PlateSet::default_kg();
        assert_eq!(plates.round_up(5.0), 5.0);
        assert_eq!(plates.round_up(1.25), 1.25);
    }

    #[test]
    fn test_round_up_clamps_to_largest() {
        let plates = PlateSet::default_kg();
        // Candidate above every increment clamps, never fails
        assert_eq!(plates.round_up(63.0), 20.0);
    }

    #[test]
    fn test_round_up_never_below_smallest() {
        let plates = PlateSet::default_kg();
        assert_eq!(plates.round_up(0.0), 1.25);
        assert_eq!(plates.round_up(0.5), 1.25);
    }

    #[test]
    fn test_recommend_single_set() {
        let advisor = ProgressAdvisor::new(plates(&[2.5, 60.0, 62.5, 65.0, 70.0]));
        let rec = advisor.recommend(&[set(10, 60.0)]);
        // 60 * 1.05 = 63.0 -> next loadable weight is 65
        assert_eq!(rec, vec![65.0]);
    }

    #[test]
    fn test_recommend_preserves_order_and_length() {
        let advisor = ProgressAdvisor::new(
            PlateSet::steps(2.5, 300.0).unwrap(),
        );
        let session = [set(10, 60.0), set(8, 65.0), set(6, 70.0)];
        let rec = advisor.recommend(&session);

        assert_eq!(rec.len(), session.len());
        // 63.0 -> 65, 68.25 -> 70, 73.5 -> 75
        assert_eq!(rec, vec![65.0, 70.0, 75.0]);
    }

    #[test]
    fn test_recommend_identical_sets_identical_output() {
        let advisor = ProgressAdvisor::new(PlateSet::steps(2.5, 300.0).unwrap());
        let rec = advisor.recommend(&[set(10, 80.0), set(10, 80.0), set(10, 80.0)]);
        assert_eq!(rec, vec![85.0, 85.0, 85.0]);
    }

    #[test]
    fn test_recommend_at_least_five_percent_up() {
        let plates = PlateSet::steps(1.25, 500.0).unwrap();
        let advisor = ProgressAdvisor::new(plates.clone());
        for &w in &[2.5, 20.0, 57.5, 100.0, 142.5] {
            let rec = advisor.recommend(&[set(5, w)]);
            assert!(
                rec[0] >= w * PROGRESSION_FACTOR - 1e-9,
                "weight {}: got {}",
                w,
                rec[0]
            );
            assert_eq!(plates.round_up(rec[0]), rec[0], "{} is not loadable", rec[0]);
        }
    }

    #[test]
    fn test_recommend_bodyweight_default_policy() {
        // 0 kg rounds up to the smallest plate: time to load the bar
        let advisor = ProgressAdvisor::new(PlateSet::default_kg());
        let rec = advisor.recommend(&[set(20, 0.0)]);
        assert_eq!(rec, vec![1.25]);
    }

    #[test]
    fn test_recommend_bodyweight_keep_zero_policy() {
        let advisor = ProgressAdvisor::new(PlateSet::default_kg())
            .with_zero_weight_policy(ZeroWeightPolicy::KeepZero);
        let rec = advisor.recommend(&[set(20, 0.0), set(10, 60.0)]);
        assert_eq!(rec[0], 0.0);
        assert_eq!(rec[1], 20.0); // 63.0 clamps to largest of the small set
    }

    #[test]
    fn test_epley_same_reps_same_weight() {
        assert_eq!(estimate_weight_for_rep_target(100.0, 5, 5), 100.0);
    }

    #[test]
    fn test_epley_fewer_reps_more_weight() {
        // 100 kg x 10 -> 1RM ~133.3; at 5 reps ~114.3 -> 115
        let w = estimate_weight_for_rep_target(100.0, 10, 5);
        assert_eq!(w, 115.0);
        assert!(w > 100.0);
    }

    #[test]
    fn test_epley_more_reps_less_weight() {
        let w = estimate_weight_for_rep_target(100.0, 5, 10);
        assert!(w < 100.0, "got {}", w);
        // 1RM ~116.7; at 10 reps exactly 87.5
        assert_eq!(w, 88.0);
    }

    #[test]
    fn test_epley_degenerate_reps_unchanged() {
        assert_eq!(estimate_weight_for_rep_target(100.0, 0, 5), 100.0);
        assert_eq!(estimate_weight_for_rep_target(100.0, 5, 0), 100.0);
        assert_eq!(estimate_weight_for_rep_target(100.0, -3, 8), 100.0);
    }
}
