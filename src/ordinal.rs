//! Ordinal (cumulative-logit) trust-level classifier.
//!
//! Six ordered levels (0-5) separated by five strictly increasing cut
//! points. The model is plain data plus pure functions: every operation
//! returns a new [`ModelState`] so the calibration store can persist
//! snapshots without aliasing concerns.

use serde::{Deserialize, Serialize};

use crate::utils::sigmoid;

/// Number of input features: five manual risk answers plus four normalized
/// signal metrics.
pub const FEATURE_COUNT: usize = 9;
/// Number of ordinal levels (0..=5).
pub const LEVEL_COUNT: usize = 6;
/// Number of cut points between levels.
pub const THRESHOLD_COUNT: usize = LEVEL_COUNT - 1;

/// Minimum spacing enforced between adjacent thresholds after an update.
const THRESHOLD_GAP: f64 = 1e-3;

/// Weights and cut points of the classifier. Immutable value: fitting
/// operations return updated copies.
///
/// Invariant: `thresholds` is strictly increasing. [`partial_fit`] repairs
/// it after every gradient step; deserialized states are repaired on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    pub weights: [f64; FEATURE_COUNT],
    pub thresholds: [f64; THRESHOLD_COUNT],
}

impl Default for ModelState {
    /// Hand-tuned starting point used until calibration has enough samples
    /// to retrain.
    fn default() -> Self {
        Self {
            weights: [-0.8, -0.6, -0.9, -0.7, -0.5, 1.2, 0.8, 1.0, 0.9],
            thresholds: [-3.0, -1.5, 0.0, 1.5, 3.0],
        }
    }
}

impl ModelState {
    /// Restore the strictly-increasing threshold invariant: sort, then space
    /// out any collapsed neighbors.
    #[must_use]
    pub fn with_repaired_thresholds(mut self) -> Self {
        self.thresholds
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        for i in 1..THRESHOLD_COUNT {
            if self.thresholds[i] <= self.thresholds[i - 1] + THRESHOLD_GAP {
                self.thresholds[i] = self.thresholds[i - 1] + THRESHOLD_GAP;
            }
        }
        self
    }

    fn eta(&self, features: &[f64; FEATURE_COUNT]) -> f64 {
        self.weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum()
    }
}

/// A predicted trust level with its full distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    /// Argmax level, 0-5.
    pub level: u8,
    /// Probability of the argmax level.
    pub confidence: f64,
    pub distribution: [f64; LEVEL_COUNT],
    /// Coarse 95% interval on the level, from the distribution's mean and
    /// variance, clamped to [0, 5].
    pub interval: (f64, f64),
}

/// Per-level probabilities for a feature vector. Always 6 non-negative
/// numbers summing to 1.
pub fn predict_proba(state: &ModelState, features: &[f64; FEATURE_COUNT]) -> [f64; LEVEL_COUNT] {
    let eta = state.eta(features);

    // P(Y <= k) = sigmoid(threshold_k - eta); per-level mass by successive
    // differences, clamped at zero for numerical safety.
    let mut cumulative = [0.0; THRESHOLD_COUNT];
    for (k, threshold) in state.thresholds.iter().enumerate() {
        cumulative[k] = sigmoid(threshold - eta);
    }

    let mut probs = [0.0; LEVEL_COUNT];
    probs[0] = cumulative[0];
    for k in 1..THRESHOLD_COUNT {
        probs[k] = (cumulative[k] - cumulative[k - 1]).max(0.0);
    }
    probs[LEVEL_COUNT - 1] = (1.0 - cumulative[THRESHOLD_COUNT - 1]).max(0.0);

    let total: f64 = probs.iter().sum();
    if total > 0.0 {
        for p in &mut probs {
            *p /= total;
        }
    }
    probs
}

/// Full prediction: argmax level, confidence, and a coarse interval.
pub fn predict(state: &ModelState, features: &[f64; FEATURE_COUNT]) -> Prediction {
    let distribution = predict_proba(state, features);

    let (level, confidence) = distribution
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, p)| (i as u8, *p))
        .unwrap_or((0, 0.0));

    let mean: f64 = distribution
        .iter()
        .enumerate()
        .map(|(k, p)| k as f64 * p)
        .sum();
    let variance: f64 = distribution
        .iter()
        .enumerate()
        .map(|(k, p)| (k as f64 - mean).powi(2) * p)
        .sum();
    let half_width = 1.96 * variance.sqrt();
    let interval = (
        (mean - half_width).clamp(0.0, 5.0),
        (mean + half_width).clamp(0.0, 5.0),
    );

    Prediction {
        level,
        confidence,
        distribution,
        interval,
    }
}

/// One online gradient step against an observed `(features, true_level)`
/// pair, using the all-threshold ordinal logistic update. Returns the new
/// state with the threshold invariant re-established.
#[must_use]
pub fn partial_fit(
    state: &ModelState,
    features: &[f64; FEATURE_COUNT],
    true_level: u8,
    learning_rate: f64,
) -> ModelState {
    let true_level = true_level.min(5);
    let eta = state.eta(features);

    let mut next = state.clone();
    let mut eta_gradient = 0.0;
    for k in 0..THRESHOLD_COUNT {
        let target = if true_level as usize <= k { 1.0 } else { 0.0 };
        let p = sigmoid(state.thresholds[k] - eta);
        next.thresholds[k] -= learning_rate * (p - target);
        eta_gradient += target - p;
    }
    for (w, x) in next.weights.iter_mut().zip(features) {
        *w -= learning_rate * x * eta_gradient;
    }

    next.with_repaired_thresholds()
}

/// Repeated [`partial_fit`] over a sample set for a bounded number of
/// epochs: `min(10, ceil(50 / n))`. Small sets get more passes, large sets
/// fewer, trading convergence against overfitting tiny samples.
#[must_use]
pub fn batch_fit(
    state: &ModelState,
    samples: &[([f64; FEATURE_COUNT], u8)],
    learning_rate: f64,
) -> ModelState {
    if samples.is_empty() {
        return state.clone();
    }

    let epochs = (50.0 / samples.len() as f64).ceil().min(10.0) as usize;
    let mut current = state.clone();
    for _ in 0..epochs.max(1) {
        for (features, level) in samples {
            current = partial_fit(&current, features, *level, learning_rate);
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid_distribution(probs: &[f64; LEVEL_COUNT]) {
        for p in probs {
            assert!(*p >= 0.0, "negative probability {p}");
        }
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "probabilities sum to {sum}");
    }

    fn assert_strictly_increasing(thresholds: &[f64; THRESHOLD_COUNT]) {
        for pair in thresholds.windows(2) {
            assert!(pair[0] < pair[1], "thresholds not increasing: {pair:?}");
        }
    }

    #[test]
    fn default_thresholds_are_strictly_increasing() {
        assert_strictly_increasing(&ModelState::default().thresholds);
    }

    #[test]
    fn proba_well_formed_for_arbitrary_features() {
        let state = ModelState::default();
        let cases: [[f64; FEATURE_COUNT]; 4] = [
            [0.0; FEATURE_COUNT],
            [1.0; FEATURE_COUNT],
            [-50.0, 30.0, 0.1, -0.7, 2.0, 100.0, -3.0, 0.0, 9.9],
            [1e6, -1e6, 1e-9, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5],
        ];
        for features in &cases {
            assert_valid_distribution(&predict_proba(&state, features));
        }
    }

    #[test]
    fn low_eta_prefers_low_levels() {
        let state = ModelState::default();
        // High risk answers, terrible metrics: eta well below the lowest cut.
        let risky = [1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let safe = [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let p_risky = predict(&state, &risky);
        let p_safe = predict(&state, &safe);
        assert!(p_risky.level < p_safe.level);
    }

    #[test]
    fn prediction_interval_is_ordered_and_clamped() {
        let state = ModelState::default();
        let p = predict(&state, &[0.5; FEATURE_COUNT]);
        assert!(p.interval.0 <= p.interval.1);
        assert!(p.interval.0 >= 0.0 && p.interval.1 <= 5.0);
    }

    #[test]
    fn partial_fit_keeps_thresholds_increasing() {
        let mut state = ModelState::default();
        let features = [10.0, -3.0, 0.0, 7.0, 0.5, 1.0, 1.0, 0.0, -2.0];
        // A large learning rate tries hard to cross thresholds.
        for level in [0u8, 5, 2, 5, 0, 3] {
            state = partial_fit(&state, &features, level, 5.0);
            assert_strictly_increasing(&state.thresholds);
        }
    }

    #[test]
    fn partial_fit_moves_toward_observed_level() {
        let state = ModelState::default();
        let features = [0.2, 0.2, 0.2, 0.2, 0.2, 0.8, 0.8, 0.8, 0.8];
        let before = predict_proba(&state, &features)[5];

        let mut fitted = state.clone();
        for _ in 0..50 {
            fitted = partial_fit(&fitted, &features, 5, 0.1);
        }
        let after = predict_proba(&fitted, &features)[5];
        assert!(after > before, "P(level 5) should rise: {before} -> {after}");
    }

    #[test]
    fn repair_fixes_collapsed_thresholds() {
        let state = ModelState {
            weights: [0.0; FEATURE_COUNT],
            thresholds: [2.0, 2.0, 1.0, 2.0, 2.0],
        }
        .with_repaired_thresholds();
        assert_strictly_increasing(&state.thresholds);
    }

    #[test]
    fn batch_fit_empty_is_identity() {
        let state = ModelState::default();
        assert_eq!(batch_fit(&state, &[], 0.05), state);
    }

    #[test]
    fn batch_fit_learns_separation() {
        let state = ModelState {
            weights: [0.0; FEATURE_COUNT],
            thresholds: [-2.0, -1.0, 0.0, 1.0, 2.0],
        };
        let low = ([1.0, 1.0, 1.0, 1.0, 1.0, 0.1, 0.1, 0.1, 0.1], 1u8);
        let high = ([0.1, 0.1, 0.1, 0.1, 0.1, 1.0, 1.0, 1.0, 1.0], 4u8);
        let samples = vec![low, high, low, high, low, high];

        let fitted = batch_fit(&state, &samples, 0.1);
        let p_low = predict(&fitted, &low.0);
        let p_high = predict(&fitted, &high.0);
        assert!(p_low.level < p_high.level);
        assert_strictly_increasing(&fitted.thresholds);
    }
}
