//! Calibration learner: accumulates observed outcomes, measures expected
//! calibration error, and retrains the ordinal model once enough evidence
//! exists.

pub mod store;

pub use store::{CalibrationStore, FileCalibrationStore, MemoryCalibrationStore};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::ordinal::{self, ModelState, FEATURE_COUNT};

/// Retraining is refused below this sample count: fitting 14 free parameters
/// on fewer observations is worse than keeping the hand-tuned defaults.
pub const MIN_TRAINING_SAMPLES: usize = 5;
/// ECE above this marks the model as drifting and forces a retrain.
pub const ECE_DRIFT_THRESHOLD: f64 = 0.15;
/// Retrain whenever the sample count is an exact multiple of this.
pub const RETRAIN_INTERVAL: usize = 10;

const LEARNING_RATE: f64 = 0.05;
const INITIAL_VERSION: &str = "v1";

/// Errors from calibration persistence.
#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(String),
}

/// How a declared trust level compared with the session's VibeScore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Score landed inside the declared level's expected range.
    Correct,
    /// Declared level was too aggressive: score fell below the range.
    TooHigh,
    /// Declared level was too conservative: score exceeded the range.
    TooLow,
}

/// One captured observation. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationSample {
    pub timestamp: DateTime<Utc>,
    pub vibe_score: f64,
    pub declared_level: u8,
    pub outcome: Outcome,
    pub features: Vec<f64>,
    pub model_version: String,
}

/// The durable calibration unit: samples plus the current model, persisted
/// after every addition and every retrain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationState {
    pub samples: Vec<CalibrationSample>,
    #[serde(flatten)]
    pub model: ModelState,
    pub ece: f64,
    pub last_updated: DateTime<Utc>,
    pub version: String,
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            model: ModelState::default(),
            ece: 0.0,
            last_updated: Utc::now(),
            version: INITIAL_VERSION.to_string(),
        }
    }
}

/// Lifecycle phase of the calibrated model, derived from the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelPhase {
    /// Hand-tuned weights, no samples yet.
    Default,
    /// Samples accumulating, below the retrain minimum.
    Collecting,
    /// Retrained at least once, ECE within bounds.
    Calibrated,
    /// ECE exceeded the drift threshold; next retrain resets this.
    Drifting,
}

impl CalibrationState {
    pub fn phase(&self) -> ModelPhase {
        if self.samples.is_empty() {
            ModelPhase::Default
        } else if self.samples.len() < MIN_TRAINING_SAMPLES {
            ModelPhase::Collecting
        } else if self.ece > ECE_DRIFT_THRESHOLD {
            ModelPhase::Drifting
        } else if self.version != INITIAL_VERSION {
            ModelPhase::Calibrated
        } else {
            ModelPhase::Collecting
        }
    }
}

/// Expected VibeScore range for a declared trust level.
pub fn level_range(level: u8) -> (f64, f64) {
    match level.min(5) {
        5 => (0.90, 1.00),
        4 => (0.80, 0.90),
        3 => (0.65, 0.80),
        2 => (0.50, 0.70),
        1 => (0.30, 0.55),
        _ => (0.00, 0.40),
    }
}

/// Infer a trust level from a raw score, using the same range boundaries.
/// Used to manufacture training labels when retraining from history.
pub fn level_for_score(score: f64) -> u8 {
    if score >= 0.90 {
        5
    } else if score >= 0.80 {
        4
    } else if score >= 0.65 {
        3
    } else if score >= 0.50 {
        2
    } else if score >= 0.30 {
        1
    } else {
        0
    }
}

/// Compare a computed score against a declared level's expected range.
pub fn assess_outcome(score: f64, declared_level: u8) -> Outcome {
    let (min, max) = level_range(declared_level);
    if score > max {
        Outcome::TooLow
    } else if score < min {
        Outcome::TooHigh
    } else {
        Outcome::Correct
    }
}

/// Expected Calibration Error over the whole sample set, grouped into six
/// bins by declared level: `sum (bin/N) * |mean(score in bin) - bin center|`.
/// Empty input is zero; any non-empty input lands in [0, 1].
pub fn calculate_ece(samples: &[CalibrationSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let total = samples.len() as f64;
    let mut ece = 0.0;
    for level in 0u8..=5 {
        let scores: Vec<f64> = samples
            .iter()
            .filter(|s| s.declared_level == level)
            .map(|s| s.vibe_score)
            .collect();
        if scores.is_empty() {
            continue;
        }
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        let (min, max) = level_range(level);
        let center = (min + max) / 2.0;
        ece += (scores.len() as f64 / total) * (mean - center).abs();
    }
    ece
}

/// Learner over a persistence backend. Loads state lazily, appends samples,
/// retrains when due, and persists after every mutation.
pub struct CalibrationLearner<S: CalibrationStore> {
    store: S,
}

impl<S: CalibrationStore> CalibrationLearner<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Current persisted state, or the default when absent/corrupt.
    pub fn state(&self) -> CalibrationState {
        self.store.load()
    }

    /// Record one observation: assess the outcome, append the sample,
    /// refresh the ECE, retrain when due, and persist. Returns the updated
    /// state.
    pub fn observe(
        &self,
        features: [f64; FEATURE_COUNT],
        declared_level: u8,
        vibe_score: f64,
    ) -> Result<CalibrationState, CalibrationError> {
        let mut state = self.store.load();

        let sample = CalibrationSample {
            timestamp: Utc::now(),
            vibe_score,
            declared_level: declared_level.min(5),
            outcome: assess_outcome(vibe_score, declared_level),
            features: features.to_vec(),
            model_version: state.version.clone(),
        };
        debug!(
            "recording calibration sample: level {} score {:.2} -> {:?}",
            sample.declared_level, vibe_score, sample.outcome
        );
        state.samples.push(sample);
        state.ece = calculate_ece(&state.samples);

        if should_retrain(&state) {
            retrain(&mut state);
        }

        state.last_updated = Utc::now();
        self.store.save(&state)?;
        Ok(state)
    }
}

/// Retrain when the count hits an exact multiple of [`RETRAIN_INTERVAL`] or
/// the ECE drifts, but never below [`MIN_TRAINING_SAMPLES`].
fn should_retrain(state: &CalibrationState) -> bool {
    let n = state.samples.len();
    if n < MIN_TRAINING_SAMPLES {
        return false;
    }
    n % RETRAIN_INTERVAL == 0 || state.ece > ECE_DRIFT_THRESHOLD
}

/// Refit the model from history, labeling each sample by its recorded
/// VibeScore, then bump the version and refresh the ECE.
fn retrain(state: &mut CalibrationState) {
    let training: Vec<([f64; FEATURE_COUNT], u8)> = state
        .samples
        .iter()
        .filter_map(|s| {
            let features: [f64; FEATURE_COUNT] = s.features.as_slice().try_into().ok()?;
            Some((features, level_for_score(s.vibe_score)))
        })
        .collect();

    if training.len() < MIN_TRAINING_SAMPLES {
        warn!(
            "skipping retrain: only {} usable samples of {}",
            training.len(),
            state.samples.len()
        );
        return;
    }

    state.model = ordinal::batch_fit(&state.model, &training, LEARNING_RATE);
    state.version = bump_version(&state.version);
    state.ece = calculate_ece(&state.samples);
    info!(
        "retrained calibration model on {} samples -> {}",
        training.len(),
        state.version
    );
}

fn bump_version(version: &str) -> String {
    let n = version
        .strip_prefix('v')
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or(1);
    format!("v{}", n + 1)
}
