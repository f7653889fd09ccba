//! VibeScore: weighted linear combination of the four semantic-free signals.

use serde::{Deserialize, Serialize};

use crate::metrics::MetricResult;

/// Weights over the four semantic-free signals. Must sum to 1.0 when used;
/// [`ScoreWeights::normalized`] rescales arbitrary weight sets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWeights {
    pub file_churn: f64,
    pub time_spiral: f64,
    pub velocity_anomaly: f64,
    pub code_stability: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            file_churn: 0.30,
            time_spiral: 0.25,
            velocity_anomaly: 0.20,
            code_stability: 0.25,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.file_churn + self.time_spiral + self.velocity_anomaly + self.code_stability
    }

    /// Rescale so the weights sum to 1.0. All-zero weights fall back to the
    /// defaults rather than dividing by zero.
    pub fn normalized(&self) -> Self {
        let sum = self.sum();
        if sum <= 0.0 {
            return Self::default();
        }
        Self {
            file_churn: self.file_churn / sum,
            time_spiral: self.time_spiral / sum,
            velocity_anomaly: self.velocity_anomaly / sum,
            code_stability: self.code_stability / sum,
        }
    }
}

/// The four signal values normalized to [0, 1], kept for auditability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreComponents {
    pub file_churn: f64,
    pub time_spiral: f64,
    pub velocity_anomaly: f64,
    pub code_stability: f64,
}

impl ScoreComponents {
    /// As the metric half of the 9-dimensional model feature vector.
    pub fn as_features(&self) -> [f64; 4] {
        [
            self.file_churn,
            self.time_spiral,
            self.velocity_anomaly,
            self.code_stability,
        ]
    }
}

/// Composite score in [0, 1] with the inputs and weights that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VibeScore {
    pub value: f64,
    pub components: ScoreComponents,
    pub weights: ScoreWeights,
}

impl VibeScore {
    /// Combine the four signal metrics (values on a 0-100 scale) under the
    /// given weights.
    pub fn compute(
        file_churn: &MetricResult,
        time_spiral: &MetricResult,
        velocity_anomaly: &MetricResult,
        code_stability: &MetricResult,
        weights: ScoreWeights,
    ) -> Self {
        let weights = weights.normalized();
        let components = ScoreComponents {
            file_churn: (file_churn.value / 100.0).clamp(0.0, 1.0),
            time_spiral: (time_spiral.value / 100.0).clamp(0.0, 1.0),
            velocity_anomaly: (velocity_anomaly.value / 100.0).clamp(0.0, 1.0),
            code_stability: (code_stability.value / 100.0).clamp(0.0, 1.0),
        };
        let value = weights.file_churn * components.file_churn
            + weights.time_spiral * components.time_spiral
            + weights.velocity_anomaly * components.velocity_anomaly
            + weights.code_stability * components.code_stability;

        Self {
            value,
            components,
            weights,
        }
    }
}
