//! Composite metric engine.
//!
//! Nine metrics over a commit window: five "semantic" metrics that read
//! commit types and components, and four "semantic-free" signals that only
//! look at timing and diff shape. Every metric degrades to a defined
//! neutral/elite default on empty input: absence of evidence is treated as
//! absence of a problem, and downstream scoring depends on those defaults.

pub mod semantic;
pub mod signal;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Four-level ordinal rating. Ordering: `Low < Medium < High < Elite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Low,
    Medium,
    High,
    Elite,
}

impl Display for Rating {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Elite => "elite",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        write!(f, "{}", s)
    }
}

/// A computed metric: normalized value, unit, rating band, and a
/// human-readable rationale. Stateless; recomputed per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricResult {
    pub value: f64,
    pub unit: String,
    pub rating: Rating,
    pub detail: String,
}

impl MetricResult {
    pub fn new(value: f64, unit: impl Into<String>, rating: Rating, detail: String) -> Self {
        Self {
            value,
            unit: unit.into(),
            rating,
            detail,
        }
    }
}
