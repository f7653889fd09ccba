//! Semantic-free signals: timing and diff shape only, no message semantics.
//!
//! Values are carried on a 0-100 scale so the VibeScore aggregation
//! `sum(w_i * value_i / 100)` lands in [0, 1].

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::metrics::{MetricResult, Rating};
use crate::models::{Commit, CommitStats};
use crate::sessions;
use crate::utils::sigmoid;

/// Three touches to one file inside this window mark it as churned.
const CHURN_WINDOW_MINUTES: i64 = 60;
const CHURN_TOUCHES: usize = 3;

/// Consecutive commits closer than this look like frantic iteration.
const RAPID_FIRE_MINUTES: i64 = 5;

/// Default velocity baseline: commits per active hour.
#[derive(Debug, Clone, Copy)]
pub struct VelocityBaseline {
    pub mean: f64,
    pub std_dev: f64,
}

impl Default for VelocityBaseline {
    fn default() -> Self {
        Self {
            mean: 3.0,
            std_dev: 1.5,
        }
    }
}

fn ratio_rating(ratio: f64) -> Rating {
    if ratio < 0.10 {
        Rating::Elite
    } else if ratio < 0.25 {
        Rating::High
    } else if ratio < 0.40 {
        Rating::Medium
    } else {
        Rating::Low
    }
}

/// Fraction of touched files rewritten repeatedly in a short window.
///
/// `stats` runs parallel to `commits`; commits with no stats (failed diff
/// read) contribute nothing.
pub fn file_churn(commits: &[Commit], stats: &[CommitStats]) -> MetricResult {
    let mut touches: HashMap<&str, Vec<DateTime<Utc>>> = HashMap::new();
    for (commit, stat) in commits.iter().zip(stats) {
        for file in &stat.files {
            touches.entry(file.as_str()).or_default().push(commit.date);
        }
    }

    if touches.is_empty() {
        return MetricResult::new(
            100.0,
            "score",
            Rating::Elite,
            "no file statistics available".to_string(),
        );
    }

    let total = touches.len();
    let mut churned = 0;
    for times in touches.values_mut() {
        times.sort();
        let rapid = times
            .windows(CHURN_TOUCHES)
            .any(|w| w[CHURN_TOUCHES - 1] - w[0] <= Duration::minutes(CHURN_WINDOW_MINUTES));
        if rapid {
            churned += 1;
        }
    }

    let ratio = churned as f64 / total as f64;
    MetricResult::new(
        (1.0 - ratio) * 100.0,
        "score",
        ratio_rating(ratio),
        format!("{} of {} files churned within an hour", churned, total),
    )
}

/// Fraction of consecutive commit pairs landing less than five minutes apart.
/// Expects chronological order.
pub fn time_spiral(commits: &[Commit]) -> MetricResult {
    if commits.len() < 2 {
        return MetricResult::new(
            100.0,
            "score",
            Rating::Elite,
            "not enough commits to pair".to_string(),
        );
    }

    let pairs = commits.len() - 1;
    let rapid = commits
        .windows(2)
        .filter(|w| (w[1].date - w[0].date).num_minutes() < RAPID_FIRE_MINUTES)
        .count();

    let fraction = rapid as f64 / pairs as f64;
    MetricResult::new(
        (1.0 - fraction) * 100.0,
        "score",
        ratio_rating(fraction),
        format!("{} of {} commit gaps under {} minutes", rapid, pairs, RAPID_FIRE_MINUTES),
    )
}

/// How far current velocity sits from the baseline, squashed to a score.
pub fn velocity_anomaly(
    commits: &[Commit],
    gap_minutes: i64,
    baseline: VelocityBaseline,
) -> MetricResult {
    if commits.is_empty() {
        return MetricResult::new(
            100.0,
            "score",
            Rating::Elite,
            "no commits in window".to_string(),
        );
    }

    let hours = sessions::active_hours(commits, gap_minutes);
    let velocity = if hours > 0.0 {
        commits.len() as f64 / hours
    } else {
        0.0
    };
    let z = ((velocity - baseline.mean) / baseline.std_dev).abs();
    let value = sigmoid(1.5 - z) * 100.0;

    let rating = if z < 1.0 {
        Rating::Elite
    } else if z < 1.5 {
        Rating::High
    } else if z < 2.0 {
        Rating::Medium
    } else {
        Rating::Low
    };

    MetricResult::new(
        value,
        "score",
        rating,
        format!("velocity {:.1}/hr, {:.1} sigma from baseline", velocity, z),
    )
}

/// Additions kept versus deleted again.
///
/// With line stats: `1 - 0.5 * min(deletions/additions, 1)`. Without stats,
/// estimated from the fraction of fix/revert/undo-worded commits.
pub fn code_stability(commits: &[Commit], stats: &[CommitStats]) -> MetricResult {
    let additions: u64 = stats.iter().map(|s| s.additions).sum();
    let deletions: u64 = stats.iter().map(|s| s.deletions).sum();

    let (score, detail) = if additions > 0 || deletions > 0 {
        let ratio = if additions == 0 {
            1.0
        } else {
            (deletions as f64 / additions as f64).min(1.0)
        };
        (
            1.0 - 0.5 * ratio,
            format!("+{} / -{} lines", additions, deletions),
        )
    } else if commits.is_empty() {
        (1.0, "no commits in window".to_string())
    } else {
        let unstable = commits
            .iter()
            .filter(|c| {
                let msg = c.message.to_lowercase();
                c.is_fix()
                    || msg.contains("revert")
                    || msg.contains("undo")
                    || msg.contains("rollback")
            })
            .count();
        let fraction = unstable as f64 / commits.len() as f64;
        (
            1.0 - fraction,
            format!(
                "no line stats; {} of {} commits look corrective",
                unstable,
                commits.len()
            ),
        )
    };

    let rating = if score >= 0.85 {
        Rating::Elite
    } else if score >= 0.70 {
        Rating::High
    } else if score >= 0.50 {
        Rating::Medium
    } else {
        Rating::Low
    };

    MetricResult::new(score * 100.0, "score", rating, detail)
}
