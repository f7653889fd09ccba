//! Semantic metrics: read commit types and components.

use chrono::Duration;

use crate::metrics::{MetricResult, Rating};
use crate::models::Commit;
use crate::sessions::{self, Session};
use crate::spirals::{self, FixChain};

/// A fix landing on the same component within this window voids the trust
/// credit of the preceding commit.
const TRUST_FOLLOW_UP_MINUTES: i64 = 30;

/// Commits per credited active hour.
pub fn velocity(commits: &[Commit], gap_minutes: i64) -> MetricResult {
    if commits.is_empty() {
        return MetricResult::new(
            0.0,
            "commits/hr",
            Rating::Elite,
            "no commits in window".to_string(),
        );
    }

    let hours = sessions::active_hours(commits, gap_minutes);
    let value = if hours > 0.0 {
        commits.len() as f64 / hours
    } else {
        0.0
    };

    let rating = if value >= 3.0 {
        Rating::Elite
    } else if value >= 1.5 {
        Rating::High
    } else if value >= 0.5 {
        Rating::Medium
    } else {
        Rating::Low
    };

    MetricResult::new(
        value,
        "commits/hr",
        rating,
        format!("{} commits over {:.1} active hours", commits.len(), hours),
    )
}

/// Percentage of commits that are fixes.
pub fn rework_ratio(commits: &[Commit]) -> MetricResult {
    if commits.is_empty() {
        return MetricResult::new(0.0, "%", Rating::Elite, "no commits in window".to_string());
    }

    let fixes = commits.iter().filter(|c| c.is_fix()).count();
    let value = fixes as f64 / commits.len() as f64 * 100.0;

    let rating = if value < 30.0 {
        Rating::Elite
    } else if value < 50.0 {
        Rating::High
    } else if value < 70.0 {
        Rating::Medium
    } else {
        Rating::Low
    };

    MetricResult::new(
        value,
        "%",
        rating,
        format!("{} of {} commits are fixes", fixes, commits.len()),
    )
}

/// Percentage of commits not followed by a quick fix on the same component.
///
/// A commit counts as trusted unless the *next* commit is a fix on the same
/// component within a 30-minute follow-up window. Expects chronological
/// order.
pub fn trust_pass_rate(commits: &[Commit]) -> MetricResult {
    if commits.is_empty() {
        return MetricResult::new(
            100.0,
            "%",
            Rating::Elite,
            "no commits in window".to_string(),
        );
    }

    let window = Duration::minutes(TRUST_FOLLOW_UP_MINUTES);
    let trusted = commits
        .iter()
        .enumerate()
        .filter(|(i, commit)| {
            let Some(next) = commits.get(i + 1) else {
                return true;
            };
            let quick_fix = next.is_fix()
                && next.date - commit.date <= window
                && next.component() == commit.component()
                && commit.component().is_some();
            !quick_fix
        })
        .count();

    let value = trusted as f64 / commits.len() as f64 * 100.0;

    let rating = if value > 95.0 {
        Rating::Elite
    } else if value >= 80.0 {
        Rating::High
    } else if value >= 60.0 {
        Rating::Medium
    } else {
        Rating::Low
    };

    MetricResult::new(
        value,
        "%",
        rating,
        format!(
            "{} of {} commits stuck without a quick follow-up fix",
            trusted,
            commits.len()
        ),
    )
}

/// Mean duration of detected spirals, in minutes. No spirals is the elite
/// zero result.
pub fn spiral_duration(chains: &[FixChain]) -> MetricResult {
    let spirals: Vec<&FixChain> = chains.iter().filter(|c| c.is_spiral).collect();
    if spirals.is_empty() {
        return MetricResult::new(0.0, "min", Rating::Elite, "no debug spirals".to_string());
    }

    let value =
        spirals.iter().map(|c| c.duration_minutes).sum::<f64>() / spirals.len() as f64;

    let rating = if value < 15.0 {
        Rating::Elite
    } else if value < 30.0 {
        Rating::High
    } else if value < 60.0 {
        Rating::Medium
    } else {
        Rating::Low
    };

    MetricResult::new(
        value,
        "min",
        rating,
        format!("{} spirals averaging {:.0} minutes", spirals.len(), value),
    )
}

/// Percentage of session time spent outside debug spirals.
pub fn flow_efficiency(sessions: &[Session], chains: &[FixChain]) -> MetricResult {
    let session_minutes: f64 = sessions.iter().map(|s| s.duration_minutes).sum();
    if session_minutes <= 0.0 {
        return MetricResult::new(
            100.0,
            "%",
            Rating::Elite,
            "no measurable session time".to_string(),
        );
    }

    let spiral_minutes: f64 = chains
        .iter()
        .filter(|c| c.is_spiral)
        .map(|c| c.duration_minutes)
        .sum();
    let value = (100.0 * (1.0 - spiral_minutes / session_minutes)).clamp(0.0, 100.0);

    let rating = if value >= 80.0 {
        Rating::Elite
    } else if value >= 60.0 {
        Rating::High
    } else if value >= 40.0 {
        Rating::Medium
    } else {
        Rating::Low
    };

    MetricResult::new(
        value,
        "%",
        rating,
        format!(
            "{:.0} of {:.0} session minutes spent in spirals",
            spiral_minutes, session_minutes
        ),
    )
}

/// Convenience wrapper: detect chains and score spiral duration in one call.
pub fn spiral_duration_for(commits: &[Commit]) -> MetricResult {
    spiral_duration(&spirals::detect_fix_chains(commits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::segment_sessions;
    use chrono::{TimeZone, Utc};

    fn commit(minute: i64, message: &str) -> Commit {
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        Commit::from_log_line(
            format!("h{:04}", minute),
            base + Duration::minutes(minute),
            message,
            "dev",
        )
    }

    #[test]
    fn velocity_empty_is_elite_zero() {
        let m = velocity(&[], 60);
        assert_eq!(m.value, 0.0);
        assert_eq!(m.rating, Rating::Elite);
    }

    #[test]
    fn velocity_counts_credited_hours() {
        // 3 commits in 30 minutes: credit max(30, 30) = 30 min -> 6/hr.
        let commits = vec![
            commit(0, "feat: a"),
            commit(15, "feat: b"),
            commit(30, "feat: c"),
        ];
        let m = velocity(&commits, 60);
        assert!((m.value - 6.0).abs() < 1e-9);
        assert_eq!(m.rating, Rating::Elite);
    }

    #[test]
    fn rework_ratio_bands() {
        let commits = vec![
            commit(0, "feat: a"),
            commit(5, "fix(a): b"),
            commit(10, "feat: c"),
            commit(15, "feat: d"),
        ];
        let m = rework_ratio(&commits);
        assert_eq!(m.value, 25.0);
        assert_eq!(m.rating, Rating::Elite);

        let all_fixes: Vec<Commit> = (0..4).map(|i| commit(i, "fix(x): y")).collect();
        assert_eq!(rework_ratio(&all_fixes).rating, Rating::Low);
    }

    #[test]
    fn rework_ratio_empty_is_elite() {
        assert_eq!(rework_ratio(&[]).rating, Rating::Elite);
    }

    #[test]
    fn trust_pass_rate_quick_fix_voids_credit() {
        let commits = vec![
            commit(0, "feat(auth): login"),
            commit(10, "fix(auth): login typo"),
            commit(120, "feat(ui): button"),
        ];
        let m = trust_pass_rate(&commits);
        // First commit untrusted (fix on auth 10 min later); other two pass.
        assert!((m.value - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(m.rating, Rating::Medium);
    }

    #[test]
    fn trust_pass_rate_slow_fix_keeps_credit() {
        let commits = vec![
            commit(0, "feat(auth): login"),
            commit(45, "fix(auth): login typo"),
        ];
        let m = trust_pass_rate(&commits);
        assert_eq!(m.value, 100.0);
        assert_eq!(m.rating, Rating::Elite);
    }

    #[test]
    fn trust_pass_rate_different_component_keeps_credit() {
        let commits = vec![
            commit(0, "feat(auth): login"),
            commit(5, "fix(ui): alignment"),
        ];
        assert_eq!(trust_pass_rate(&commits).value, 100.0);
    }

    #[test]
    fn spiral_duration_no_spirals_is_elite_zero() {
        let m = spiral_duration(&[]);
        assert_eq!(m.value, 0.0);
        assert_eq!(m.rating, Rating::Elite);
    }

    #[test]
    fn spiral_duration_mean_of_spirals() {
        let commits = vec![
            commit(0, "fix(auth): a"),
            commit(10, "fix(auth): b"),
            commit(20, "fix(auth): c"),
        ];
        let m = spiral_duration_for(&commits);
        assert_eq!(m.value, 20.0);
        assert_eq!(m.rating, Rating::High);
    }

    #[test]
    fn flow_efficiency_no_sessions_is_elite() {
        let m = flow_efficiency(&[], &[]);
        assert_eq!(m.value, 100.0);
        assert_eq!(m.rating, Rating::Elite);
    }

    #[test]
    fn flow_efficiency_discounts_spiral_time() {
        let commits = vec![
            commit(0, "feat: start"),
            commit(30, "fix(auth): a"),
            commit(40, "fix(auth): b"),
            commit(50, "fix(auth): c"),
            commit(100, "feat: done"),
        ];
        let sessions = segment_sessions(&commits, 60);
        let chains = spirals::detect_fix_chains(&commits);
        let m = flow_efficiency(&sessions, &chains);
        // 20 spiral minutes out of 100 session minutes.
        assert_eq!(m.value, 80.0);
        assert_eq!(m.rating, Rating::Elite);
    }
}
