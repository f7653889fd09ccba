//! Session segmentation: partition a commit stream by inactivity gaps.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Commit;

/// Minutes credited to a session per commit when the wall-clock span is
/// shorter (a one-commit session still represents real work time).
const MIN_MINUTES_PER_COMMIT: f64 = 10.0;

/// A maximal run of commits with no gap exceeding the segmentation threshold.
/// Always non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub commits: Vec<Commit>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Wall-clock span from first to last commit, in minutes.
    pub duration_minutes: f64,
}

impl Session {
    fn from_commits(commits: Vec<Commit>) -> Self {
        debug_assert!(!commits.is_empty());
        let started_at = commits[0].date;
        let ended_at = commits[commits.len() - 1].date;
        let duration_minutes = (ended_at - started_at).num_seconds() as f64 / 60.0;
        Self {
            commits,
            started_at,
            ended_at,
            duration_minutes,
        }
    }

    pub fn commit_count(&self) -> usize {
        self.commits.len()
    }

    /// Minutes of work credited to this session: at least
    /// [`MIN_MINUTES_PER_COMMIT`] per commit.
    pub fn credited_minutes(&self) -> f64 {
        self.duration_minutes
            .max(MIN_MINUTES_PER_COMMIT * self.commits.len() as f64)
    }
}

/// Rollup over a set of sessions. Empty input yields the all-zero value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub session_count: usize,
    pub total_commits: usize,
    pub mean_duration_minutes: f64,
    pub mean_commits_per_session: f64,
    /// Credited work time across all sessions, in hours.
    pub active_hours: f64,
}

/// Partition `commits` into sessions: sort ascending by timestamp and start a
/// new session whenever the gap to the previous commit strictly exceeds
/// `gap_minutes`. Every input commit lands in exactly one session and sessions
/// are emitted in start-time order.
pub fn segment_sessions(commits: &[Commit], gap_minutes: i64) -> Vec<Session> {
    if commits.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<Commit> = commits.to_vec();
    sorted.sort_by_key(|c| c.date);

    let mut sessions = Vec::new();
    let mut current: Vec<Commit> = Vec::new();

    for commit in sorted {
        if let Some(prev) = current.last() {
            // Full-resolution comparison: a 60m30s gap exceeds a 60-minute
            // threshold even though it truncates to 60 whole minutes.
            if commit.date - prev.date > Duration::minutes(gap_minutes) {
                sessions.push(Session::from_commits(std::mem::take(&mut current)));
            }
        }
        current.push(commit);
    }
    sessions.push(Session::from_commits(current));

    sessions
}

/// Compute aggregate statistics over sessions.
pub fn session_stats(sessions: &[Session]) -> SessionStats {
    if sessions.is_empty() {
        return SessionStats::default();
    }

    let total_commits: usize = sessions.iter().map(Session::commit_count).sum();
    let total_duration: f64 = sessions.iter().map(|s| s.duration_minutes).sum();
    let active_minutes: f64 = sessions.iter().map(Session::credited_minutes).sum();

    SessionStats {
        session_count: sessions.len(),
        total_commits,
        mean_duration_minutes: total_duration / sessions.len() as f64,
        mean_commits_per_session: total_commits as f64 / sessions.len() as f64,
        active_hours: active_minutes / 60.0,
    }
}

/// Credited active hours for a commit set, using the same session-gap logic
/// as segmentation. Used by the velocity metrics.
pub fn active_hours(commits: &[Commit], gap_minutes: i64) -> f64 {
    segment_sessions(commits, gap_minutes)
        .iter()
        .map(Session::credited_minutes)
        .sum::<f64>()
        / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn commit_at(minute_offset: i64) -> Commit {
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        Commit::from_log_line(
            format!("c{:04}", minute_offset),
            base + chrono::Duration::minutes(minute_offset),
            "feat: work",
            "dev",
        )
    }

    #[test]
    fn empty_input_yields_no_sessions() {
        assert!(segment_sessions(&[], 60).is_empty());
        let stats = session_stats(&[]);
        assert_eq!(stats.session_count, 0);
        assert_eq!(stats.active_hours, 0.0);
    }

    #[test]
    fn single_commit_yields_one_session() {
        let sessions = segment_sessions(&[commit_at(0)], 60);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].commit_count(), 1);
        assert_eq!(sessions[0].duration_minutes, 0.0);
        assert_eq!(sessions[0].credited_minutes(), 10.0);
    }

    #[test]
    fn splits_on_gap_over_threshold() {
        // Offsets 0, 50, 140 with a 60-minute threshold: gap 50 keeps the
        // first pair together, gap 90 starts a new session.
        let commits = vec![commit_at(0), commit_at(50), commit_at(140)];
        let sessions = segment_sessions(&commits, 60);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].commit_count(), 2);
        assert_eq!(sessions[1].commit_count(), 1);
    }

    #[test]
    fn gap_exactly_at_threshold_stays_in_session() {
        let commits = vec![commit_at(0), commit_at(60)];
        let sessions = segment_sessions(&commits, 60);
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn sub_minute_overage_splits_the_session() {
        // 60m30s truncates to 60 whole minutes but still exceeds the
        // threshold.
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let commits = vec![
            commit_at(0),
            Commit::from_log_line(
                "c-late",
                base + Duration::seconds(60 * 60 + 30),
                "feat: work",
                "dev",
            ),
        ];
        let sessions = segment_sessions(&commits, 60);
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn partition_covers_all_commits_in_order() {
        let offsets = [300, 0, 45, 500, 90, 200, 1000];
        let commits: Vec<Commit> = offsets.iter().map(|&m| commit_at(m)).collect();
        let sessions = segment_sessions(&commits, 60);

        let mut seen: Vec<&str> = sessions
            .iter()
            .flat_map(|s| s.commits.iter().map(|c| c.hash.as_str()))
            .collect();
        assert_eq!(seen.len(), commits.len());
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), commits.len());

        for pair in sessions.windows(2) {
            assert!(pair[0].started_at <= pair[1].started_at);
        }
    }

    #[test]
    fn stats_rollup() {
        let commits = vec![commit_at(0), commit_at(30), commit_at(200)];
        let sessions = segment_sessions(&commits, 60);
        let stats = session_stats(&sessions);
        assert_eq!(stats.session_count, 2);
        assert_eq!(stats.total_commits, 3);
        assert_eq!(stats.mean_duration_minutes, 15.0);
        // Session 1: span 30 vs credit 20 -> 30; session 2: credit 10.
        assert!((stats.active_hours - 40.0 / 60.0).abs() < 1e-9);
    }
}
