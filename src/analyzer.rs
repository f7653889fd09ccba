//! Pipeline assembly: commits -> sessions -> fix chains -> metrics ->
//! VibeScore -> trust recommendation -> calibration record.
//!
//! Nothing in here is fatal. Git failures degrade to empty data, a failed
//! per-commit stat read degrades that one commit to zeros, and a failed
//! calibration save is logged and skipped; the worst outcome is a
//! less-informative default report.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationLearner, CalibrationStore, ModelPhase};
use crate::git::GitOps;
use crate::metrics::{semantic, signal, MetricResult};
use crate::models::{Commit, CommitStats};
use crate::ordinal::{self, Prediction, FEATURE_COUNT};
use crate::score::{ScoreWeights, VibeScore};
use crate::sessions::{self, SessionStats};
use crate::spirals::{self, FixChain};

/// Number of manual risk answers in the feature vector.
pub const RISK_ANSWER_COUNT: usize = 5;

/// Tunables for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// How many commits of history to read.
    pub limit: usize,
    /// Session inactivity gap, minutes.
    pub gap_minutes: i64,
    /// Five manual risk answers in [0, 1]; 0 is safest.
    pub risk_answers: [f64; RISK_ANSWER_COUNT],
    /// Human-asserted trust level; enables calibration recording.
    pub declared_level: Option<u8>,
    /// Record a calibration sample when a level is declared.
    pub record: bool,
    pub weights: ScoreWeights,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            limit: 100,
            gap_minutes: 60,
            risk_answers: [0.5; RISK_ANSWER_COUNT],
            declared_level: None,
            record: true,
            weights: ScoreWeights::default(),
        }
    }
}

/// All nine metrics by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSet {
    pub velocity: MetricResult,
    pub rework_ratio: MetricResult,
    pub trust_pass_rate: MetricResult,
    pub spiral_duration: MetricResult,
    pub flow_efficiency: MetricResult,
    pub file_churn: MetricResult,
    pub time_spiral: MetricResult,
    pub velocity_anomaly: MetricResult,
    pub code_stability: MetricResult,
}

/// The commit window that was analyzed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    pub commit_count: usize,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Full analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub window: WindowInfo,
    pub session_stats: SessionStats,
    pub fix_chains: Vec<FixChain>,
    pub metrics: MetricSet,
    pub vibe_score: VibeScore,
    pub recommendation: Prediction,
    pub model_phase: ModelPhase,
    /// Whether a calibration sample was recorded for this run.
    pub recorded: bool,
}

/// Run the full pipeline against a repository.
pub fn analyze<G, S>(
    git: &G,
    learner: &CalibrationLearner<S>,
    opts: &AnalyzeOptions,
) -> Analysis
where
    G: GitOps,
    S: CalibrationStore,
{
    let commits = match git.read_commits(opts.limit) {
        Ok(commits) => commits,
        Err(e) => {
            warn!("failed to read commit history: {}; analyzing empty window", e);
            Vec::new()
        }
    };

    // Diff stats are fetched sequentially, one commit at a time. A failing
    // read degrades that commit's stats to zero rather than aborting.
    let stats: Vec<CommitStats> = commits
        .iter()
        .map(|c| {
            git.read_commit_stats(&c.hash).unwrap_or_else(|e| {
                warn!("no diff stats for {}: {}", c.hash, e);
                CommitStats::default()
            })
        })
        .collect();

    analyze_commits(&commits, &stats, learner, opts)
}

/// Pipeline over already-normalized commits. Exposed for embedding and
/// tests; [`analyze`] is the git-backed entry point.
pub fn analyze_commits<S: CalibrationStore>(
    commits: &[Commit],
    stats: &[CommitStats],
    learner: &CalibrationLearner<S>,
    opts: &AnalyzeOptions,
) -> Analysis {
    let sessions = sessions::segment_sessions(commits, opts.gap_minutes);
    let session_stats = sessions::session_stats(&sessions);
    let fix_chains = spirals::detect_fix_chains(commits);

    let metrics = MetricSet {
        velocity: semantic::velocity(commits, opts.gap_minutes),
        rework_ratio: semantic::rework_ratio(commits),
        trust_pass_rate: semantic::trust_pass_rate(commits),
        spiral_duration: semantic::spiral_duration(&fix_chains),
        flow_efficiency: semantic::flow_efficiency(&sessions, &fix_chains),
        file_churn: signal::file_churn(commits, stats),
        time_spiral: signal::time_spiral(commits),
        velocity_anomaly: signal::velocity_anomaly(
            commits,
            opts.gap_minutes,
            signal::VelocityBaseline::default(),
        ),
        code_stability: signal::code_stability(commits, stats),
    };

    let vibe_score = VibeScore::compute(
        &metrics.file_churn,
        &metrics.time_spiral,
        &metrics.velocity_anomaly,
        &metrics.code_stability,
        opts.weights,
    );

    let features = feature_vector(&opts.risk_answers, &vibe_score);
    let mut state = learner.state();
    let recommendation = ordinal::predict(&state.model, &features);

    let mut recorded = false;
    if opts.record {
        if let Some(declared) = opts.declared_level {
            match learner.observe(features, declared, vibe_score.value) {
                Ok(updated) => {
                    state = updated;
                    recorded = true;
                }
                Err(e) => warn!("failed to record calibration sample: {}", e),
            }
        }
    }

    Analysis {
        window: WindowInfo {
            commit_count: commits.len(),
            from: commits.first().map(|c| c.date),
            to: commits.last().map(|c| c.date),
        },
        session_stats,
        fix_chains,
        metrics,
        vibe_score,
        recommendation,
        model_phase: state.phase(),
        recorded,
    }
}

/// Assemble the 9-dimensional feature vector: five risk answers followed by
/// the four normalized signal components.
pub fn feature_vector(
    risk_answers: &[f64; RISK_ANSWER_COUNT],
    score: &VibeScore,
) -> [f64; FEATURE_COUNT] {
    let metrics = score.components.as_features();
    [
        risk_answers[0].clamp(0.0, 1.0),
        risk_answers[1].clamp(0.0, 1.0),
        risk_answers[2].clamp(0.0, 1.0),
        risk_answers[3].clamp(0.0, 1.0),
        risk_answers[4].clamp(0.0, 1.0),
        metrics[0],
        metrics[1],
        metrics[2],
        metrics[3],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::MemoryCalibrationStore;
    use chrono::{Duration, TimeZone};

    fn commit(minute: i64, message: &str) -> Commit {
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        Commit::from_log_line(
            format!("h{:04}", minute),
            base + Duration::minutes(minute),
            message,
            "dev",
        )
    }

    fn learner() -> CalibrationLearner<MemoryCalibrationStore> {
        CalibrationLearner::new(MemoryCalibrationStore::default())
    }

    #[test]
    fn empty_window_yields_default_report() {
        let analysis = analyze_commits(&[], &[], &learner(), &AnalyzeOptions::default());
        assert_eq!(analysis.window.commit_count, 0);
        assert_eq!(analysis.session_stats.session_count, 0);
        assert!(analysis.fix_chains.is_empty());
        assert_eq!(analysis.metrics.rework_ratio.value, 0.0);
        assert!(!analysis.recorded);
        assert_eq!(analysis.model_phase, ModelPhase::Default);
    }

    #[test]
    fn healthy_session_scores_well() {
        let commits = vec![
            commit(0, "feat(api): add pagination"),
            commit(25, "test(api): pagination cases"),
            commit(55, "feat(ui): results page"),
            commit(85, "docs: usage notes"),
        ];
        let stats = vec![CommitStats::default(); 4];
        let analysis = analyze_commits(&commits, &stats, &learner(), &AnalyzeOptions::default());

        assert_eq!(analysis.session_stats.session_count, 1);
        assert!(analysis.fix_chains.is_empty());
        assert_eq!(analysis.metrics.rework_ratio.value, 0.0);
        assert!(analysis.vibe_score.value > 0.7);
    }

    #[test]
    fn spiral_session_drags_the_score() {
        let commits: Vec<Commit> = (0..8)
            .map(|i| commit(i * 3, "fix(deploy): image pull secret"))
            .collect();
        let healthy = analyze_commits(
            &[commit(0, "feat: a"), commit(30, "feat: b")],
            &vec![CommitStats::default(); 2],
            &learner(),
            &AnalyzeOptions::default(),
        );
        let spiral = analyze_commits(
            &commits,
            &vec![CommitStats::default(); 8],
            &learner(),
            &AnalyzeOptions::default(),
        );

        assert_eq!(spiral.fix_chains.len(), 1);
        assert!(spiral.fix_chains[0].is_spiral);
        assert!(spiral.vibe_score.value < healthy.vibe_score.value);
    }

    #[test]
    fn declared_level_records_a_sample() {
        let learner = learner();
        let opts = AnalyzeOptions {
            declared_level: Some(3),
            ..AnalyzeOptions::default()
        };
        let analysis = analyze_commits(
            &[commit(0, "feat: a")],
            &[CommitStats::default()],
            &learner,
            &opts,
        );
        assert!(analysis.recorded);
        assert_eq!(learner.state().samples.len(), 1);
        assert_eq!(analysis.model_phase, ModelPhase::Collecting);
    }

    #[test]
    fn no_record_flag_skips_calibration() {
        let learner = learner();
        let opts = AnalyzeOptions {
            declared_level: Some(3),
            record: false,
            ..AnalyzeOptions::default()
        };
        let analysis = analyze_commits(&[commit(0, "feat: a")], &[], &learner, &opts);
        assert!(!analysis.recorded);
        assert!(learner.state().samples.is_empty());
    }

    #[test]
    fn feature_vector_layout() {
        let score = VibeScore::compute(
            &MetricResult::new(100.0, "score", crate::metrics::Rating::Elite, String::new()),
            &MetricResult::new(50.0, "score", crate::metrics::Rating::Medium, String::new()),
            &MetricResult::new(0.0, "score", crate::metrics::Rating::Low, String::new()),
            &MetricResult::new(75.0, "score", crate::metrics::Rating::High, String::new()),
            ScoreWeights::default(),
        );
        let features = feature_vector(&[0.1, 0.2, 0.3, 0.4, 2.0], &score);
        assert_eq!(features[0], 0.1);
        assert_eq!(features[4], 1.0); // clamped
        assert_eq!(features[5], 1.0);
        assert_eq!(features[6], 0.5);
        assert_eq!(features[7], 0.0);
        assert_eq!(features[8], 0.75);
    }
}
