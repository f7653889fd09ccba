//! Fix-chain detection: runs of consecutive same-component fix commits.
//!
//! A run of three or more is a "spiral" - the author is circling a problem
//! rather than landing the fix on the first or second try.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Commit;

/// Minimum run length for a fix chain to count as a spiral.
pub const SPIRAL_THRESHOLD: usize = 3;

/// Recognized spiral failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpiralPattern {
    VolumeMount,
    SecretsAuth,
    ApiMismatch,
    SslTls,
    ImageRegistry,
    GitopsDrift,
}

impl SpiralPattern {
    pub fn name(&self) -> &'static str {
        match self {
            Self::VolumeMount => "volume/mount",
            Self::SecretsAuth => "secrets/auth",
            Self::ApiMismatch => "API mismatch",
            Self::SslTls => "SSL/TLS",
            Self::ImageRegistry => "image/registry",
            Self::GitopsDrift => "GitOps drift",
        }
    }
}

/// Ordered pattern taxonomy: evaluated top to bottom, first match wins.
/// Ties between categories resolve to declaration order by construction.
const PATTERN_TAXONOMY: &[(SpiralPattern, &[&str])] = &[
    (
        SpiralPattern::VolumeMount,
        &["volume", "mount", "pvc", "persistentvolume"],
    ),
    (
        SpiralPattern::SecretsAuth,
        &[
            "secret",
            "auth",
            "credential",
            "token",
            "password",
            "rbac",
            "permission",
        ],
    ),
    (
        SpiralPattern::ApiMismatch,
        &["api", "endpoint", "schema", "version mismatch", "contract"],
    ),
    (SpiralPattern::SslTls, &["ssl", "tls", "cert", "https"]),
    (
        SpiralPattern::ImageRegistry,
        &["image", "registry", "docker", "pull", "tag"],
    ),
    (
        SpiralPattern::GitopsDrift,
        &["sync", "drift", "argocd", "flux", "helm", "gitops"],
    ),
];

/// A maximal contiguous run of fix commits sharing one component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixChain {
    pub commits: Vec<Commit>,
    pub component: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_minutes: f64,
    /// True iff the run length reached [`SPIRAL_THRESHOLD`].
    pub is_spiral: bool,
    pub pattern: Option<SpiralPattern>,
}

impl FixChain {
    fn from_run(commits: Vec<Commit>, component: String) -> Self {
        let started_at = commits[0].date;
        let ended_at = commits[commits.len() - 1].date;
        let is_spiral = commits.len() >= SPIRAL_THRESHOLD;
        let pattern = classify_pattern(&commits);
        Self {
            duration_minutes: (ended_at - started_at).num_seconds() as f64 / 60.0,
            commits,
            component,
            started_at,
            ended_at,
            is_spiral,
            pattern,
        }
    }

    pub fn commit_count(&self) -> usize {
        self.commits.len()
    }
}

/// First-match classification over the concatenated chain messages.
fn classify_pattern(commits: &[Commit]) -> Option<SpiralPattern> {
    let haystack = commits
        .iter()
        .map(|c| c.message.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    PATTERN_TAXONOMY
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(pattern, _)| *pattern)
}

/// Scan a chronologically sorted commit sequence for fix chains of spiral
/// length. A candidate run grows while each commit is fix-typed and shares
/// the component fixed by the run's first commit; anything else flushes the
/// run and starts over.
pub fn detect_fix_chains(commits: &[Commit]) -> Vec<FixChain> {
    let mut chains = Vec::new();
    let mut run: Vec<Commit> = Vec::new();
    let mut run_component: Option<String> = None;

    for commit in commits {
        let component = commit.component();
        let extends_run = commit.is_fix()
            && match (&run_component, &component) {
                (Some(current), Some(next)) => current == next,
                _ => false,
            };

        if extends_run {
            run.push(commit.clone());
            continue;
        }

        flush_run(&mut chains, &mut run, &mut run_component);

        if commit.is_fix() {
            if let Some(component) = component {
                run_component = Some(component);
                run.push(commit.clone());
            }
        }
    }
    flush_run(&mut chains, &mut run, &mut run_component);

    chains
}

fn flush_run(chains: &mut Vec<FixChain>, run: &mut Vec<Commit>, component: &mut Option<String>) {
    if run.len() >= SPIRAL_THRESHOLD {
        if let Some(component) = component.take() {
            chains.push(FixChain::from_run(std::mem::take(run), component));
            return;
        }
    }
    run.clear();
    *component = None;
}
