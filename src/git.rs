use std::path::Path;
use std::process::Command;

use chrono::{DateTime, Utc};
use log::warn;

use crate::models::{Commit, CommitStats};

/// Errors from git operations
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("Git command failed: {0}")]
    CommandFailed(String),
    #[error("Failed to execute git: {0}")]
    ExecutionFailed(#[from] std::io::Error),
    #[error("Failed to parse git output: {0}")]
    ParseError(String),
    #[error("Not a git repository")]
    NotARepository,
}

/// Field separator for `git log` format strings. Unlikely to appear in a
/// commit subject line.
const LOG_SEPARATOR: &str = "\x1f";

/// Trait for git operations - allows faking in tests.
///
/// This is the commit-normalizer boundary: implementations hand back typed
/// [`Commit`] records and the analytics core never re-parses raw log text.
pub trait GitOps {
    /// Read up to `limit` commits reachable from HEAD, oldest first.
    fn read_commits(&self, limit: usize) -> Result<Vec<Commit>, GitError>;

    /// Read diff statistics for a single commit against its parent.
    fn read_commit_stats(&self, hash: &str) -> Result<CommitStats, GitError>;
}

/// Real implementation of GitOps that shells out to git.
pub struct Git {
    /// Working directory for git commands
    work_dir: Option<std::path::PathBuf>,
}

impl Git {
    pub fn new() -> Self {
        Self { work_dir: None }
    }

    pub fn with_work_dir(work_dir: impl AsRef<Path>) -> Self {
        Self {
            work_dir: Some(work_dir.as_ref().to_path_buf()),
        }
    }

    fn run_git(&self, args: &[&str]) -> Result<String, GitError> {
        let mut cmd = Command::new("git");
        if let Some(ref dir) = self.work_dir {
            cmd.current_dir(dir);
        }
        cmd.args(args);

        let output = cmd.output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("not a git repository") {
                return Err(GitError::NotARepository);
            }
            return Err(GitError::CommandFailed(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Default for Git {
    fn default() -> Self {
        Self::new()
    }
}

impl GitOps for Git {
    fn read_commits(&self, limit: usize) -> Result<Vec<Commit>, GitError> {
        let count = format!("-{}", limit.max(1));
        let format = format!("--format=%h{sep}%aI{sep}%an{sep}%s", sep = LOG_SEPARATOR);
        let output = self.run_git(&[
            "log",
            count.as_str(),
            "--no-merges",
            "--reverse",
            format.as_str(),
        ])?;

        let mut commits = Vec::new();
        for line in output.lines().filter(|l| !l.is_empty()) {
            match parse_log_line(line) {
                Ok(commit) => commits.push(commit),
                Err(e) => warn!("skipping unparsable log line: {}", e),
            }
        }
        Ok(commits)
    }

    fn read_commit_stats(&self, hash: &str) -> Result<CommitStats, GitError> {
        let output = self.run_git(&["show", "--numstat", "--format=", hash])?;

        let mut stats = CommitStats::default();
        for line in output.lines().filter(|l| !l.is_empty()) {
            let mut parts = line.split('\t');
            let added = parts.next().unwrap_or("-");
            let deleted = parts.next().unwrap_or("-");
            let Some(file) = parts.next() else { continue };

            // Binary files report "-" for both counts; they still count as
            // touched files.
            stats.additions += added.parse::<u64>().unwrap_or(0);
            stats.deletions += deleted.parse::<u64>().unwrap_or(0);
            stats.files.push(file.to_string());
        }
        Ok(stats)
    }
}

fn parse_log_line(line: &str) -> Result<Commit, GitError> {
    let mut fields = line.splitn(4, LOG_SEPARATOR);
    let hash = fields
        .next()
        .ok_or_else(|| GitError::ParseError(line.to_string()))?;
    let date_raw = fields
        .next()
        .ok_or_else(|| GitError::ParseError(line.to_string()))?;
    let author = fields
        .next()
        .ok_or_else(|| GitError::ParseError(line.to_string()))?;
    let subject = fields.next().unwrap_or("");

    let date: DateTime<Utc> = DateTime::parse_from_rfc3339(date_raw)
        .map_err(|e| GitError::ParseError(format!("bad date {}: {}", date_raw, e)))?
        .with_timezone(&Utc);

    Ok(Commit::from_log_line(hash, date, subject, author))
}
