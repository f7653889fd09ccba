use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a commit derived from its conventional-commit prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    Feature,
    Fix,
    Docs,
    Chore,
    Refactor,
    Test,
    Style,
    Other,
}

impl CommitType {
    /// Map a conventional-commit prefix (without scope or `!`) to a type.
    /// Unrecognized prefixes map to `Other`.
    pub fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "feat" | "feature" => Self::Feature,
            "fix" | "hotfix" | "bugfix" => Self::Fix,
            "docs" | "doc" => Self::Docs,
            "chore" => Self::Chore,
            "refactor" => Self::Refactor,
            "test" | "tests" => Self::Test,
            "style" => Self::Style,
            _ => Self::Other,
        }
    }
}

impl Display for CommitType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Feature => "feature",
            Self::Fix => "fix",
            Self::Docs => "docs",
            Self::Chore => "chore",
            Self::Refactor => "refactor",
            Self::Test => "test",
            Self::Style => "style",
            Self::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// A commit read from the git history. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Short opaque hash.
    pub hash: String,
    pub date: DateTime<Utc>,
    /// First line of the commit message only.
    pub message: String,
    pub commit_type: CommitType,
    /// Explicit component label from a parenthesized prefix, if any.
    pub scope: Option<String>,
    pub author: String,
}

impl Commit {
    /// Build a commit from a raw first-line message, deriving type and scope
    /// from the conventional prefix (`type(scope): subject`).
    pub fn from_log_line(
        hash: impl Into<String>,
        date: DateTime<Utc>,
        message: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let (commit_type, scope) = parse_conventional_prefix(&message);
        Self {
            hash: hash.into(),
            date,
            message,
            commit_type,
            scope,
            author: author.into(),
        }
    }

    pub fn is_fix(&self) -> bool {
        self.commit_type == CommitType::Fix
    }

    /// The component this commit touches: the explicit scope when present,
    /// otherwise the first significant word (≥3 chars) of the message after
    /// stripping a leading "fix" token. Lowercased for comparison.
    pub fn component(&self) -> Option<String> {
        if let Some(scope) = &self.scope {
            return Some(scope.to_lowercase());
        }
        let subject = match self.message.split_once(':') {
            Some((_, rest)) => rest,
            None => self.message.as_str(),
        };
        subject
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| w.len() >= 3)
            .map(str::to_lowercase)
            .find(|w| !matches!(w.as_str(), "fix" | "fixes" | "fixed" | "fixing" | "the"))
    }
}

/// Parse a conventional-commit prefix into (type, scope).
///
/// Accepts `type: subject`, `type(scope): subject`, and `type(scope)!: subject`.
/// Messages without a recognizable prefix are `Other` with no scope.
fn parse_conventional_prefix(message: &str) -> (CommitType, Option<String>) {
    let Some((head, _)) = message.split_once(':') else {
        return (CommitType::Other, None);
    };
    let head = head.trim().trim_end_matches('!');

    let (type_part, scope) = match head.split_once('(') {
        Some((t, rest)) => match rest.strip_suffix(')') {
            Some(scope) if !scope.is_empty() => (t, Some(scope.to_string())),
            _ => return (CommitType::Other, None),
        },
        None => (head, None),
    };

    // Prefixes containing whitespace are ordinary sentences, not tags.
    if type_part.is_empty() || type_part.contains(char::is_whitespace) {
        return (CommitType::Other, None);
    }

    (CommitType::from_prefix(&type_part.to_lowercase()), scope)
}

/// Per-commit diff statistics, fetched separately from the log walk.
/// A failed stat read degrades to the default (all zeros, no files).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitStats {
    pub files: Vec<String>,
    pub additions: u64,
    pub deletions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn commit(message: &str) -> Commit {
        Commit::from_log_line(
            "abc1234",
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            message,
            "dev",
        )
    }

    #[test]
    fn parse_plain_type() {
        let c = commit("feat: add login flow");
        assert_eq!(c.commit_type, CommitType::Feature);
        assert_eq!(c.scope, None);
    }

    #[test]
    fn parse_type_with_scope() {
        let c = commit("fix(auth): refresh token rotation");
        assert_eq!(c.commit_type, CommitType::Fix);
        assert_eq!(c.scope.as_deref(), Some("auth"));
    }

    #[test]
    fn parse_breaking_marker() {
        let c = commit("refactor(api)!: rename endpoints");
        assert_eq!(c.commit_type, CommitType::Refactor);
        assert_eq!(c.scope.as_deref(), Some("api"));
    }

    #[test]
    fn unrecognized_prefix_is_other() {
        let c = commit("wip: trying things");
        assert_eq!(c.commit_type, CommitType::Other);
    }

    #[test]
    fn no_prefix_is_other() {
        let c = commit("Merge branch main");
        assert_eq!(c.commit_type, CommitType::Other);
        assert_eq!(c.scope, None);
    }

    #[test]
    fn sentence_before_colon_is_not_a_tag() {
        let c = commit("revert the change: it broke CI");
        assert_eq!(c.commit_type, CommitType::Other);
    }

    #[test]
    fn component_prefers_scope() {
        let c = commit("fix(ingress): nginx timeout");
        assert_eq!(c.component().as_deref(), Some("ingress"));
    }

    #[test]
    fn component_falls_back_to_first_word() {
        let c = commit("fix: database connection pooling");
        assert_eq!(c.component().as_deref(), Some("database"));
    }

    #[test]
    fn component_skips_fix_tokens_without_prefix() {
        let c = commit("fixed flaky websocket reconnect");
        assert_eq!(c.component().as_deref(), Some("flaky"));
    }

    #[test]
    fn component_skips_short_words() {
        let c = commit("fix: a db timeout again");
        assert_eq!(c.component().as_deref(), Some("timeout"));
    }
}
