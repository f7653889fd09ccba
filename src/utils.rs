/// Truncate a SHA to its first 8 characters for display
pub fn short_sha(sha: &str) -> &str {
    &sha[..8.min(sha.len())]
}

/// Logistic function.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Render minutes as "Xh Ym" / "Ym" for summaries.
pub fn format_minutes(minutes: f64) -> String {
    let total = minutes.round() as i64;
    if total >= 60 {
        format!("{}h {}m", total / 60, total % 60)
    } else {
        format!("{}m", total)
    }
}
