//! Download-log analysis: error extraction, categorization, PII redaction.
//!
//! Everything here is a pure function over the log text; no state is kept.
//! Both the redaction rules and the error categories are data-driven tables
//! of `(regex, replacement)` / `(regex, category)` pairs, so extending them
//! never touches the matching logic.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::logging;

/// Maximum sanitized lines retained in a summary excerpt.
const EXCERPT_CAP: usize = 20;

/// Ordered redaction table. Each pattern is applied independently over the
/// whole string; order only matters where patterns could overlap (the AWS
/// secret assignment must run before the generic token rule).
static PII_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // Home directories (Unix and Windows)
        (r"/home/[^/\s]+", "[HOME]"),
        (r"/Users/[^/\s]+", "[HOME]"),
        (r"C:\\Users\\[^\\\s]+", "[HOME]"),
        // Temp paths
        (r"/tmp/[a-zA-Z0-9_-]+", "[TMP]"),
        // IPv4 addresses
        (r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b", "[IP]"),
        // Email addresses
        (
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
            "[EMAIL]",
        ),
        // AWS access key ids and secret assignments
        (r"AKIA[0-9A-Z]{16}", "[AWS_KEY]"),
        (
            r"aws_secret_access_key\s*=\s*[A-Za-z0-9/+=]{40}",
            "[AWS_SECRET]",
        ),
        // Generic labelled credentials
        (
            r#"(?:token|password|key|secret)["']?\s*[:=]\s*["']?[A-Za-z0-9/+=_-]{8,}"#,
            "[TOKEN]",
        ),
        // mDNS-style local hostnames
        (r"\b[a-zA-Z0-9-]+\.local\b", "[HOSTNAME]"),
        // UUID-shaped session ids
        (
            r"\b[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\b",
            "[SESSION_ID]",
        ),
    ]
    .into_iter()
    .filter_map(|(pat, repl)| Regex::new(pat).ok().map(|re| (re, repl)))
    .collect()
});

/// Fixed error categories. A line may match several; unmatched ERROR lines
/// fall into [`Category::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    Metadata,
    Network,
    Auth,
    Disk,
    Permission,
    CloudTransfer,
    Other,
}

impl Category {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Network => "network",
            Self::Auth => "auth",
            Self::Disk => "disk",
            Self::Permission => "permission",
            Self::CloudTransfer => "cloud_transfer",
            Self::Other => "other",
        }
    }
}

static CATEGORY_PATTERNS: LazyLock<Vec<(Regex, Category)>> = LazyLock::new(|| {
    [
        (r"(?i)metadata (?:download|fetch).*(?:HTTP \d+|timeout|failed)", Category::Metadata),
        (r"(?i)(ConnectionError|TimeoutError|NetworkError|connection (?:refused|reset))", Category::Network),
        (r"(?i)(authentication failed|credentials not configured|authorization|login required)", Category::Auth),
        (r"(?i)(no space left|insufficient.*space|disk quota)", Category::Disk),
        (r"(?i)permission denied", Category::Permission),
        (r"(?i)(aws|s3).*(?:failed|exit code \d+)", Category::CloudTransfer),
    ]
    .into_iter()
    .filter_map(|(pat, cat)| Regex::new(pat).ok().map(|re| (re, cat)))
    .collect()
});

/// Replace personally identifying substrings with placeholders.
pub fn sanitize(text: &str) -> String {
    let mut sanitized = text.to_string();
    for (pattern, replacement) in PII_PATTERNS.iter() {
        sanitized = pattern.replace_all(&sanitized, *replacement).into_owned();
    }
    sanitized
}

/// Read up to `max_lines` lines from `path`, keeping those with an
/// ` ERROR ` or ` WARNING ` marker. Missing or unreadable files yield an
/// empty vec.
pub fn extract_error_lines(path: &Path, max_lines: usize) -> Vec<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            logging::debug(&format!("could not read log file {}: {e}", path.display()));
            return Vec::new();
        }
    };

    content
        .lines()
        .take(max_lines)
        .filter(|line| line.contains(" ERROR ") || line.contains(" WARNING "))
        .map(|line| line.trim().to_string())
        .collect()
}

/// Bucket lines into categories. Every stored line is sanitized; a line may
/// land in multiple buckets; ERROR lines matching nothing go to `other`.
pub fn categorize(lines: &[String]) -> BTreeMap<Category, Vec<String>> {
    let mut buckets: BTreeMap<Category, Vec<String>> = BTreeMap::new();

    for line in lines {
        let sanitized = sanitize(line);
        let mut matched = false;
        for (pattern, category) in CATEGORY_PATTERNS.iter() {
            if pattern.is_match(line) {
                buckets.entry(*category).or_default().push(sanitized.clone());
                matched = true;
            }
        }
        if !matched && line.contains(" ERROR ") {
            buckets.entry(Category::Other).or_default().push(sanitized);
        }
    }

    buckets
}

/// Structured summary of a download log, safe to display or transmit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogSummary {
    pub total_errors: usize,
    pub total_warnings: usize,
    /// Category name -> sanitized lines (non-empty buckets only).
    pub categories: BTreeMap<String, Vec<String>>,
    /// Category name -> line count.
    pub counts: BTreeMap<String, usize>,
    /// Sanitized tail excerpt, at most [`EXCERPT_CAP`] lines.
    pub excerpt: Vec<String>,
    /// One-line human-readable synopsis.
    pub synopsis: String,
}

/// Analyze a log file into a [`LogSummary`]. Never fails: an unreadable or
/// error-free file produces an empty summary with a fitting synopsis.
pub fn summarize(path: &Path, max_lines: usize) -> LogSummary {
    let lines = extract_error_lines(path, max_lines);
    if lines.is_empty() {
        return LogSummary {
            synopsis: "No errors found in log file".to_string(),
            ..LogSummary::default()
        };
    }

    let total_errors = lines.iter().filter(|l| l.contains(" ERROR ")).count();
    let total_warnings = lines.iter().filter(|l| l.contains(" WARNING ")).count();

    let buckets = categorize(&lines);
    let counts: BTreeMap<String, usize> = buckets
        .iter()
        .map(|(cat, lines)| (cat.as_str().to_string(), lines.len()))
        .collect();
    let categories: BTreeMap<String, Vec<String>> = buckets
        .into_iter()
        .map(|(cat, lines)| (cat.as_str().to_string(), lines))
        .collect();

    let tail_start = lines.len().saturating_sub(EXCERPT_CAP);
    let excerpt: Vec<String> = lines[tail_start..].iter().map(|l| sanitize(l)).collect();

    let mut parts = Vec::new();
    if total_errors > 0 {
        parts.push(format!("{total_errors} errors"));
    }
    if total_warnings > 0 {
        parts.push(format!("{total_warnings} warnings"));
    }
    if let Some((dominant, _)) = counts.iter().max_by_key(|(_, count)| **count) {
        parts.push(format!("most common: {dominant}"));
    }
    let synopsis = if parts.is_empty() {
        "No errors".to_string()
    } else {
        parts.join(", ")
    };

    LogSummary {
        total_errors,
        total_warnings,
        categories,
        counts,
        excerpt,
        synopsis,
    }
}

#[cfg(test)]
mod tests;
