#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

// --- scheduling ---

#[test]
fn force_always_prompts() {
    assert!(should_prompt(0, 0, true));
    assert!(should_prompt(2, 2, true));
    assert!(should_prompt(999, 999, true));
}

#[test]
fn milestones_prompt_once() {
    for milestone in [1, 3, 10, 30, 50] {
        assert!(should_prompt(milestone, 0, false), "milestone {milestone}");
        assert!(
            !should_prompt(milestone, milestone, false),
            "milestone {milestone} repeated"
        );
    }
}

#[test]
fn off_schedule_counts_never_prompt() {
    for runs in [0, 2, 4, 5, 9, 11, 29, 31, 49, 51, 99, 101, 149] {
        assert!(!should_prompt(runs, 0, false), "runs {runs}");
    }
}

#[test]
fn every_fifty_after_fifty() {
    assert!(should_prompt(100, 50, false));
    assert!(should_prompt(150, 100, false));
    assert!(!should_prompt(100, 100, false));
    // 50 itself belongs to the fixed schedule, not the repeat rule.
    assert!(should_prompt(50, 30, false));
}

// --- text handling ---

#[test]
fn truncation_respects_char_boundaries() {
    assert_eq!(truncate_chars("hello", 10), "hello");
    assert_eq!(truncate_chars("hello", 3), "hel");
    // Multi-byte characters count as one each.
    assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
}

// --- pasted excerpt interpretation ---

#[test]
fn blank_excerpt_is_skip() {
    assert!(parse_log_excerpt("").is_none());
    assert!(parse_log_excerpt("   \n\t\n").is_none());
}

#[test]
fn json_excerpt_passes_through() {
    let parsed = parse_log_excerpt(r#"{"error_summary": "timeouts", "count": 3}"#).unwrap();
    assert_eq!(parsed["error_summary"], "timeouts");
    assert_eq!(parsed["count"], 3);
}

#[test]
fn non_json_excerpt_is_wrapped_and_capped() {
    let parsed = parse_log_excerpt("the download kept stalling").unwrap();
    assert_eq!(parsed["text"], "the download kept stalling");

    let long = "x".repeat(5000);
    let parsed = parse_log_excerpt(&long).unwrap();
    assert_eq!(parsed["text"].as_str().unwrap().len(), 1000);
}

// --- digest ---

#[test]
fn digest_carries_aggregates_not_excerpt_lines() {
    let mut counts = std::collections::BTreeMap::new();
    counts.insert("network".to_string(), 2);
    let summary = LogSummary {
        total_errors: 2,
        total_warnings: 1,
        categories: std::collections::BTreeMap::new(),
        counts,
        excerpt: vec!["2026-01-01 - ERROR - connection reset".to_string()],
        synopsis: "2 errors, 1 warning; most common: network".to_string(),
    };

    let digest = LogDigest::from(summary);
    let value = serde_json::to_value(&digest).unwrap();

    assert_eq!(value["total_errors"], 2);
    assert_eq!(value["total_warnings"], 1);
    assert_eq!(value["counts"]["network"], 2);
    assert_eq!(value["synopsis"], "2 errors, 1 warning; most common: network");
    assert!(value.get("excerpt").is_none());
}
