//! Scheduled, strictly opt-in feedback solicitation.
//!
//! The flow is gated twice: a run-count schedule decides *when* to ask,
//! and an explicit consent confirmation decides *whether* anything is
//! transmitted. Choosing a rating is not consent — the user sees exactly
//! which fields would be sent and must confirm before the first byte
//! leaves the machine. Every prompt treats Esc or an interrupt as "skip".

use std::collections::BTreeMap;
use std::io::BufRead;

use serde::Serialize;

use crate::loganalysis::{self, LogSummary};
use crate::logging;
use crate::state::StateStore;
use crate::telemetry::{self, SystemInfo};

/// Run counts at which feedback is solicited.
const SCHEDULE: [u64; 5] = [1, 3, 10, 30, 50];
/// Past the 50th run, ask again every this many runs.
const REPEAT_INTERVAL: u64 = 50;

const PRIVACY_NOTICE_DAYS: i64 = 100;
const RATING_MESSAGE_CAP: usize = 300;
const PROJECT_DESCRIPTION_CAP: usize = 500;
const PASTED_EXCERPT_CAP: usize = 1000;
/// Lines of the download log inspected for the follow-up digest.
const FOLLOWUP_SCAN_LINES: usize = 500;

/// Pure scheduling predicate.
///
/// `force` always wins. Otherwise the run count must sit on the schedule
/// (or on a 50-run boundary past it) and differ from the count at which
/// feedback was last shown, so the same milestone never prompts twice.
#[must_use]
pub fn should_prompt(current_runs: u64, last_feedback_run: u64, force: bool) -> bool {
    if force {
        return true;
    }
    if SCHEDULE.contains(&current_runs) {
        return current_runs != last_feedback_run;
    }
    if current_runs > 50 && current_runs % REPEAT_INTERVAL == 0 {
        return current_runs != last_feedback_run;
    }
    false
}

#[derive(Debug, Serialize)]
struct FeedbackPayload<'a> {
    #[serde(rename = "type")]
    event_type: &'static str,
    timestamp: String,
    feedback_level: &'static str,
    feedback_rating: &'a str,
    #[serde(flatten)]
    system: SystemInfo,
    #[serde(flatten)]
    context: BTreeMap<&'static str, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_excerpt: Option<serde_json::Value>,
}

/// Compact digest of a [`LogSummary`] for transmission. The sanitized
/// excerpt lines stay local; only aggregates travel.
#[derive(Debug, Serialize)]
pub(crate) struct LogDigest {
    synopsis: String,
    total_errors: usize,
    total_warnings: usize,
    counts: BTreeMap<String, usize>,
}

impl From<LogSummary> for LogDigest {
    fn from(summary: LogSummary) -> Self {
        Self {
            synopsis: summary.synopsis,
            total_errors: summary.total_errors,
            total_warnings: summary.total_warnings,
            counts: summary.counts,
        }
    }
}

#[derive(Debug, Serialize)]
struct FollowupPayload<'a> {
    #[serde(rename = "type")]
    event_type: &'static str,
    timestamp: String,
    original_rating: &'a str,
    log_analysis: LogDigest,
    #[serde(flatten)]
    system: SystemInfo,
}

/// Truncate on a character boundary, not a byte boundary.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Interpret a pasted log excerpt. Valid JSON passes through verbatim;
/// anything else is wrapped as plain text, capped at 1000 characters.
/// Blank input means the user skipped.
pub(crate) fn parse_log_excerpt(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(value) => Some(value),
        Err(_) => Some(serde_json::json!({
            "text": truncate_chars(trimmed, PASTED_EXCERPT_CAP)
        })),
    }
}

fn show_privacy_notice_if_due(store: &StateStore) {
    if !store.should_show_privacy_notice(PRIVACY_NOTICE_DAYS) {
        return;
    }
    println!();
    println!("neurohub feedback privacy notice");
    println!("--------------------------------");
    println!("Feedback you choose to send includes:");
    println!("  - your rating and any selections or text you enter");
    println!("  - OS family, architecture, CLI version");
    println!("  - anonymized error summaries (PII removed)");
    println!("NOT collected: file paths, usernames, emails, hostnames,");
    println!("IP addresses, or any persistent user identifier.");
    println!("This notice repeats every {PRIVACY_NOTICE_DAYS} days.");
    println!();
    store.mark_privacy_notice_shown();
}

/// Rating menu. `None` means skipped or cancelled.
fn ask_rating() -> Option<String> {
    let items = [
        "Bad - having significant issues",
        "Fine - works okay, some issues",
        "Good - working well for my needs",
        "Excellent - exceeding expectations",
        "Custom message",
        "Skip feedback",
    ];
    let choice = dialoguer::Select::new()
        .with_prompt("How is neurohub working for you?")
        .items(&items)
        .default(5)
        .interact_opt()
        .ok()
        .flatten()?;

    match choice {
        0 => Some("Bad".to_string()),
        1 => Some("Fine".to_string()),
        2 => Some("Good".to_string()),
        3 => Some("Excellent".to_string()),
        4 => {
            let message: String = dialoguer::Input::new()
                .with_prompt("Your feedback (300 chars max)")
                .allow_empty(true)
                .interact_text()
                .unwrap_or_default();
            let message = message.trim().to_string();
            if message.is_empty() {
                None
            } else {
                Some(truncate_chars(&message, RATING_MESSAGE_CAP))
            }
        }
        _ => None,
    }
}

/// The explicit consent gate. Lists exactly what would transmit; anything
/// other than an affirmative answer is a decline.
fn confirm_send(rating: &str) -> bool {
    println!();
    println!("Ready to send:");
    println!("  rating:      {rating}");
    println!("  system info: {} / {} / neurohub {}", std::env::consts::OS, std::env::consts::ARCH, env!("CARGO_PKG_VERSION"));
    println!("  plus any research context you add in the next step");

    dialoguer::Confirm::new()
        .with_prompt("Send this feedback?")
        .default(false)
        .interact()
        .unwrap_or(false)
}

/// One select with a trailing "Skip" entry. Returns the mapped value for
/// a real choice, `None` for skip, Esc, or interrupt.
fn select_field(prompt: &str, items: &[&str], values: &[&str]) -> Option<String> {
    let choice = dialoguer::Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(items.len() - 1)
        .interact_opt()
        .ok()
        .flatten()?;
    values.get(choice).map(|v| (*v).to_string())
}

fn text_field(prompt: &str, cap: usize) -> Option<String> {
    let value: String = dialoguer::Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .ok()?;
    let value = value.trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some(truncate_chars(&value, cap))
    }
}

/// Structured research context, every field individually skippable.
fn ask_research_context() -> BTreeMap<&'static str, String> {
    let mut context = BTreeMap::new();
    println!();
    println!("Optional research context (every field can be skipped):");

    if let Some(stage) = select_field(
        "Academic/career stage",
        &[
            "BSc/Undergraduate",
            "Masters",
            "PhD/Doctoral",
            "Postdoc",
            "Faculty/Professor",
            "Industry/Corporate",
            "Other",
            "Prefer not to say",
        ],
        &[
            "BSc/Undergrad",
            "Masters",
            "PhD",
            "Postdoc",
            "Faculty",
            "Industry",
            "Other",
        ],
    ) {
        context.insert("career_stage", stage);
    }

    if let Some(years) = select_field(
        "Years of neuroimaging experience",
        &["Less than 1 year", "1-3 years", "3-5 years", "5+ years", "Skip"],
        &["<1 year", "1-3 years", "3-5 years", "5+ years"],
    ) {
        context.insert("experience_years", years);
    }

    if let Some(area) = select_field(
        "Primary research area",
        &[
            "Neuroscience",
            "Psychology/Cognitive Science",
            "Computer Science/AI/ML",
            "Medicine/Clinical Research",
            "Statistics/Methods",
            "Other",
            "Skip",
        ],
        &[
            "Neuroscience",
            "Psychology",
            "CS/AI/ML",
            "Medicine/Clinical",
            "Statistics",
            "Other",
        ],
    ) {
        context.insert("research_area", area);
    }

    if let Some(use_case) = select_field(
        "Primary use case",
        &[
            "Course/Teaching",
            "Research project",
            "Clinical study",
            "Meta-analysis",
            "Methods development",
            "Other",
            "Skip",
        ],
        &[
            "Teaching",
            "Research",
            "Clinical",
            "Meta-Analysis",
            "Methods",
            "Other",
        ],
    ) {
        context.insert("use_case", use_case);
    }

    if let Some(institution) = text_field("Institution (Enter to skip)", 200) {
        context.insert("institution", institution);
    }
    if let Some(description) = text_field(
        "Project description (Enter to skip, 500 chars max)",
        PROJECT_DESCRIPTION_CAP,
    ) {
        context.insert("project_description", description);
    }
    if let Some(link) = text_field("Issue or repo link (Enter to skip)", 200) {
        context.insert("external_link", link);
    }

    context
}

/// Read pasted lines from stdin until a blank line, then interpret them
/// via [`parse_log_excerpt`].
fn ask_pasted_excerpt() -> Option<serde_json::Value> {
    println!();
    println!("Optionally paste a log summary (JSON or plain text).");
    println!("Finish with an empty line; an empty first line skips.");

    let stdin = std::io::stdin();
    let mut pasted = String::new();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if line.is_empty() {
            break;
        }
        pasted.push_str(&line);
        pasted.push('\n');
    }
    parse_log_excerpt(&pasted)
}

/// After a successful send, offer an automatic sanitized digest of the
/// session's download log as a follow-up event.
fn maybe_send_log_followup(store: &StateStore, endpoint: &str, rating: &str) {
    let Some(log_path) = store.current_download_log_path() else {
        return;
    };

    let attach = dialoguer::Confirm::new()
        .with_prompt("Attach a sanitized summary of this session's download log?")
        .default(false)
        .interact()
        .unwrap_or(false);
    if !attach {
        return;
    }

    let summary = loganalysis::summarize(log_path, FOLLOWUP_SCAN_LINES);
    let payload = FollowupPayload {
        event_type: "feedback_log_followup",
        timestamp: telemetry::utc_timestamp(),
        original_rating: rating,
        log_analysis: summary.into(),
        system: SystemInfo::collect(),
    };

    println!("Sending log summary...");
    if telemetry::post_event(
        endpoint,
        &payload,
        std::time::Duration::from_secs(crate::config::DEFAULT_FEEDBACK_TIMEOUT_SECS),
    ) {
        println!("Log summary sent.");
    } else {
        println!("Could not send the log summary. Skipping.");
    }
}

/// Run the feedback flow if the schedule (or `force`) calls for it.
///
/// Once the rating menu has been shown, every terminal outcome — sent,
/// declined at the consent gate, or skipped — advances the scheduling
/// cursor so the same milestone does not prompt again. Network failures
/// produce a soft notice and nothing else; this function never errors.
pub fn maybe_prompt(store: &StateStore, endpoint: &str, force: bool) {
    let current_runs = store.get_successful_runs();
    let last_feedback_run = store.get_last_feedback_run_count();

    if !should_prompt(current_runs, last_feedback_run, force) {
        logging::debug(&format!(
            "not prompting feedback (runs={current_runs}, last={last_feedback_run})"
        ));
        return;
    }

    show_privacy_notice_if_due(store);

    let Some(rating) = ask_rating() else {
        println!("Feedback skipped.");
        store.update_last_feedback_run_count(current_runs);
        return;
    };

    if !confirm_send(&rating) {
        println!("Nothing sent.");
        store.update_last_feedback_run_count(current_runs);
        return;
    }
    store.set_feedback_consent(true);

    let detailed = dialoguer::Select::new()
        .with_prompt("Add research context?")
        .items(&["No, send my rating now", "Yes, add details about my use case"])
        .default(0)
        .interact_opt()
        .ok()
        .flatten()
        == Some(1);

    let (level, context, excerpt) = if detailed {
        let context = ask_research_context();
        let excerpt = ask_pasted_excerpt();
        ("comprehensive", context, excerpt)
    } else {
        ("short", BTreeMap::new(), None)
    };

    let payload = FeedbackPayload {
        event_type: "feedback",
        timestamp: telemetry::utc_timestamp(),
        feedback_level: level,
        feedback_rating: &rating,
        system: SystemInfo::collect(),
        context,
        log_excerpt: excerpt,
    };

    println!("Sending feedback...");
    let sent = telemetry::post_event(
        endpoint,
        &payload,
        std::time::Duration::from_secs(crate::config::DEFAULT_FEEDBACK_TIMEOUT_SECS),
    );
    if sent {
        println!("Feedback sent. Thank you!");
    } else {
        println!("Could not send feedback right now. Please try again later.");
    }

    store.update_last_feedback_run_count(current_runs);

    if sent {
        maybe_send_log_followup(store, endpoint, &rating);
    }
}

#[cfg(test)]
mod tests;
