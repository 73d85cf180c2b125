//! Opt-in, privacy-first usage reporting.
//!
//! Nothing here ever fails the caller: every network problem is downgraded
//! to a debug diagnostic and a `false` return. No PII is collected — events
//! carry the dataset id, outcome flags, coarse system descriptors and an
//! ephemeral per-process session id that is never persisted.
//!
//! All mutable state lives on the [`Reporter`] instance (rate limiter,
//! session id), so independent logical sessions — tests in particular —
//! cannot leak into each other.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::logging;
use crate::state::StateStore;

/// Max events sent per sliding window.
const MAX_EVENTS_PER_WINDOW: usize = 10;
/// Sliding window length.
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT_SECS: u64 = 2;

/// Anonymized system descriptors attached to every event.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub cli_version: &'static str,
}

impl SystemInfo {
    pub const fn collect() -> Self {
        Self {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            cli_version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Sliding-window rate limiter over sent-event timestamps. Stale entries
/// are pruned lazily on each check.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    cap: usize,
    sent: Vec<Instant>,
}

impl RateLimiter {
    pub const fn new(window: Duration, cap: usize) -> Self {
        Self {
            window,
            cap,
            sent: Vec::new(),
        }
    }

    /// `true` when an attempt at `now` must be rejected.
    pub fn is_limited_at(&mut self, now: Instant) -> bool {
        self.sent
            .retain(|ts| now.saturating_duration_since(*ts) < self.window);
        self.sent.len() >= self.cap
    }

    /// Record an accepted send at `now`.
    pub fn record_at(&mut self, now: Instant) {
        self.sent.push(now);
    }

    pub fn is_limited(&mut self) -> bool {
        self.is_limited_at(Instant::now())
    }

    pub fn record(&mut self) {
        self.record_at(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RATE_LIMIT_WINDOW, MAX_EVENTS_PER_WINDOW)
    }
}

/// One download outcome, as reported by the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct DownloadEvent<'a> {
    pub dataset_id: &'a str,
    pub succeeded: bool,
    pub metadata_received: bool,
    pub resume_attempts: u32,
    pub note: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DownloadPayload<'a> {
    #[serde(rename = "type")]
    event_type: &'static str,
    timestamp: String,
    dataset: &'a str,
    succeeded: bool,
    metadata_received: bool,
    resume_attempts: u32,
    session_id: &'a str,
    #[serde(flatten)]
    system: SystemInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
}

/// Read-only projection of the telemetry configuration, for display.
#[derive(Debug, Serialize)]
pub struct TelemetryStatus {
    pub consent_given: bool,
    pub consent_asked: bool,
    pub successful_runs: u64,
    pub failed_runs: u64,
    pub endpoint: String,
    pub session_id: String,
}

/// Best-effort event reporter. One instance per process.
pub struct Reporter {
    endpoint: String,
    timeout: Duration,
    limiter: RateLimiter,
    session_id: String,
}

impl Reporter {
    /// Build a reporter against `endpoint` with the given request timeout.
    /// The session id is generated here: one short random token per
    /// process, never written to disk.
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        let mut session_id = uuid::Uuid::new_v4().simple().to_string();
        session_id.truncate(8);
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(timeout_secs),
            limiter: RateLimiter::default(),
            session_id,
        }
    }

    pub fn from_settings(settings: &crate::config::Settings) -> Self {
        Self::new(settings.endpoint.clone(), settings.telemetry_timeout_secs)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Record one download outcome.
    ///
    /// Local counters in the state store are updated unconditionally.
    /// The network send happens only when consent was granted and the rate
    /// limiter admits the attempt; any failure is swallowed. This never
    /// returns an error and never blocks beyond the configured timeout.
    pub fn record_download_event(&mut self, store: &StateStore, event: DownloadEvent<'_>) {
        if event.succeeded {
            store.increment_successful_run(Some(event.dataset_id));
        } else {
            store.increment_failed_run(Some(event.dataset_id));
        }

        if !store.has_telemetry_consent() {
            logging::debug("telemetry not consented, skipping event send");
            return;
        }
        if self.limiter.is_limited() {
            logging::debug("rate limited, skipping telemetry event");
            return;
        }

        let payload = DownloadPayload {
            event_type: "download",
            timestamp: utc_timestamp(),
            dataset: event.dataset_id,
            succeeded: event.succeeded,
            metadata_received: event.metadata_received,
            resume_attempts: event.resume_attempts,
            session_id: &self.session_id,
            system: SystemInfo::collect(),
            note: event.note,
        };

        if post_event(&self.endpoint, &payload, self.timeout) {
            self.limiter.record();
        }
    }

    /// Read-only status projection for `neurohub telemetry status`.
    pub fn status(&self, store: &StateStore) -> TelemetryStatus {
        TelemetryStatus {
            consent_given: store.has_telemetry_consent(),
            consent_asked: store.was_telemetry_consent_asked(),
            successful_runs: store.get_successful_runs(),
            failed_runs: store.get_failed_runs(),
            endpoint: self.endpoint.clone(),
            session_id: self.session_id.clone(),
        }
    }
}

/// Current UTC time as an RFC 3339 `…Z` string.
pub(crate) fn utc_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// POST a JSON payload, fire-and-forget. Success is exactly HTTP 200;
/// everything else — 429 included — is dropped with a debug diagnostic.
pub(crate) fn post_event<T: Serialize>(endpoint: &str, payload: &T, timeout: Duration) -> bool {
    let client = match reqwest::blocking::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            logging::debug(&format!("could not build HTTP client: {e}"));
            return false;
        }
    };

    match client.post(endpoint).json(payload).send() {
        Ok(resp) => match resp.status().as_u16() {
            200 => {
                logging::debug("event sent");
                true
            }
            429 => {
                logging::debug("backend rate limit exceeded, dropping event");
                false
            }
            status => {
                logging::debug(&format!("event send failed with status {status}"));
                false
            }
        },
        Err(e) => {
            logging::debug(&format!("event send failed: {e} (continuing)"));
            false
        }
    }
}

/// Ask for telemetry consent, once. Shown by the orchestrator after the
/// first successful download; an interrupt or closed stdin counts as a
/// decline. The asked flag is always set so the question never repeats.
pub fn prompt_consent_if_needed(store: &StateStore) {
    if store.was_telemetry_consent_asked() {
        return;
    }

    println!();
    println!("neurohub telemetry");
    println!("------------------");
    println!("We collect anonymized usage data to improve neurohub:");
    println!("  - dataset download success/failure counts");
    println!("  - OS family, architecture, CLI version");
    println!("NOT collected: usernames, emails, file paths, hostnames,");
    println!("IP addresses, or any persistent user identifier.");
    println!();

    let consent = dialoguer::Confirm::new()
        .with_prompt("Enable telemetry?")
        .default(true)
        .interact()
        .unwrap_or(false);

    store.set_telemetry_consent(consent);
    if consent {
        println!("Telemetry enabled. Thank you for helping improve neurohub!");
    } else {
        println!("Telemetry disabled. Re-enable any time with `neurohub telemetry enable`.");
    }
}
