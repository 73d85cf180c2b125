//! Persistent local state for telemetry and feedback tracking.
//!
//! The state lives in a single JSON file (default `~/.neurohub/state.json`,
//! see [`crate::paths::state_file`]). Loads never fail: a missing, unreadable
//! or corrupt file degrades to schema defaults, and partial files from older
//! versions are merged over the defaults key by key. Saves go through a
//! temp-file-then-rename so the canonical file is never observed half-written.
//!
//! Locking is advisory and best-effort: it narrows the race window between
//! concurrent CLI invocations but does not guarantee exclusion. Lost updates
//! between two concurrent increments are an accepted limitation for a
//! single-user tool; the invariant defended here is "no corrupted file".

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logging;

/// Per-dataset success/failure counters, created lazily on first event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStats {
    #[serde(default)]
    pub success: u64,
    #[serde(default)]
    pub fail: u64,
}

/// The on-disk state record.
///
/// Every field carries `#[serde(default)]` so files written by older
/// versions (or hand-edited partial files) load with defaults filled in
/// for whatever is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentState {
    #[serde(default)]
    pub successful_runs: u64,
    #[serde(default)]
    pub failed_runs: u64,
    #[serde(default)]
    pub per_dataset: BTreeMap<String, DatasetStats>,
    #[serde(default)]
    pub last_feedback_run_count: u64,
    #[serde(default)]
    pub telemetry_consent_given: bool,
    #[serde(default)]
    pub telemetry_consent_asked: bool,
    #[serde(default)]
    pub feedback_consent_given: bool,
    /// UTC RFC 3339 timestamp, `None` if the privacy notice was never shown.
    /// Kept as a string so an unparseable value degrades to "show the
    /// notice" instead of poisoning the whole state load.
    #[serde(default)]
    pub last_privacy_notice_shown: Option<String>,
}

/// Handle to the state file. Explicitly constructed and passed to the
/// components that need it, so tests can point it at a temp directory.
pub struct StateStore {
    path: PathBuf,
    /// Log path of the currently running download session. Per-invocation
    /// relevance only, never persisted.
    current_download_log: Option<PathBuf>,
}

impl StateStore {
    /// Create a store backed by `path`. The parent directory is created
    /// eagerly; failure to do so is a warning, not an error (loads fall
    /// back to defaults and saves will report `false`).
    pub fn new(path: PathBuf) -> Self {
        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            logging::warn(&format!(
                "could not create state directory {}: {e}",
                parent.display()
            ));
        }
        Self {
            path,
            current_download_log: None,
        }
    }

    /// Create a store at the default per-user location.
    ///
    /// # Errors
    ///
    /// Returns an error only when no home directory can be resolved at all.
    pub fn open_default() -> anyhow::Result<Self> {
        let path = crate::paths::state_file()
            .ok_or_else(|| anyhow::anyhow!("could not resolve a home directory"))?;
        Ok(Self::new(path))
    }

    /// Path of the canonical state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state, falling back to defaults on any failure.
    pub fn load(&self) -> PersistentState {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                logging::debug("state file does not exist, using defaults");
                return PersistentState::default();
            }
            Err(e) => {
                logging::warn(&format!("could not read state file: {e}, using defaults"));
                return PersistentState::default();
            }
        };

        // Best-effort shared lock around the read. Fully-qualified calls:
        // std::fs::File grew inherent lock methods, which would otherwise
        // shadow the fs2 trait.
        let locked = fs2::FileExt::try_lock_shared(&file).is_ok();
        if !locked {
            logging::debug("could not acquire shared lock on state file, reading anyway");
        }
        let state = serde_json::from_reader::<_, PersistentState>(&file).unwrap_or_else(|e| {
            logging::warn(&format!("invalid state file: {e}, using defaults"));
            PersistentState::default()
        });
        if locked {
            let _ = fs2::FileExt::unlock(&file);
        }
        state
    }

    /// Save the state atomically. Returns `true` on success.
    ///
    /// Serializes to `<path>.tmp` in the same directory, fsyncs, then
    /// renames over the canonical path. An exclusive advisory lock is
    /// taken on the temp handle while writing, best-effort.
    pub fn save(&self, state: &PersistentState) -> bool {
        match self.save_inner(state) {
            Ok(()) => {
                logging::debug("state saved");
                true
            }
            Err(e) => {
                eprintln!("[neurohub] error saving state: {e:#}");
                false
            }
        }
    }

    fn save_inner(&self, state: &PersistentState) -> anyhow::Result<()> {
        let tmp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(state)?;

        let result = (|| -> anyhow::Result<()> {
            let mut tmp = File::create(&tmp_path)?;
            if fs2::FileExt::try_lock_exclusive(&tmp).is_err() {
                logging::debug("could not lock temp state file, writing anyway");
            }
            tmp.write_all(json.as_bytes())?;
            tmp.sync_all()?;
            std::fs::rename(&tmp_path, &self.path)?;
            Ok(())
        })();

        if result.is_err() {
            // Leave no stale temp file behind after a failed write.
            let _ = std::fs::remove_file(&tmp_path);
        }
        result
    }

    /// Increment the successful-run counter, plus the per-dataset counter
    /// when `dataset_id` is given. Both commit in a single write.
    pub fn increment_successful_run(&self, dataset_id: Option<&str>) {
        let mut state = self.load();
        state.successful_runs += 1;
        if let Some(id) = dataset_id {
            state.per_dataset.entry(id.to_string()).or_default().success += 1;
        }
        self.save(&state);
        logging::debug(&format!(
            "incremented successful runs to {}",
            state.successful_runs
        ));
    }

    /// Increment the failed-run counter, plus the per-dataset counter when
    /// `dataset_id` is given.
    pub fn increment_failed_run(&self, dataset_id: Option<&str>) {
        let mut state = self.load();
        state.failed_runs += 1;
        if let Some(id) = dataset_id {
            state.per_dataset.entry(id.to_string()).or_default().fail += 1;
        }
        self.save(&state);
        logging::debug(&format!("incremented failed runs to {}", state.failed_runs));
    }

    pub fn get_successful_runs(&self) -> u64 {
        self.load().successful_runs
    }

    pub fn get_failed_runs(&self) -> u64 {
        self.load().failed_runs
    }

    /// Counters for one dataset; zeros when it was never seen.
    pub fn get_dataset_stats(&self, dataset_id: &str) -> DatasetStats {
        self.load()
            .per_dataset
            .get(dataset_id)
            .copied()
            .unwrap_or_default()
    }

    /// Record the user's telemetry decision. Also marks the question as
    /// asked so the prompt is never repeated.
    pub fn set_telemetry_consent(&self, consented: bool) {
        let mut state = self.load();
        state.telemetry_consent_given = consented;
        state.telemetry_consent_asked = true;
        self.save(&state);
        eprintln!("[neurohub] telemetry consent set to: {consented}");
    }

    pub fn has_telemetry_consent(&self) -> bool {
        self.load().telemetry_consent_given
    }

    pub fn was_telemetry_consent_asked(&self) -> bool {
        self.load().telemetry_consent_asked
    }

    pub fn set_feedback_consent(&self, consented: bool) {
        let mut state = self.load();
        state.feedback_consent_given = consented;
        self.save(&state);
        logging::debug(&format!("feedback consent set to: {consented}"));
    }

    pub fn has_feedback_consent(&self) -> bool {
        self.load().feedback_consent_given
    }

    /// Persist the run count at which feedback was last shown or skipped.
    pub fn update_last_feedback_run_count(&self, run_count: u64) {
        let mut state = self.load();
        state.last_feedback_run_count = run_count;
        self.save(&state);
        logging::debug(&format!("updated last feedback run count to {run_count}"));
    }

    pub fn get_last_feedback_run_count(&self) -> u64 {
        self.load().last_feedback_run_count
    }

    /// Overwrite the state file with schema defaults.
    pub fn reset(&self) {
        self.save(&PersistentState::default());
        eprintln!("[neurohub] state reset to defaults");
    }

    /// Whether the privacy notice is due: never shown, shown at least
    /// `days_threshold` days ago, or the stored timestamp is unparseable
    /// (fail open toward showing it).
    pub fn should_show_privacy_notice(&self, days_threshold: i64) -> bool {
        let state = self.load();
        let Some(last_shown) = state.last_privacy_notice_shown else {
            return true;
        };
        match DateTime::parse_from_rfc3339(&last_shown) {
            Ok(ts) => {
                let days_since = Utc::now().signed_duration_since(ts).num_days();
                days_since >= days_threshold
            }
            Err(_) => true,
        }
    }

    /// Stamp the privacy notice as shown now (UTC).
    pub fn mark_privacy_notice_shown(&self) {
        let mut state = self.load();
        state.last_privacy_notice_shown =
            Some(Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true));
        self.save(&state);
        logging::debug("marked privacy notice as shown");
    }

    /// Remember the current download session's log path (in-memory only).
    pub fn set_current_download_log_path(&mut self, log_path: Option<PathBuf>) {
        self.current_download_log = log_path;
    }

    pub fn current_download_log_path(&self) -> Option<&Path> {
        self.current_download_log.as_deref()
    }
}
