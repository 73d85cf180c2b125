//! Diagnostics and per-download session logs.
//!
//! Process diagnostics go to stderr with a `[neurohub]` prefix; debug
//! detail is gated on the `NEUROHUB_DEBUG` env var. Each download session
//! additionally gets its own append-only leveled log file under
//! `logs/<dataset>_<timestamp>.log`, which the log analyzer later reads.

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::Utc;

/// Returns `true` when `NEUROHUB_DEBUG` is set.
pub fn debug_enabled() -> bool {
    std::env::var("NEUROHUB_DEBUG").is_ok()
}

/// Print a debug diagnostic to stderr when `NEUROHUB_DEBUG` is set.
pub fn debug(msg: &str) {
    if debug_enabled() {
        eprintln!("[neurohub] {msg}");
    }
}

/// Print a warning to stderr unconditionally.
pub fn warn(msg: &str) {
    eprintln!("[neurohub] warning: {msg}");
}

/// Append-only writer for one download session's log file.
///
/// Line format: `YYYY-MM-DDTHH:MM:SSZ - LEVEL - message`. The ` ERROR `
/// and ` WARNING ` markers are what [`crate::loganalysis`] keys on.
pub struct DownloadLog {
    path: PathBuf,
    file: File,
}

impl DownloadLog {
    /// Create a new session log `<dataset_id>_<utc timestamp>.log` in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be opened.
    pub fn create(dir: &Path, dataset_id: &str) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create log dir {}", dir.display()))?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("{dataset_id}_{stamp}.log"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open log file {}", path.display()))?;
        let mut log = Self { path, file };
        log.info(&format!("=== Download session started for {dataset_id} ==="));
        Ok(log)
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&mut self, msg: &str) {
        self.write_line("INFO", msg);
    }

    pub fn warning(&mut self, msg: &str) {
        self.write_line("WARNING", msg);
    }

    pub fn error(&mut self, msg: &str) {
        self.write_line("ERROR", msg);
    }

    fn write_line(&mut self, level: &str, msg: &str) {
        let ts = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        // Log writes are best-effort; a full disk must not fail a download.
        let _ = writeln!(self.file, "{ts} - {level} - {msg}");
    }
}
