//! Centralised neurohub user-directory resolution.
//!
//! When `NEUROHUB_HOME` is set, it replaces the platform-native per-user
//! base directory for everything: state file, download logs, config file.
//!
//! Priority for the user-level base directory:
//!   1. `NEUROHUB_HOME` env var (if set and non-empty)
//!   2. `dirs::home_dir().map(|d| d.join(".neurohub"))`
//!
//! For the state file, an additional override applies on top:
//!   1. `NEUROHUB_STATE_PATH` env var (highest priority)
//!   2. `<base>/state.json`

use std::path::PathBuf;

/// Returns the neurohub user-level base directory.
pub fn base_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("NEUROHUB_HOME")
        && !home.is_empty()
    {
        return Some(PathBuf::from(home));
    }
    dirs::home_dir().map(|d| d.join(".neurohub"))
}

/// Returns the canonical state file path.
///
/// `NEUROHUB_STATE_PATH` overrides; otherwise `<base>/state.json`.
pub fn state_file() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("NEUROHUB_STATE_PATH")
        && !p.is_empty()
    {
        return Some(PathBuf::from(p));
    }
    base_dir().map(|d| d.join("state.json"))
}

/// Returns the directory for per-download session logs.
pub fn logs_dir() -> Option<PathBuf> {
    base_dir().map(|d| d.join("logs"))
}

/// Returns the optional config file path (`<base>/config.toml`).
pub fn config_file() -> Option<PathBuf> {
    base_dir().map(|d| d.join("config.toml"))
}
