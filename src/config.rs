//! Runtime settings merged from the optional config file and environment.
//!
//! The config file lives at `<base>/config.toml` (see [`crate::paths`]).
//! Environment variables take precedence over the file:
//! - `NEUROHUB_TELEMETRY_ENDPOINT` — reporting endpoint override
//! - `NEUROHUB_TELEMETRY_TIMEOUT_SECS` — request timeout for download events
//!
//! Consent is deliberately NOT configurable here: it lives in the state
//! file and is only changed through the explicit consent flows.

/// Endpoint all telemetry and feedback events are posted to.
pub const DEFAULT_ENDPOINT: &str = "https://telemetry.neurohub.io/v1/events";

/// Request timeout for download events (seconds).
pub const DEFAULT_TELEMETRY_TIMEOUT_SECS: u64 = 3;

/// Request timeout for interactive feedback sends (seconds).
pub const DEFAULT_FEEDBACK_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: String,
    pub telemetry_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            telemetry_timeout_secs: DEFAULT_TELEMETRY_TIMEOUT_SECS,
        }
    }
}

fn apply_toml(settings: &mut Settings, table: &toml::Table) {
    let Some(telemetry) = table.get("telemetry").and_then(toml::Value::as_table) else {
        return;
    };
    if let Some(endpoint) = telemetry.get("endpoint").and_then(toml::Value::as_str) {
        settings.endpoint = endpoint.to_string();
    }
    if let Some(timeout) = telemetry.get("timeout_secs").and_then(toml::Value::as_integer)
        && timeout > 0
    {
        settings.telemetry_timeout_secs = timeout.unsigned_abs();
    }
}

/// Load [`Settings`] by merging the optional config file with environment
/// variables. Environment variables take precedence over the file.
pub fn load() -> Settings {
    let mut settings = Settings::default();

    if let Some(cfg_path) = crate::paths::config_file()
        && cfg_path.exists()
        && let Ok(content) = std::fs::read_to_string(&cfg_path)
        && let Ok(table) = content.parse::<toml::Table>()
    {
        apply_toml(&mut settings, &table);
    }

    if let Ok(val) = std::env::var("NEUROHUB_TELEMETRY_ENDPOINT")
        && !val.is_empty()
    {
        settings.endpoint = val;
    }
    if let Ok(val) = std::env::var("NEUROHUB_TELEMETRY_TIMEOUT_SECS")
        && let Ok(secs) = val.parse::<u64>()
        && secs > 0
    {
        settings.telemetry_timeout_secs = secs;
    }

    settings
}
