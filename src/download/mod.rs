//! Dataset download dispatch.
//!
//! neurohub does not transfer bytes itself; it shells out to the tool a
//! dataset's catalog entry names (`aws`, `aria2c` or `datalad`) and
//! reports pass/fail. Each session gets a leveled log file whose path is
//! registered with the state store so later feedback can summarize it.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::catalog::{Dataset, DownloadMethod};
use crate::logging::{self, DownloadLog};
use crate::state::StateStore;

/// Transient failures are retried this many times on top of the first
/// attempt. All three tools resume partial transfers on re-invocation.
const MAX_RESUME_ATTEMPTS: u32 = 2;

/// Result of one download session.
#[derive(Debug)]
pub struct Outcome {
    pub succeeded: bool,
    pub resume_attempts: u32,
    pub log_path: Option<PathBuf>,
}

/// Program and arguments for fetching `dataset` into `dest`.
pub fn command_for(dataset: &Dataset, dest: &Path) -> (&'static str, Vec<String>) {
    let dest = dest.display().to_string();
    match dataset.download_method {
        DownloadMethod::AwsS3 => {
            let mut args = vec!["s3".to_string(), "sync".to_string(), dataset.source.clone(), dest];
            // Gated buckets need the caller's credentials; open ones
            // must not send any.
            if !dataset.auth_required {
                args.push("--no-sign-request".to_string());
            }
            ("aws", args)
        }
        DownloadMethod::Aria2c => (
            "aria2c",
            vec![
                "-c".to_string(),
                "-x".to_string(),
                "8".to_string(),
                "-d".to_string(),
                dest,
                dataset.source.clone(),
            ],
        ),
        DownloadMethod::Datalad => (
            "datalad",
            vec![
                "install".to_string(),
                "-r".to_string(),
                "-s".to_string(),
                dataset.source.clone(),
                dest,
            ],
        ),
    }
}

/// The command as a single display string, for dry runs and logs.
pub fn render_command(program: &str, args: &[String]) -> String {
    let mut rendered = String::from(program);
    for arg in args {
        rendered.push(' ');
        if arg.contains(' ') {
            rendered.push('\'');
            rendered.push_str(arg);
            rendered.push('\'');
        } else {
            rendered.push_str(arg);
        }
    }
    rendered
}

/// Print access instructions for a gated dataset and ask whether the
/// caller has completed them. Non-gated datasets pass trivially.
pub fn check_auth(dataset: &Dataset) -> bool {
    if !dataset.auth_required {
        return true;
    }

    println!();
    println!("'{}' requires approved access.", dataset.id);
    println!("  1. Request access from the data provider: {}", dataset.source);
    println!("  2. Configure the resulting credentials for `{}`.", dataset.download_method);
    println!("  3. Re-run this command once access is in place.");
    println!();

    dialoguer::Confirm::new()
        .with_prompt("Are your credentials configured?")
        .default(false)
        .interact()
        .unwrap_or(false)
}

/// Run the download, retrying resumable failures, logging every attempt.
///
/// Never returns an error: tool-missing and non-zero exits are outcomes,
/// not faults. The session log path (when one could be created) is
/// registered with `store` before the first attempt.
pub fn run(store: &mut StateStore, dataset: &Dataset, dest: &Path) -> Outcome {
    if let Err(e) = std::fs::create_dir_all(dest) {
        logging::warn(&format!("cannot create {}: {e}", dest.display()));
        return Outcome {
            succeeded: false,
            resume_attempts: 0,
            log_path: None,
        };
    }

    let mut log = crate::paths::logs_dir()
        .and_then(|dir| match DownloadLog::create(&dir, &dataset.id) {
            Ok(log) => Some(log),
            Err(e) => {
                logging::warn(&format!("session log unavailable: {e}"));
                None
            }
        });
    let log_path = log.as_ref().map(|l| l.path().to_path_buf());
    store.set_current_download_log_path(log_path.clone());

    let (program, args) = command_for(dataset, dest);
    let rendered = render_command(program, &args);
    if let Some(log) = log.as_mut() {
        log.info(&format!("command: {rendered}"));
    }

    let mut resume_attempts = 0;
    loop {
        logging::debug(&format!("running: {rendered}"));
        match Command::new(program).args(&args).status() {
            Ok(status) if status.success() => {
                if let Some(log) = log.as_mut() {
                    log.info("transfer completed");
                }
                return Outcome {
                    succeeded: true,
                    resume_attempts,
                    log_path,
                };
            }
            Ok(status) => {
                let code = status.code().unwrap_or(-1);
                if resume_attempts < MAX_RESUME_ATTEMPTS {
                    resume_attempts += 1;
                    if let Some(log) = log.as_mut() {
                        log.warning(&format!(
                            "exited with code {code}, resuming (attempt {resume_attempts})"
                        ));
                    }
                    println!("Transfer interrupted (exit {code}), resuming...");
                } else {
                    if let Some(log) = log.as_mut() {
                        log.error(&format!("exited with code {code}, giving up"));
                    }
                    return Outcome {
                        succeeded: false,
                        resume_attempts,
                        log_path,
                    };
                }
            }
            Err(e) => {
                if let Some(log) = log.as_mut() {
                    log.error(&format!("could not launch {program}: {e}"));
                }
                eprintln!("Could not launch `{program}`: {e}");
                eprintln!("Install it and ensure it is on PATH, then retry.");
                return Outcome {
                    succeeded: false,
                    resume_attempts,
                    log_path,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests;
