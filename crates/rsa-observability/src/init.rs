// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console logging is always available. With the `file-logging` feature,
//! [`init_logging`] also writes JSON logs into a timestamped run folder and
//! prunes old runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "file-logging")]
use crate::cli::CrateDebugFlags;

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Number of run folders kept when no retention is given
pub const DEFAULT_RETAINED_RUNS: usize = 10;

/// Install a console-only subscriber
///
/// `filter` is any `EnvFilter` directive string, e.g. `"info"` or the output of
/// [`crate::CrateDebugFlags::to_filter_string`].
///
/// # Errors
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_console_logging(filter: &str) -> Result<()> {
    let env_filter = build_filter(filter)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .finish()
        .try_init()
        .context("Failed to install console subscriber")?;
    Ok(())
}

/// Parse an `EnvFilter` directive string
pub fn build_filter(filter: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(filter).with_context(|| format!("Invalid log filter: {}", filter))
}

/// Keeps the file writer alive; logs are flushed when it is dropped
#[cfg(feature = "file-logging")]
pub struct LoggingGuard {
    _file_guard: tracing_appender::non_blocking::WorkerGuard,
    run_dir: PathBuf,
}

#[cfg(feature = "file-logging")]
impl LoggingGuard {
    /// Run folder the log file is written to
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

/// Initialize console logging plus a JSON log file
///
/// Creates:
/// ```text
/// ./logs/
///   └── run_20250101_120000/
///       └── searchlight-rsa.log
/// ```
///
/// # Arguments
/// * `debug_flags` - Per-crate debug flags for filtering
/// * `base_level` - Level for crates without a debug flag
/// * `log_dir` - Base directory for logs (default: `./logs`)
/// * `retained_runs` - Keep N most recent runs (default: [`DEFAULT_RETAINED_RUNS`])
#[cfg(feature = "file-logging")]
pub fn init_logging(
    debug_flags: &CrateDebugFlags,
    base_level: &str,
    log_dir: Option<PathBuf>,
    retained_runs: Option<usize>,
) -> Result<LoggingGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::{Layer, Registry};

    let base_log_dir = log_dir.unwrap_or_else(|| PathBuf::from("./logs"));
    let run_dir = base_log_dir.join(run_folder_name());
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("Failed to create log directory: {}", run_dir.display()))?;

    // The new run counts toward retention
    cleanup_old_runs(&base_log_dir, retained_runs.unwrap_or(DEFAULT_RETAINED_RUNS))?;

    let filter = debug_flags.to_filter_string(base_level);
    let console_filter = build_filter(&filter)?;
    let file_filter = build_filter(&filter)?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(console_filter);

    let appender = tracing_appender::rolling::never(&run_dir, "searchlight-rsa.log");
    let (non_blocking, file_guard) = tracing_appender::non_blocking(appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(file_filter);

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install logging subscriber")?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
        run_dir,
    })
}

/// Folder name for a run started now: `run_YYYYmmdd_HHMMSS`
pub fn run_folder_name() -> String {
    format!("{}{}", RUN_PREFIX, Utc::now().format(RUN_TIMESTAMP_FORMAT))
}

/// Remove all but the `retain` most recent run folders under `base_log_dir`
///
/// Only directories named `run_<timestamp>` are considered. Returns the number
/// of folders removed.
pub fn cleanup_old_runs(base_log_dir: &Path, retain: usize) -> Result<usize> {
    if !base_log_dir.exists() {
        return Ok(0);
    }

    let mut runs: Vec<(PathBuf, NaiveDateTime)> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)
        .with_context(|| format!("Failed to read log directory: {}", base_log_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let timestamp = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(RUN_PREFIX))
            .and_then(|ts| NaiveDateTime::parse_from_str(ts, RUN_TIMESTAMP_FORMAT).ok());
        if let Some(timestamp) = timestamp {
            runs.push((path, timestamp));
        }
    }

    if runs.len() <= retain {
        return Ok(0);
    }

    // Oldest first
    runs.sort_by_key(|(_, timestamp)| *timestamp);
    let to_remove = runs.len() - retain;
    let mut removed = 0;
    for (path, _) in runs.iter().take(to_remove) {
        match std::fs::remove_dir_all(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            ),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_run_folder_name_parses_back() {
        let name = run_folder_name();
        let ts = name.strip_prefix(RUN_PREFIX).unwrap();
        assert!(NaiveDateTime::parse_from_str(ts, RUN_TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_cleanup_keeps_most_recent_runs() {
        let dir = tempdir().unwrap();
        for name in [
            "run_20240101_000000",
            "run_20240301_000000",
            "run_20240201_000000",
            "run_20240401_000000",
        ] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::create_dir(dir.path().join("notes")).unwrap();
        std::fs::write(dir.path().join("run_20200101_000000"), "not a dir").unwrap();

        let removed = cleanup_old_runs(dir.path(), 2).unwrap();

        assert_eq!(removed, 2);
        assert!(!dir.path().join("run_20240101_000000").exists());
        assert!(!dir.path().join("run_20240201_000000").exists());
        assert!(dir.path().join("run_20240301_000000").exists());
        assert!(dir.path().join("run_20240401_000000").exists());
        assert!(dir.path().join("notes").exists());
        assert!(dir.path().join("run_20200101_000000").exists());
    }

    #[test]
    fn test_cleanup_missing_dir() {
        let dir = tempdir().unwrap();
        assert_eq!(cleanup_old_runs(&dir.path().join("absent"), 1).unwrap(), 0);
    }

    #[test]
    fn test_filter_from_debug_flags() {
        let flags = crate::CrateDebugFlags::from_args(vec!["--debug-all".to_string()]);
        assert!(build_filter(&flags.to_filter_string("warn")).is_ok());
        assert!(build_filter("rsa-searchlight=loud").is_err());
    }

    #[test]
    fn test_invalid_console_filter() {
        assert!(init_console_logging("rsa-compute=notalevel").is_err());
    }
}
