//! Diagnostic logging through `tracing`.
//!
//! The level filter comes from `SEQOPT_LOG` (default `seqopt=info`). With
//! `--log <file>` records are appended to that file; otherwise they go to
//! stderr, but only when `SEQOPT_LOG` is set so the full-screen views stay clean.

use std::error::Error;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG: &str = "SEQOPT_LOG";
const DEFAULT_FILTER: &str = "seqopt=info";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
    Off,
}

/// Where records go for the given `--log` argument.
pub fn log_target(log_file: Option<&Path>, filter_from_env: bool) -> LogTarget {
    match log_file {
        Some(path) => LogTarget::File(path.to_path_buf()),
        None if filter_from_env => LogTarget::Stderr,
        None => LogTarget::Off,
    }
}

fn env_filter() -> (EnvFilter, bool) {
    match EnvFilter::try_from_env(ENV_LOG) {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(DEFAULT_FILTER), false),
    }
}

/// Install the global subscriber. Call once, before any other work.
pub fn init(log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let (filter, from_env) = env_filter();
    let timer = fmt::time::ChronoLocal::new(TIMESTAMP_FORMAT.to_string());

    match log_target(log_file, from_env) {
        LogTarget::Off => return Ok(()),
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_timer(timer),
                )
                .try_init()?;
        }
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true)
                        .with_timer(timer),
                )
                .try_init()?;
            tracing::info!(log_file = %path.display(), "seqopt starting");
        }
    }
    Ok(())
}
