//! Logging initialization.
//!
//! Configures the `tracing` subscriber with level filtering via the
//! `GRIDBOARD_LOG` environment variable. Falls back to `info` when the
//! variable is unset.
//!
//! # Usage
//!
//! ```bash
//! # Debug level
//! GRIDBOARD_LOG=debug gridboard tui
//!
//! # Module-specific filtering
//! GRIDBOARD_LOG=gridboard::layout=trace,warn gridboard tui
//! ```

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "GRIDBOARD_LOG";

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget<'a> {
    /// Standard error. Used by the one-shot CLI commands.
    Stderr,
    /// Append to a file. The terminal UI owns the screen, so it logs here.
    File(&'a Path),
    /// Drop everything.
    Discard,
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber.
///
/// Falls back to [`LogTarget::Discard`] with a message on stderr when the
/// log file cannot be opened. Calling this twice leaves the first
/// subscriber in place.
pub fn init(target: LogTarget<'_>) {
    let builder = fmt().with_env_filter(filter()).with_target(false);
    let result = match target {
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                let _ = crate::config::xdg::ensure_dir(parent);
            }
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => builder
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init(),
                Err(e) => {
                    eprintln!("Cannot open log file {}: {}", path.display(), e);
                    builder.with_writer(std::io::sink).try_init()
                }
            }
        }
        LogTarget::Discard => builder.with_writer(std::io::sink).try_init(),
    };
    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
