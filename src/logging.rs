// src/logging.rs

//! Logging setup for `assetdag` using `tracing` + `tracing-subscriber`.
//!
//! Filter selection, first match wins:
//! 1. `--log-level` applies one level to assetdag and its HTTP layer.
//! 2. `ASSETDAG_LOG` is read as a full `EnvFilter` directive string, so both
//!    `debug` and `assetdag=trace,tower_http=debug` work.
//! 3. [`DEFAULT_DIRECTIVES`].
//!
//! Logs go to stderr; `--list` and `--dry-run` print on stdout.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable consulted when no `--log-level` flag is given.
pub const LOG_ENV_VAR: &str = "ASSETDAG_LOG";

/// Pipelines at info, request traces from the dev server kept quiet.
pub const DEFAULT_DIRECTIVES: &str = "info,tower_http=warn";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(lvl) => EnvFilter::new(directives_for(lvl)),
        None => EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES)),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

fn directives_for(lvl: LogLevel) -> String {
    let level = match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };
    // Dependencies stay at warn unless they are the HTTP layer.
    format!("warn,assetdag={level},tower_http={level}")
}
