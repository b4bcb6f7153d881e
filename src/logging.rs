// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. `--log-level` (applies to every target),
//! 2. `DATAFLOW_DYNAMICS_LOG`, which takes full filter directives, e.g.
//!    `info,dataflow_dynamics::propagation=debug`,
//! 3. `info`.
//!
//! Propagation traces are at `debug`; fallback policies and stalls are at
//! `warn`. Everything goes to stderr so that stdout only carries the report.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV_VAR: &str = "DATAFLOW_DYNAMICS_LOG";

/// Initialise the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(directive_for(level)),
        None => match std::env::var(LOG_ENV_VAR) {
            Ok(directives) => EnvFilter::try_new(&directives)
                .with_context(|| format!("invalid {LOG_ENV_VAR} value '{directives}'"))?,
            Err(_) => EnvFilter::new("info"),
        },
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

fn directive_for(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
