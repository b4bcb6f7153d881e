// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `dataflow-dynamics`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dataflow-dynamics",
    version,
    about = "Compute port dynamics and connection buffer sizes for a deployed task network.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the network description (TOML).
    ///
    /// Default: `Network.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Network.toml")]
    pub network: String,

    /// Override `[config].buffer_size_margin` (non-negative ratio).
    #[arg(long, value_name = "RATIO")]
    pub margin: Option<f64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DATAFLOW_DYNAMICS_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the network, but compute nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
