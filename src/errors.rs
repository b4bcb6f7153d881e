// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DynamicsError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("buffer_size_margin must be a finite, non-negative ratio (got {0})")]
    InvalidMargin(f64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The graph handed to us contradicts its own task models (e.g. an edge
    /// naming a port the task does not declare).
    #[error("Internal error: {0}")]
    InternalError(String),

    #[error(
        "the period information for output port {output} cannot be computed; \
         it is needed to compute the policy to connect to {sink}"
    )]
    UnresolvedDynamics { output: String, sink: String },

    #[error("{sink_task} has no minimal period, needed to compute the reading latency on {sink}")]
    MissingSinkPeriod { sink_task: String, sink: String },

    #[error("Timing dependency cycle: {0}")]
    TimingCycle(String),
}

pub type Result<T> = std::result::Result<T, DynamicsError>;
