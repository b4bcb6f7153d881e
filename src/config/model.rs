// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{DynamicsError, Result};
use crate::flow::{BufferSizeMargin, SynthesisConfig};
use crate::network::ConnectionPolicy;
use crate::types::{ActivityKind, ConnectionKind, TaskKindTag};

/// Network description as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// buffer_size_margin = 0.1
///
/// [task.camera]
/// activity = "periodic"
/// period = 0.1
///
/// [task.camera.output.frames]
///
/// [task.viewer]
/// trigger_latency = 0.01
///
/// [task.viewer.input.frames]
/// needs_reliable_connection = true
///
/// [[connection]]
/// from = "camera.frames"
/// to = "viewer.frames"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawNetworkFile {
    /// Global settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// All `[[connection]]` entries.
    #[serde(default)]
    pub connection: Vec<ConnectionConfig>,
}

/// Validated network description.
///
/// Only obtainable through `TryFrom<RawNetworkFile>`, so holding one means
/// every reference in it resolves and every number is in range.
#[derive(Debug, Clone)]
pub struct NetworkFile {
    pub config: ConfigSection,
    pub task: BTreeMap<String, TaskConfig>,
    pub connection: Vec<ConnectionConfig>,
}

impl NetworkFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        task: BTreeMap<String, TaskConfig>,
        connection: Vec<ConnectionConfig>,
    ) -> Self {
        Self {
            config,
            task,
            connection,
        }
    }

    /// Synthesis parameters from `[config]`.
    pub fn synthesis_config(&self) -> Result<SynthesisConfig> {
        Ok(SynthesisConfig {
            buffer_size_margin: BufferSizeMargin::new(self.config.buffer_size_margin)?,
        })
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Ratio added to every computed buffer size (default 0.1).
    #[serde(default = "default_buffer_size_margin")]
    pub buffer_size_margin: f64,
}

fn default_buffer_size_margin() -> f64 {
    BufferSizeMargin::DEFAULT.value()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            buffer_size_margin: default_buffer_size_margin(),
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    #[serde(default)]
    pub activity: ActivityKind,

    /// Period in seconds; required when `activity = "periodic"`.
    #[serde(default)]
    pub period: Option<f64>,

    /// Task whose triggering context this one shares; required when
    /// `activity = "slave"`.
    #[serde(default)]
    pub master: Option<String>,

    /// Seconds between a trigger and the moment it has been processed.
    #[serde(default)]
    pub trigger_latency: f64,

    #[serde(default)]
    pub kind: TaskKindTag,

    /// `[task.<name>.output.<port>]` tables.
    #[serde(default)]
    pub output: BTreeMap<String, OutputConfig>,

    /// `[task.<name>.input.<port>]` tables.
    #[serde(default)]
    pub input: BTreeMap<String, InputConfig>,

    /// `[[task.<name>.device]]` entries, for drivers and buses.
    #[serde(default)]
    pub device: Vec<DeviceConfig>,

    /// `[[task.<name>.hint]]` entries.
    #[serde(default)]
    pub hint: Vec<HintConfig>,
}

/// `[task.<name>.output.<port>]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_sample_size")]
    pub sample_size: u64,

    /// Seconds; zero for aperiodic bursts.
    #[serde(default)]
    pub burst_period: f64,

    #[serde(default)]
    pub burst_size: u64,

    #[serde(default = "default_true")]
    pub triggered_on_update: bool,

    /// Input ports whose data causes a write on this port.
    #[serde(default)]
    pub port_triggers: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            burst_period: 0.0,
            burst_size: 0,
            triggered_on_update: true,
            port_triggers: Vec::new(),
        }
    }
}

/// `[task.<name>.input.<port>]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_true")]
    pub trigger_port: bool,

    #[serde(default)]
    pub needs_reliable_connection: bool,

    #[serde(default)]
    pub connection_type: ConnectionKind,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            trigger_port: true,
            needs_reliable_connection: false,
            connection_type: ConnectionKind::Data,
        }
    }
}

/// `[[task.<name>.device]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub name: String,

    /// Device sampling period in seconds, if it has one.
    #[serde(default)]
    pub period: Option<f64>,

    #[serde(default)]
    pub burst: u64,

    #[serde(default = "default_sample_size")]
    pub sample_size: u64,

    /// Task ports the device is wired to.
    #[serde(default)]
    pub ports: Vec<String>,
}

/// `[[task.<name>.hint]]` entry: a trigger known in advance.
#[derive(Debug, Clone, Deserialize)]
pub struct HintConfig {
    /// Port the hint applies to; the task itself when absent.
    #[serde(default)]
    pub port: Option<String>,

    pub name: String,

    /// Seconds; zero for a burst.
    #[serde(default)]
    pub period: f64,

    pub sample_count: u64,

    #[serde(default)]
    pub sample_size: Option<u64>,
}

/// `[[connection]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// `"task.port"` of the output.
    pub from: String,

    /// `"task.port"` of the input.
    pub to: String,

    /// Explicit policy, kept as is.
    #[serde(default)]
    pub policy: Option<ConnectionPolicy>,

    /// Policy used when the dynamics are not enough to size the channel.
    #[serde(default)]
    pub fallback: Option<ConnectionPolicy>,
}

impl ConnectionConfig {
    pub fn source(&self) -> Result<(&str, &str)> {
        parse_endpoint(&self.from)
    }

    pub fn sink(&self) -> Result<(&str, &str)> {
        parse_endpoint(&self.to)
    }
}

fn default_sample_size() -> u64 {
    1
}

fn default_true() -> bool {
    true
}

/// Split `"task.port"`; the port is whatever follows the last dot.
pub fn parse_endpoint(endpoint: &str) -> Result<(&str, &str)> {
    match endpoint.rsplit_once('.') {
        Some((task, port)) if !task.is_empty() && !port.is_empty() => Ok((task, port)),
        _ => Err(DynamicsError::ConfigError(format!(
            "invalid connection endpoint '{endpoint}' (expected \"task.port\")"
        ))),
    }
}

/// Seconds from the file as a [`Duration`].
pub fn seconds(value: f64, what: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        DynamicsError::ConfigError(format!(
            "{what} must be a finite, non-negative number of seconds (got {value})"
        ))
    })
}
