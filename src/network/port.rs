// src/network/port.rs

//! Port models as declared by a task's interface.

use std::time::Duration;

use crate::network::PortName;
use crate::types::ConnectionKind;

/// An output port and what is statically known about how it writes.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPort {
    pub name: PortName,
    /// Data samples per virtual sample.
    pub sample_size: u64,
    /// Period of the port's own bursts (zero when aperiodic).
    pub burst_period: Duration,
    /// Samples per burst; zero means the port has no bursts.
    pub burst_size: u64,
    /// Whether the port is written every time the task runs.
    pub triggered_on_update: bool,
    /// Inputs that cause a write on this port when they receive data.
    pub port_triggers: Vec<PortName>,
}

impl OutputPort {
    pub fn new(name: impl Into<PortName>) -> Self {
        Self {
            name: name.into(),
            sample_size: 1,
            burst_period: Duration::ZERO,
            burst_size: 0,
            triggered_on_update: true,
            port_triggers: Vec::new(),
        }
    }
}

/// An input port and the connection it asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPort {
    pub name: PortName,
    /// Data arriving here wakes the task up.
    pub trigger_port: bool,
    /// No sample may be lost on the way to this port.
    pub needs_reliable_connection: bool,
    /// Connection semantics used when no reliable connection is needed.
    pub required_connection_type: ConnectionKind,
}

impl InputPort {
    pub fn new(name: impl Into<PortName>) -> Self {
        Self {
            name: name.into(),
            trigger_port: true,
            needs_reliable_connection: false,
            required_connection_type: ConnectionKind::Data,
        }
    }
}
