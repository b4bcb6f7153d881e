// src/network/task.rs

//! Deployed task descriptions.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::dynamics::PortDynamics;
use crate::network::{InputPort, OutputPort, PortName, TaskName};

/// How the task gets triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    /// Runs every period, whatever its inputs do.
    Periodic(Duration),
    /// Runs when data arrives on a trigger port.
    Triggered,
    /// Runs in the triggering context of another task.
    Slave { master: TaskName },
}

/// A sensing device, or a device behind a communication bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub name: String,
    /// Sampling period of the device, if it has one.
    pub period: Option<Duration>,
    /// Samples that can arrive at once.
    pub burst: u64,
    pub sample_size: u64,
}

/// A device and the task ports it is wired to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAttachment {
    pub device: DeviceSpec,
    /// Outputs for a driver, inputs for a communication bus.
    pub ports: Vec<PortName>,
}

/// What the task stands for. Drivers and buses get their timing from the
/// hardware rather than from the dataflow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskKind {
    #[default]
    Component,
    Driver(Vec<DeviceAttachment>),
    ComBus(Vec<DeviceAttachment>),
}

/// Dynamics supplied by whoever requested the task, bypassing propagation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DynamicsHints {
    /// Merged into the task node, which still gets resolved normally.
    pub task: Option<PortDynamics>,
    /// Port dynamics, final as soon as they are seeded.
    pub ports: BTreeMap<PortName, PortDynamics>,
}

/// One deployed task and its interface.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    pub name: TaskName,
    pub activity: Activity,
    /// Time between a trigger and the moment the task has processed it.
    pub trigger_latency: Duration,
    pub kind: TaskKind,
    pub inputs: BTreeMap<PortName, InputPort>,
    pub outputs: BTreeMap<PortName, OutputPort>,
    pub hints: DynamicsHints,
}

impl TaskSpec {
    pub fn new(name: impl Into<TaskName>, activity: Activity) -> Self {
        Self {
            name: name.into(),
            activity,
            trigger_latency: Duration::ZERO,
            kind: TaskKind::Component,
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            hints: DynamicsHints::default(),
        }
    }

    /// The task's own period. Slaves report `None`; see
    /// [`Network::find_period_of`](crate::network::Network::find_period_of).
    pub fn period(&self) -> Option<Duration> {
        match self.activity {
            Activity::Periodic(period) => Some(period),
            Activity::Triggered | Activity::Slave { .. } => None,
        }
    }

    pub fn master(&self) -> Option<&str> {
        match &self.activity {
            Activity::Slave { master } => Some(master.as_str()),
            _ => None,
        }
    }

    pub fn find_output_port(&self, name: &str) -> Option<&OutputPort> {
        self.outputs.get(name)
    }

    pub fn find_input_port(&self, name: &str) -> Option<&InputPort> {
        self.inputs.get(name)
    }

    /// Inputs that wake the task up when data arrives.
    pub fn event_ports(&self) -> impl Iterator<Item = &InputPort> {
        self.inputs.values().filter(|p| p.trigger_port)
    }
}
