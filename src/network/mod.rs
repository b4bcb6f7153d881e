// src/network/mod.rs

//! The deployed task graph the dynamics are computed on.
//!
//! - [`task`] describes tasks: activity, kind, devices, hints.
//! - [`port`] describes input and output port models.
//! - [`connections`] holds the concrete connection graph and policies.
//! - [`build`] turns a validated network file into a [`Network`].
//!
//! A [`Network`] is a frozen snapshot: nothing in here changes while the
//! dynamics are being computed.

pub mod build;
pub mod connections;
pub mod port;
pub mod task;

use std::collections::BTreeMap;
use std::time::Duration;

pub use connections::{ConnectionGraph, ConnectionPolicy, EdgePolicy, PortMapping};
pub use port::{InputPort, OutputPort};
pub use task::{Activity, DeviceAttachment, DeviceSpec, DynamicsHints, TaskKind, TaskSpec};

/// Canonical task name type.
pub type TaskName = String;

/// Canonical port name type.
pub type PortName = String;

/// Deployed tasks plus the concrete connections between their ports.
#[derive(Debug, Clone, Default)]
pub struct Network {
    tasks: BTreeMap<TaskName, TaskSpec>,
    connections: ConnectionGraph<EdgePolicy>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task, replacing any task with the same name.
    pub fn add_task(&mut self, task: TaskSpec) {
        self.tasks.insert(task.name.clone(), task);
    }

    /// Connect `source_task.source_port` to `sink_task.sink_port`.
    ///
    /// Ports are not checked here; a link to an undeclared port is reported
    /// when its policy gets computed.
    pub fn connect(
        &mut self,
        source_task: &str,
        source_port: &str,
        sink_task: &str,
        sink_port: &str,
        policy: EdgePolicy,
    ) {
        self.connections
            .add_connection(source_task, source_port, sink_task, sink_port, policy);
    }

    pub fn task(&self, name: &str) -> Option<&TaskSpec> {
        self.tasks.get(name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskSpec> {
        self.tasks.values()
    }

    pub fn task_names(&self) -> Vec<TaskName> {
        self.tasks.keys().cloned().collect()
    }

    pub fn connections(&self) -> &ConnectionGraph<EdgePolicy> {
        &self.connections
    }

    /// Tasks running in the triggering context of `master`.
    pub fn slaves_of<'a>(&'a self, master: &'a str) -> impl Iterator<Item = &'a TaskSpec> + 'a {
        self.tasks
            .values()
            .filter(move |t| t.master() == Some(master))
    }

    pub fn has_concrete_input_connection(&self, task: &str, port: &str) -> bool {
        self.connections.has_concrete_input_connection(task, port)
    }

    /// Outputs connected to `task.port`, as `(task, port)` pairs.
    pub fn sources_of(&self, task: &str, port: &str) -> Vec<(&str, &str)> {
        self.connections.sources_of(task, port)
    }

    /// Period of the task that ultimately triggers `task`: its own, or the
    /// one at the root of its master chain.
    pub fn find_period_of(&self, task: &TaskSpec) -> Option<Duration> {
        let mut current = task;
        let mut hops = 0;
        while let Some(master) = current.master() {
            // A master loop never reaches a periodic root.
            hops += 1;
            if hops > self.tasks.len() {
                return None;
            }
            current = self.tasks.get(master)?;
        }
        current.period()
    }
}
