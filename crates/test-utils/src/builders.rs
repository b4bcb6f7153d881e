#![allow(dead_code)]

use std::time::Duration;

use dataflow_dynamics::dynamics::PortDynamics;
use dataflow_dynamics::network::{
    Activity, DeviceAttachment, DeviceSpec, EdgePolicy, InputPort, Network, OutputPort, TaskKind,
    TaskSpec,
};
use dataflow_dynamics::types::ConnectionKind;

/// Seconds as a `Duration`, for terse test setups.
pub fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value)
}

/// Builder for [`TaskSpec`].
pub struct TaskSpecBuilder {
    task: TaskSpec,
}

impl TaskSpecBuilder {
    pub fn periodic(name: &str, period: f64) -> Self {
        Self {
            task: TaskSpec::new(name, Activity::Periodic(secs(period))),
        }
    }

    pub fn triggered(name: &str) -> Self {
        Self {
            task: TaskSpec::new(name, Activity::Triggered),
        }
    }

    pub fn slave(name: &str, master: &str) -> Self {
        Self {
            task: TaskSpec::new(
                name,
                Activity::Slave {
                    master: master.to_string(),
                },
            ),
        }
    }

    pub fn trigger_latency(mut self, latency: f64) -> Self {
        self.task.trigger_latency = secs(latency);
        self
    }

    /// Output written on every task update.
    pub fn output(self, name: &str) -> Self {
        self.output_port(OutputPort::new(name))
    }

    pub fn output_port(mut self, port: OutputPort) -> Self {
        self.task.outputs.insert(port.name.clone(), port);
        self
    }

    /// Output written only when one of `triggers` receives data.
    pub fn output_on(mut self, name: &str, triggers: &[&str]) -> Self {
        let mut port = OutputPort::new(name);
        port.triggered_on_update = false;
        port.port_triggers = triggers.iter().map(|t| t.to_string()).collect();
        self.task.outputs.insert(port.name.clone(), port);
        self
    }

    /// Trigger input that accepts any connection.
    pub fn input(mut self, name: &str) -> Self {
        self.task.inputs.insert(name.to_string(), InputPort::new(name));
        self
    }

    /// Input that needs a reliable connection.
    pub fn reliable_input(mut self, name: &str, trigger_port: bool) -> Self {
        let mut port = InputPort::new(name);
        port.trigger_port = trigger_port;
        port.needs_reliable_connection = true;
        self.task.inputs.insert(name.to_string(), port);
        self
    }

    /// Input that does not need a reliable connection.
    pub fn unreliable_input(mut self, name: &str, kind: ConnectionKind) -> Self {
        let mut port = InputPort::new(name);
        port.required_connection_type = kind;
        self.task.inputs.insert(name.to_string(), port);
        self
    }

    pub fn driver(mut self, device: DeviceSpec, ports: &[&str]) -> Self {
        let attachment = attachment(device, ports);
        match &mut self.task.kind {
            TaskKind::Driver(devices) => devices.push(attachment),
            kind => *kind = TaskKind::Driver(vec![attachment]),
        }
        self
    }

    pub fn combus(mut self, device: DeviceSpec, ports: &[&str]) -> Self {
        let attachment = attachment(device, ports);
        match &mut self.task.kind {
            TaskKind::ComBus(devices) => devices.push(attachment),
            kind => *kind = TaskKind::ComBus(vec![attachment]),
        }
        self
    }

    pub fn task_hint(mut self, hint: PortDynamics) -> Self {
        self.task.hints.task = Some(hint);
        self
    }

    pub fn port_hint(mut self, port: &str, hint: PortDynamics) -> Self {
        self.task.hints.ports.insert(port.to_string(), hint);
        self
    }

    pub fn build(self) -> TaskSpec {
        self.task
    }
}

/// A device sampled every `period` seconds (`None` for none).
pub fn device(name: &str, period: Option<f64>, burst: u64, sample_size: u64) -> DeviceSpec {
    DeviceSpec {
        name: name.to_string(),
        period: period.map(secs),
        burst,
        sample_size,
    }
}

fn attachment(device: DeviceSpec, ports: &[&str]) -> DeviceAttachment {
    DeviceAttachment {
        device,
        ports: ports.iter().map(|p| p.to_string()).collect(),
    }
}

/// Builder for [`Network`].
pub struct NetworkBuilder {
    network: Network,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self {
            network: Network::new(),
        }
    }

    pub fn task(mut self, task: TaskSpecBuilder) -> Self {
        self.network.add_task(task.build());
        self
    }

    /// Connect `"task.port"` to `"task.port"`.
    pub fn connect(mut self, from: &str, to: &str, policy: EdgePolicy) -> Self {
        let (source_task, source_port) = split(from);
        let (sink_task, sink_port) = split(to);
        self.network
            .connect(source_task, source_port, sink_task, sink_port, policy);
        self
    }

    pub fn build(self) -> Network {
        self.network
    }
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn split(endpoint: &str) -> (&str, &str) {
    endpoint
        .rsplit_once('.')
        .unwrap_or_else(|| panic!("endpoint '{endpoint}' is not \"task.port\""))
}
