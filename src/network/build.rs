// src/network/build.rs

//! Building a [`Network`] out of a validated network file.

use std::collections::BTreeMap;

use crate::config::model::{HintConfig, NetworkFile, TaskConfig, seconds};
use crate::dynamics::PortDynamics;
use crate::errors::Result;
use crate::network::{
    Activity, DeviceAttachment, DeviceSpec, DynamicsHints, EdgePolicy, InputPort, Network,
    OutputPort, PortName, TaskKind, TaskSpec,
};
use crate::types::{ActivityKind, TaskKindTag};

impl Network {
    /// Build the task graph described by `cfg`.
    pub fn from_config(cfg: &NetworkFile) -> Result<Self> {
        let mut network = Network::new();

        for (name, task) in cfg.task.iter() {
            network.add_task(task_from_config(name, task)?);
        }

        for connection in cfg.connection.iter() {
            let (source_task, source_port) = connection.source()?;
            let (sink_task, sink_port) = connection.sink()?;
            network.connect(
                source_task,
                source_port,
                sink_task,
                sink_port,
                EdgePolicy {
                    policy: connection.policy,
                    fallback: connection.fallback,
                },
            );
        }

        Ok(network)
    }
}

fn task_from_config(name: &str, cfg: &TaskConfig) -> Result<TaskSpec> {
    let activity = match cfg.activity {
        ActivityKind::Periodic => {
            Activity::Periodic(seconds(cfg.period.unwrap_or_default(), "period")?)
        }
        ActivityKind::Triggered => Activity::Triggered,
        ActivityKind::Slave => Activity::Slave {
            master: cfg.master.clone().unwrap_or_default(),
        },
    };

    let mut task = TaskSpec::new(name, activity);
    task.trigger_latency = seconds(cfg.trigger_latency, "trigger_latency")?;

    for (port_name, port) in cfg.output.iter() {
        let mut output = OutputPort::new(port_name.as_str());
        output.sample_size = port.sample_size;
        output.burst_period = seconds(port.burst_period, "burst_period")?;
        output.burst_size = port.burst_size;
        output.triggered_on_update = port.triggered_on_update;
        output.port_triggers = port.port_triggers.clone();
        task.outputs.insert(port_name.clone(), output);
    }

    for (port_name, port) in cfg.input.iter() {
        let mut input = InputPort::new(port_name.as_str());
        input.trigger_port = port.trigger_port;
        input.needs_reliable_connection = port.needs_reliable_connection;
        input.required_connection_type = port.connection_type;
        task.inputs.insert(port_name.clone(), input);
    }

    let mut attachments = Vec::new();
    for device in cfg.device.iter() {
        let period = device
            .period
            .map(|p| seconds(p, "device period"))
            .transpose()?;
        attachments.push(DeviceAttachment {
            device: DeviceSpec {
                name: device.name.clone(),
                period,
                burst: device.burst,
                sample_size: device.sample_size,
            },
            ports: device.ports.clone(),
        });
    }
    task.kind = match cfg.kind {
        TaskKindTag::Component => TaskKind::Component,
        TaskKindTag::Driver => TaskKind::Driver(attachments),
        TaskKindTag::Combus => TaskKind::ComBus(attachments),
    };

    task.hints = hints_from_config(&task, &cfg.hint)?;
    Ok(task)
}

/// Group hint entries per node. Entries for the same node merge.
fn hints_from_config(task: &TaskSpec, hints: &[HintConfig]) -> Result<DynamicsHints> {
    let mut task_hint: Option<PortDynamics> = None;
    let mut port_hints: BTreeMap<PortName, PortDynamics> = BTreeMap::new();

    for hint in hints {
        let period = seconds(hint.period, "hint period")?;
        let dynamics = match &hint.port {
            None => task_hint.get_or_insert_with(|| {
                PortDynamics::new(format!("{}.main", task.name), hint.sample_size.unwrap_or(1))
            }),
            Some(port) => port_hints.entry(port.clone()).or_insert_with(|| {
                let default_size = task
                    .find_output_port(port)
                    .map(|p| p.sample_size)
                    .unwrap_or(1);
                PortDynamics::new(
                    format!("{}.{}", task.name, port),
                    hint.sample_size.unwrap_or(default_size),
                )
            }),
        };
        dynamics.add_trigger(hint.name.clone(), period, hint.sample_count);
    }

    Ok(DynamicsHints {
        task: task_hint,
        ports: port_hints,
    })
}
