// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{NetworkFile, RawNetworkFile, TaskConfig, seconds};
use crate::errors::{DynamicsError, Result};
use crate::flow::BufferSizeMargin;
use crate::network::ConnectionPolicy;
use crate::types::{ActivityKind, TaskKindTag};

impl TryFrom<RawNetworkFile> for NetworkFile {
    type Error = crate::errors::DynamicsError;

    fn try_from(raw: RawNetworkFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_network(&raw)?;
        Ok(NetworkFile::new_unchecked(raw.config, raw.task, raw.connection))
    }
}

fn validate_raw_network(cfg: &RawNetworkFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    for (name, task) in cfg.task.iter() {
        validate_activity(cfg, name, task)?;
        validate_ports(name, task)?;
        validate_devices(name, task)?;
        validate_hints(name, task)?;
    }
    validate_masters(cfg)?;
    validate_connections(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawNetworkFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(DynamicsError::ConfigError(
            "network must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawNetworkFile) -> Result<()> {
    BufferSizeMargin::new(cfg.config.buffer_size_margin)?;
    Ok(())
}

fn validate_activity(cfg: &RawNetworkFile, name: &str, task: &TaskConfig) -> Result<()> {
    seconds(task.trigger_latency, &format!("task '{name}': trigger_latency"))?;

    match task.activity {
        ActivityKind::Periodic => {
            let period = task.period.ok_or_else(|| {
                DynamicsError::ConfigError(format!("periodic task '{name}' has no `period`"))
            })?;
            if seconds(period, &format!("task '{name}': period"))?.is_zero() {
                return Err(DynamicsError::ConfigError(format!(
                    "periodic task '{name}' must have a positive `period`"
                )));
            }
        }
        ActivityKind::Triggered | ActivityKind::Slave => {
            if task.period.is_some() {
                return Err(DynamicsError::ConfigError(format!(
                    "task '{name}' has a `period` but is not periodic"
                )));
            }
        }
    }

    match (task.activity, &task.master) {
        (ActivityKind::Slave, None) => Err(DynamicsError::ConfigError(format!(
            "slave task '{name}' has no `master`"
        ))),
        (ActivityKind::Slave, Some(master)) => {
            if master == name {
                return Err(DynamicsError::ConfigError(format!(
                    "task '{name}' cannot be its own master"
                )));
            }
            if !cfg.task.contains_key(master) {
                return Err(DynamicsError::ConfigError(format!(
                    "task '{name}' has unknown master '{master}'"
                )));
            }
            Ok(())
        }
        (_, Some(_)) => Err(DynamicsError::ConfigError(format!(
            "task '{name}' has a `master` but its activity is not \"slave\""
        ))),
        (_, None) => Ok(()),
    }
}

fn validate_ports(name: &str, task: &TaskConfig) -> Result<()> {
    for (port_name, port) in task.output.iter() {
        if port.sample_size == 0 {
            return Err(DynamicsError::ConfigError(format!(
                "output '{name}.{port_name}': sample_size must be >= 1 (got 0)"
            )));
        }
        seconds(port.burst_period, &format!("output '{name}.{port_name}': burst_period"))?;
        for trigger in port.port_triggers.iter() {
            if !task.input.contains_key(trigger) {
                return Err(DynamicsError::ConfigError(format!(
                    "output '{name}.{port_name}' is triggered by unknown input '{trigger}'"
                )));
            }
        }
    }
    if let Some(port_name) = task.input.keys().find(|p| task.output.contains_key(*p)) {
        return Err(DynamicsError::ConfigError(format!(
            "task '{name}' declares '{port_name}' both as input and output"
        )));
    }
    Ok(())
}

fn validate_devices(name: &str, task: &TaskConfig) -> Result<()> {
    if task.kind == TaskKindTag::Component && !task.device.is_empty() {
        return Err(DynamicsError::ConfigError(format!(
            "task '{name}' lists devices but is neither a driver nor a combus"
        )));
    }

    for device in task.device.iter() {
        if let Some(period) = device.period {
            seconds(period, &format!("device '{}': period", device.name))?;
        }
        if device.sample_size == 0 {
            return Err(DynamicsError::ConfigError(format!(
                "device '{}': sample_size must be >= 1 (got 0)",
                device.name
            )));
        }
        for port in device.ports.iter() {
            let known = match task.kind {
                TaskKindTag::Driver => task.output.contains_key(port),
                TaskKindTag::Combus => task.input.contains_key(port),
                TaskKindTag::Component => false,
            };
            if !known {
                let direction = if task.kind == TaskKindTag::Combus { "input" } else { "output" };
                return Err(DynamicsError::ConfigError(format!(
                    "device '{}' is attached to unknown {direction} '{name}.{port}'",
                    device.name
                )));
            }
        }
    }
    Ok(())
}

fn validate_hints(name: &str, task: &TaskConfig) -> Result<()> {
    for hint in task.hint.iter() {
        seconds(hint.period, &format!("hint '{}' on task '{name}': period", hint.name))?;
        if hint.sample_size == Some(0) {
            return Err(DynamicsError::ConfigError(format!(
                "hint '{}' on task '{name}': sample_size must be >= 1 (got 0)",
                hint.name
            )));
        }
        if let Some(port) = &hint.port {
            if !task.output.contains_key(port) && !task.input.contains_key(port) {
                return Err(DynamicsError::ConfigError(format!(
                    "hint '{}' refers to unknown port '{name}.{port}'",
                    hint.name
                )));
            }
        }
    }
    Ok(())
}

fn validate_masters(cfg: &RawNetworkFile) -> Result<()> {
    // Edge direction: master -> slave.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }
    for (name, task) in cfg.task.iter() {
        if let Some(master) = &task.master {
            graph.add_edge(master.as_str(), name.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(DynamicsError::TimingCycle(format!(
                "cycle detected in master/slave relations involving task '{}'",
                node
            )))
        }
    }
}

fn validate_connections(cfg: &RawNetworkFile) -> Result<()> {
    for connection in cfg.connection.iter() {
        let (source_task, source_port) = connection.source()?;
        let (sink_task, sink_port) = connection.sink()?;

        let source = cfg.task.get(source_task).ok_or_else(|| {
            DynamicsError::ConfigError(format!(
                "connection '{}' starts at unknown task '{source_task}'",
                connection.from
            ))
        })?;
        if !source.output.contains_key(source_port) {
            return Err(DynamicsError::ConfigError(format!(
                "connection source '{}' is not an output port",
                connection.from
            )));
        }

        let sink = cfg.task.get(sink_task).ok_or_else(|| {
            DynamicsError::ConfigError(format!(
                "connection '{}' ends at unknown task '{sink_task}'",
                connection.to
            ))
        })?;
        if !sink.input.contains_key(sink_port) {
            return Err(DynamicsError::ConfigError(format!(
                "connection sink '{}' is not an input port",
                connection.to
            )));
        }

        for policy in [connection.policy, connection.fallback].into_iter().flatten() {
            if policy == (ConnectionPolicy::Buffer { size: 0 }) {
                return Err(DynamicsError::ConfigError(format!(
                    "connection '{}' -> '{}': buffer size must be >= 1",
                    connection.from, connection.to
                )));
            }
        }
    }
    Ok(())
}
