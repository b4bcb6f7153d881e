// src/flow/resolver.rs

//! Dataflow rules: how port dynamics get seeded and derived.
//!
//! Seeding covers everything known without looking at the dataflow:
//! periodic activities, attached devices, communication buses, and the
//! hints given by whoever requested a task. Everything else is derived
//! from upstream ports once they are final.
//!
//! Input ports are not stored on their own (bus inputs and hinted ports
//! aside). They are final once every output connected to them is, and
//! their dynamics are the union of those outputs' dynamics.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use tracing::debug;

use crate::dynamics::PortDynamics;
use crate::network::{
    Activity, DeviceAttachment, Network, OutputPort, PortName, TaskKind, TaskName, TaskSpec,
};
use crate::propagation::{NodeResolver, PropagationState, dependency_cycles};

/// `(task, None)` for a task, `(task, Some(port))` for one of its ports.
pub type NodeKey = (TaskName, Option<PortName>);

/// Propagation state specialised to port dynamics.
pub type DynamicsState = PropagationState<TaskName, PortName, PortDynamics>;

/// [`NodeResolver`] for a deployed [`Network`].
#[derive(Debug)]
pub struct NetworkResolver<'a> {
    network: &'a Network,
    /// Nodes each node needs before it can be resolved.
    dependencies: BTreeMap<NodeKey, BTreeSet<NodeKey>>,
}

impl<'a> NetworkResolver<'a> {
    pub fn new(network: &'a Network) -> Self {
        Self {
            network,
            dependencies: BTreeMap::new(),
        }
    }

    /// Dependencies recorded for `node` by [`NodeResolver::triggering_inputs`].
    pub fn dependencies_of(&self, node: &NodeKey) -> Option<&BTreeSet<NodeKey>> {
        self.dependencies.get(node)
    }

    // ---- seeding -------------------------------------------------------

    /// Seed `task` and, first, the slaves that have not been seeded yet.
    fn initial_task_information(&self, state: &mut DynamicsState, task: &TaskSpec) {
        self.initial_slaves_information(state, task);
        debug!(task = %task.name, "initial port dynamics");

        state.set_info(&task.name, None, PortDynamics::new(format!("{}.main", task.name), 1));
        for port in task.outputs.values() {
            create_port_info(state, task, port);
        }

        if let Some(hint) = &task.hints.task {
            self.add_port_info(state, task, None, hint);
        }
        for (port_name, hint) in &task.hints.ports {
            self.add_port_info(state, task, Some(port_name), hint);
            state.mark_final(&task.name, Some(port_name));
        }

        match &task.kind {
            TaskKind::Component => {}
            TaskKind::Driver(attachments) => {
                self.initial_device_information(state, task, attachments)
            }
            TaskKind::ComBus(attachments) => {
                self.initial_combus_information(state, task, attachments)
            }
        }

        match task.activity {
            Activity::Periodic(period) => {
                debug!(task = %task.name, period = period.as_secs_f64(), "adding periodic trigger");
                let mut main = PortDynamics::new(format!("{}.main", task.name), 1);
                main.add_trigger(format!("{}.main-period", task.name), period, 1);
                self.add_port_info(state, task, None, &main);
                self.done_task_info(state, task);
            }
            // The master's dynamics get pushed in `done_task_info`.
            Activity::Slave { .. } => {}
            Activity::Triggered => {
                if task.event_ports().next().is_none() {
                    self.done_task_info(state, task);
                }
            }
        }
    }

    fn initial_slaves_information(&self, state: &mut DynamicsState, task: &TaskSpec) {
        for slave in self.network.slaves_of(&task.name) {
            if !state.has_information_for(&slave.name, None) {
                self.initial_task_information(state, slave);
            }
        }
    }

    /// Ports fed by attached devices get their dynamics from the hardware.
    fn initial_device_information(
        &self,
        state: &mut DynamicsState,
        task: &TaskSpec,
        attachments: &[DeviceAttachment],
    ) {
        for attachment in attachments {
            let device = &attachment.device;
            debug!(
                task = %task.name,
                device = %device.name,
                period = ?device.period,
                burst = device.burst,
                "attached device"
            );

            let mut device_dynamics = PortDynamics::new(device.name.clone(), 1);
            if let Some(period) = device.period {
                device_dynamics.add_trigger(device.name.clone(), period, 1);
            }
            device_dynamics.add_trigger(
                format!("{}-burst", device.name),
                Duration::ZERO,
                device.burst,
            );
            if device_dynamics.is_empty() {
                continue;
            }

            match task.activity {
                // The task polls the device: one batch per cycle.
                Activity::Periodic(period) => {
                    for port in &attachment.ports {
                        let mut polled = PortDynamics::new(device.name.clone(), 1);
                        polled.add_trigger(
                            device.name.clone(),
                            period,
                            device_dynamics.queue_size(period),
                        );
                        self.add_port_info(state, task, Some(port), &polled);
                        state.mark_final(&task.name, Some(port));
                    }
                }
                // The device wakes the task up.
                Activity::Triggered | Activity::Slave { .. } => {
                    self.add_port_info(state, task, None, &device_dynamics);
                    for port in &attachment.ports {
                        self.add_port_info(state, task, Some(port), &device_dynamics);
                        state.mark_final(&task.name, Some(port));
                    }
                }
            }
        }
    }

    /// Bus inputs receive whatever the devices behind the bus send.
    fn initial_combus_information(
        &self,
        state: &mut DynamicsState,
        task: &TaskSpec,
        attachments: &[DeviceAttachment],
    ) {
        let mut handled: BTreeSet<&PortName> = BTreeSet::new();
        for attachment in attachments {
            let device = &attachment.device;
            for port in &attachment.ports {
                handled.insert(port);
                let mut dynamics =
                    PortDynamics::new(format!("{}.{}", task.name, port), device.sample_size);
                if let Some(period) = device.period {
                    dynamics.add_trigger(device.name.clone(), period, 1);
                    dynamics.add_trigger(
                        device.name.clone(),
                        scaled(period, device.burst),
                        device.burst,
                    );
                }
                self.add_port_info(state, task, Some(port), &dynamics);
            }
        }
        for port in handled {
            state.mark_final(&task.name, Some(port));
        }
    }

    // ---- helpers -------------------------------------------------------

    /// Merge `info` into a node, creating the node from the port model first
    /// when it does not exist yet.
    fn add_port_info(
        &self,
        state: &mut DynamicsState,
        task: &TaskSpec,
        port: Option<&PortName>,
        info: &PortDynamics,
    ) {
        if !state.has_information_for(&task.name, port) {
            match port {
                None => {
                    let main = PortDynamics::new(format!("{}.main", task.name), 1);
                    state.set_info(&task.name, None, main);
                }
                Some(name) => {
                    if let Some(model) = task.find_output_port(name) {
                        create_port_info(state, task, model);
                    }
                }
            }
        }
        state.add_info(&task.name, port, info);
    }

    /// Finalize the task node and push its dynamics into its slaves.
    fn done_task_info(&self, state: &mut DynamicsState, task: &TaskSpec) {
        state.mark_final(&task.name, None);
        let Some(info) = state.info(&task.name, None).cloned() else {
            return;
        };
        for slave in self.network.slaves_of(&task.name) {
            if state.has_final_information_for(&slave.name, None) {
                continue;
            }
            debug!(master = %task.name, slave = %slave.name, "slave inherits task dynamics");
            self.add_port_info(state, slave, None, &info);
            self.done_task_info(state, slave);
        }
    }

    /// Whether a node is final. Input ports not explicitly finalized are
    /// final once every output feeding them is.
    fn is_final(&self, state: &DynamicsState, (task, port): &NodeKey) -> bool {
        if state.has_final_information_for(task, port.as_ref()) {
            return true;
        }
        match self.input_port_of(task, port.as_ref()) {
            Some(input) => self
                .network
                .sources_of(task, input)
                .into_iter()
                .all(|(source_task, source_port)| {
                    state.has_final_information_for(
                        &source_task.to_string(),
                        Some(&source_port.to_string()),
                    )
                }),
            None => false,
        }
    }

    /// Current dynamics of a node; input ports get the union of their
    /// sources.
    fn node_info(&self, state: &DynamicsState, (task, port): &NodeKey) -> Option<PortDynamics> {
        let own = state.info(task, port.as_ref()).cloned();
        let Some(input) = self.input_port_of(task, port.as_ref()) else {
            return own;
        };
        if state.has_final_information_for(task, port.as_ref()) {
            return own;
        }

        let sources = self.network.sources_of(task, input);
        let sample_size = sources
            .iter()
            .filter_map(|(t, p)| state.info(&t.to_string(), Some(&p.to_string())))
            .map(PortDynamics::sample_size)
            .max()
            .unwrap_or(1);
        let mut merged =
            own.unwrap_or_else(|| PortDynamics::new(format!("{task}.{input}"), sample_size));
        for (source_task, source_port) in sources {
            let source_port = source_port.to_string();
            if let Some(info) = state.info(&source_task.to_string(), Some(&source_port)) {
                merged.merge(info);
            }
        }
        Some(merged)
    }

    /// Whether data can reach `task.port`: through a link, or because the
    /// port was seeded final (bus inputs, hinted inputs).
    fn is_trigger_source(&self, state: &DynamicsState, task: &TaskSpec, port: &PortName) -> bool {
        self.network.has_concrete_input_connection(&task.name, port)
            || state.has_final_information_for(&task.name, Some(port))
    }

    fn input_port_of<'n>(&self, task: &str, port: Option<&'n PortName>) -> Option<&'n str> {
        let port = port?;
        let spec = self.network.task(task)?;
        spec.find_input_port(port).map(|_| port.as_str())
    }

    /// Dependency cycles among nodes that are not final.
    pub fn stalled_cycles(&self, state: &DynamicsState) -> Vec<Vec<NodeKey>> {
        let mut edges: Vec<(NodeKey, NodeKey)> = Vec::new();
        for (node, deps) in &self.dependencies {
            if self.is_final(state, node) {
                continue;
            }
            for dep in deps {
                if !self.is_final(state, dep) {
                    edges.push((node.clone(), dep.clone()));
                }
            }
        }
        // Input ports depend on the outputs feeding them.
        let inputs: BTreeSet<NodeKey> = edges
            .iter()
            .map(|(_, dep)| dep.clone())
            .filter(|(task, port)| self.input_port_of(task, port.as_ref()).is_some())
            .collect();
        for node in inputs {
            let (task, port) = &node;
            let Some(port) = port else { continue };
            for (source_task, source_port) in self.network.sources_of(task, port) {
                let source: NodeKey = (source_task.to_string(), Some(source_port.to_string()));
                if !self.is_final(state, &source) {
                    edges.push((node.clone(), source));
                }
            }
        }
        dependency_cycles(edges)
    }
}

impl NodeResolver for NetworkResolver<'_> {
    type Task = TaskName;
    type Port = PortName;
    type Info = PortDynamics;

    /// The task node and every output port.
    fn required_information(&self, task: &TaskName) -> BTreeSet<Option<PortName>> {
        let Some(spec) = self.network.task(task) else {
            return BTreeSet::new();
        };
        std::iter::once(None)
            .chain(spec.outputs.keys().cloned().map(Some))
            .collect()
    }

    fn initial_information(&mut self, state: &mut DynamicsState, task: &TaskName) {
        let Some(spec) = self.network.task(task) else {
            return;
        };
        // Slaves are seeded by their master.
        if spec.master().is_some() {
            return;
        }
        self.initial_task_information(state, spec);
    }

    fn triggering_inputs(&mut self, state: &mut DynamicsState, task: &TaskName) {
        let Some(spec) = self.network.task(task) else {
            return;
        };

        let mut task_deps: BTreeSet<NodeKey> = BTreeSet::new();
        match spec.master() {
            Some(master) => {
                task_deps.insert((master.to_string(), None));
            }
            None => {
                for port in spec.event_ports() {
                    if self.is_trigger_source(state, spec, &port.name) {
                        task_deps.insert((spec.name.clone(), Some(port.name.clone())));
                    }
                }
            }
        }
        self.dependencies.insert((spec.name.clone(), None), task_deps);

        for port in spec.outputs.values() {
            let mut deps: BTreeSet<NodeKey> = BTreeSet::new();
            if port.triggered_on_update {
                deps.insert((spec.name.clone(), None));
            }
            for trigger_port in &port.port_triggers {
                if self.is_trigger_source(state, spec, trigger_port) {
                    deps.insert((spec.name.clone(), Some(trigger_port.clone())));
                }
            }

            if deps.is_empty() {
                state.mark_final(&spec.name, Some(&port.name));
            } else {
                self.dependencies.insert((spec.name.clone(), Some(port.name.clone())), deps);
            }
        }
    }

    fn compute_info_for(
        &mut self,
        state: &mut DynamicsState,
        task: &TaskName,
        port: Option<&PortName>,
    ) -> bool {
        let Some(spec) = self.network.task(task) else {
            return false;
        };
        let key: NodeKey = (task.clone(), port.cloned());
        let deps = self.dependencies.get(&key).cloned().unwrap_or_default();

        let mut infos: Vec<(bool, PortDynamics)> = Vec::new();
        for dep in &deps {
            if !self.is_final(state, dep) {
                debug!(?dep, ?key, "missing information to compute node");
                return false;
            }
            if let Some(info) = self.node_info(state, dep) {
                infos.push((dep.1.is_some(), info));
            }
        }

        // A periodic task reads its inputs once per cycle.
        let period = self.network.find_period_of(spec);
        for (from_input, info) in infos {
            let info = match period {
                Some(period) if from_input => info.sampled_at(period),
                _ => info,
            };
            self.add_port_info(state, spec, port, &info);
        }

        if port.is_none() {
            self.done_task_info(state, spec);
        }
        true
    }
}

/// Node of an output port, built from its model: sample size plus the port's
/// own burst trigger.
fn create_port_info(state: &mut DynamicsState, task: &TaskSpec, port: &OutputPort) {
    let mut dynamics = PortDynamics::new(format!("{}.{}", task.name, port.name), port.sample_size);
    dynamics.add_trigger("burst", port.burst_period, port.burst_size);
    state.set_info(&task.name, Some(&port.name), dynamics);
}

/// `period * count`, saturating.
fn scaled(period: Duration, count: u64) -> Duration {
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    period.checked_mul(count).unwrap_or(Duration::MAX)
}
