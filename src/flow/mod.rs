// src/flow/mod.rs

//! Dataflow dynamics of a deployed network and the connection policies
//! derived from them.
//!
//! - [`resolver`] specialises the generic propagation engine: seeding
//!   rules, trigger dependencies, and resolution.
//! - [`policy`] turns final dynamics into a [`ConnectionPolicy`] per link.
//!
//! [`DataFlowDynamics`] ties both together and can be reused across
//! network generations.

pub mod policy;
pub mod resolver;

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use crate::dynamics::PortDynamics;
use crate::errors::Result;
use crate::network::{ConnectionGraph, ConnectionPolicy, Network, PortName, TaskName};
use crate::propagation::{PropagationEngine, PropagationOutcome};

pub use policy::{
    BufferSizeMargin, FallbackReason, PolicyOrigin, PolicySynthesizer, PolicyWarning,
    SynthesisConfig, SynthesizedPolicy, buffer_size, node_label,
};
pub use resolver::{DynamicsState, NetworkResolver, NodeKey};

/// Dynamics per task, then per port (`None` for the task itself).
pub type DynamicsMap = BTreeMap<TaskName, BTreeMap<Option<PortName>, PortDynamics>>;

/// Everything computed for one network.
#[derive(Debug, Clone)]
pub struct DynamicsReport {
    /// Dynamics of final nodes.
    pub dynamics: DynamicsMap,
    /// Dynamics accumulated on nodes that never became final.
    pub partial: DynamicsMap,
    /// Required nodes that never became final, per task.
    pub unresolved: BTreeMap<TaskName, BTreeSet<Option<PortName>>>,
    /// Dependency cycles among unresolved nodes.
    pub cycles: Vec<Vec<NodeKey>>,
    /// Policy of every link.
    pub policies: ConnectionGraph<ConnectionPolicy>,
    /// Links that fell back to their fallback policy.
    pub warnings: Vec<PolicyWarning>,
    /// Propagation passes run.
    pub passes: usize,
}

impl DynamicsReport {
    pub fn port_dynamics(&self, task: &str, port: &str) -> Option<&PortDynamics> {
        self.dynamics.get(task)?.get(&Some(port.to_string()))
    }

    pub fn task_dynamics(&self, task: &str) -> Option<&PortDynamics> {
        self.dynamics.get(task)?.get(&None)
    }

    pub fn policy(
        &self,
        source_task: &str,
        source_port: &str,
        sink_task: &str,
        sink_port: &str,
    ) -> Option<ConnectionPolicy> {
        self.policies
            .link(source_task, source_port, sink_task, sink_port)
            .copied()
    }
}

/// Reusable dynamics computation.
///
/// Holds the propagation engine between runs; every run starts from a clean
/// state.
#[derive(Debug, Default)]
pub struct DataFlowDynamics {
    engine: PropagationEngine<TaskName, PortName, PortDynamics>,
    config: SynthesisConfig,
}

impl DataFlowDynamics {
    pub fn new(config: SynthesisConfig) -> Self {
        Self {
            engine: PropagationEngine::new(),
            config,
        }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// State left by the last run.
    pub fn state(&self) -> &DynamicsState {
        self.engine.state()
    }

    /// Propagate dynamics over `network` without computing policies.
    pub fn propagate(&mut self, network: &Network) -> PropagationOutcome<TaskName, PortName> {
        let mut resolver = NetworkResolver::new(network);
        self.engine.propagate(&mut resolver, &network.task_names())
    }

    /// Propagate dynamics, then compute the policy of every link.
    pub fn compute_connection_policies(&mut self, network: &Network) -> Result<DynamicsReport> {
        let tasks = network.task_names();
        let mut resolver = NetworkResolver::new(network);
        let outcome = self.engine.propagate(&mut resolver, &tasks);

        let state = self.engine.state();
        let cycles = if outcome.is_complete() {
            Vec::new()
        } else {
            resolver.stalled_cycles(state)
        };
        for cycle in &cycles {
            let nodes: Vec<String> = cycle.iter().map(node_label).collect();
            warn!(cycle = %nodes.join(" -> "), "dependency cycle among unresolved nodes");
        }

        let synthesizer = PolicySynthesizer::new(network, state, &cycles, self.config);
        let (policies, warnings) = synthesizer.compute_connection_policies()?;

        let dynamics = state.final_result();
        let mut partial = DynamicsMap::new();
        for (task, ports) in state.result() {
            for (port, info) in ports {
                if !state.has_final_information_for(task, port.as_ref()) {
                    partial
                        .entry(task.clone())
                        .or_default()
                        .insert(port.clone(), info.clone());
                }
            }
        }

        info!(
            tasks = tasks.len(),
            links = policies.len(),
            warnings = warnings.len(),
            unresolved = outcome.unresolved.len(),
            "computed connection policies"
        );

        Ok(DynamicsReport {
            dynamics,
            partial,
            unresolved: outcome.unresolved,
            cycles,
            policies,
            warnings,
            passes: outcome.passes,
        })
    }
}

/// One-shot [`DataFlowDynamics::compute_connection_policies`].
pub fn compute_connection_policies(
    network: &Network,
    config: SynthesisConfig,
) -> Result<DynamicsReport> {
    DataFlowDynamics::new(config).compute_connection_policies(network)
}
