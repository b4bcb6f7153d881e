// src/flow/policy.rs

//! Connection policy synthesis from final port dynamics.

use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::{DynamicsError, Result};
use crate::flow::resolver::{DynamicsState, NodeKey};
use crate::network::{ConnectionGraph, ConnectionPolicy, EdgePolicy, Network};
use crate::types::ConnectionKind;

/// Ratio added on top of the computed buffer sizes to absorb timing jitter.
///
/// With a margin of 0.1, a connection needing 5 slots gets 6 (5.5 rounded
/// up), one needing 400 gets 440. Always finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferSizeMargin(f64);

impl BufferSizeMargin {
    pub const DEFAULT: BufferSizeMargin = BufferSizeMargin(0.1);

    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(DynamicsError::InvalidMargin(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for BufferSizeMargin {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Parameters of policy synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SynthesisConfig {
    pub buffer_size_margin: BufferSizeMargin,
}

/// Slots for a channel that must hold `queue_size` samples:
/// `ceil((1 + margin) * queue_size) + 1`.
///
/// The extra slot covers the floor in `sample_count` at exact period
/// boundaries.
pub fn buffer_size(queue_size: u64, margin: BufferSizeMargin) -> u64 {
    let scaled = (1.0 + margin.value()) * queue_size as f64;
    // Strip representation noise so that e.g. 1.1 * 10 stays 11.
    let slots = (scaled - 1e-9).ceil().max(0.0) as u64;
    slots.max(queue_size).saturating_add(1)
}

/// Why a fallback policy was used instead of a computed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The source port's dynamics never became final.
    MissingSourceDynamics,
    /// The sink task has no minimal period to derive a reading latency from.
    MissingSinkPeriod,
}

/// Non-fatal condition raised when an edge falls back to its fallback
/// policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyWarning {
    /// `task.port` of the source.
    pub source: String,
    /// `task.port` of the sink.
    pub sink: String,
    pub reason: FallbackReason,
    pub fallback: ConnectionPolicy,
}

impl fmt::Display for PolicyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            FallbackReason::MissingSourceDynamics => write!(
                f,
                "cannot compute the period information for output port {}, needed to connect \
                 to {}; using fallback policy {}",
                self.source, self.sink, self.fallback
            ),
            FallbackReason::MissingSinkPeriod => write!(
                f,
                "the task of {} has no minimal period, needed to compute its reading latency; \
                 using fallback policy {}",
                self.sink, self.fallback
            ),
        }
    }
}

/// Where a synthesized policy came from.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyOrigin {
    /// The edge already carried a policy.
    Preset,
    /// The sink does not need a reliable connection.
    Unreliable,
    /// Sized from the dynamics.
    Computed {
        reading_latency: Duration,
        queue_size: u64,
    },
    /// The fallback policy was used.
    Fallback(PolicyWarning),
}

/// Result of [`PolicySynthesizer::policy_for`].
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedPolicy {
    pub policy: ConnectionPolicy,
    pub origin: PolicyOrigin,
}

/// Computes connection policies once propagation is over.
#[derive(Debug)]
pub struct PolicySynthesizer<'a> {
    network: &'a Network,
    state: &'a DynamicsState,
    /// Dependency cycles found when propagation stalled.
    cycles: &'a [Vec<NodeKey>],
    config: SynthesisConfig,
}

impl<'a> PolicySynthesizer<'a> {
    pub fn new(
        network: &'a Network,
        state: &'a DynamicsState,
        cycles: &'a [Vec<NodeKey>],
        config: SynthesisConfig,
    ) -> Self {
        Self {
            network,
            state,
            cycles,
            config,
        }
    }

    /// Policy of every link of the network's connection graph.
    ///
    /// Fails on the first edge that cannot be sized and has no fallback.
    pub fn compute_connection_policies(
        &self,
    ) -> Result<(ConnectionGraph<ConnectionPolicy>, Vec<PolicyWarning>)> {
        let mut policies = ConnectionGraph::new();
        let mut warnings = Vec::new();

        for ((source_task, sink_task), links) in self.network.connections().edges() {
            for (mapping, edge) in links {
                let synthesized = self.policy_for(
                    source_task,
                    &mapping.source_port,
                    sink_task,
                    &mapping.sink_port,
                    edge,
                )?;
                if let PolicyOrigin::Fallback(warning) = synthesized.origin {
                    warnings.push(warning);
                }
                policies.add_connection(
                    source_task.as_str(),
                    mapping.source_port.as_str(),
                    sink_task.as_str(),
                    mapping.sink_port.as_str(),
                    synthesized.policy,
                );
            }
        }

        Ok((policies, warnings))
    }

    /// Policy for one link, given what is known about the dynamics.
    pub fn policy_for(
        &self,
        source_task: &str,
        source_port: &str,
        sink_task: &str,
        sink_port: &str,
        edge: &EdgePolicy,
    ) -> Result<SynthesizedPolicy> {
        let source = format!("{source_task}.{source_port}");
        let sink = format!("{sink_task}.{sink_port}");

        if let Some(policy) = edge.policy {
            debug!(%source, %sink, %policy, "already connected with a policy");
            return Ok(SynthesizedPolicy {
                policy,
                origin: PolicyOrigin::Preset,
            });
        }

        let source_spec = self.network.task(source_task).ok_or_else(|| {
            DynamicsError::InternalError(format!("{source_task} is not a deployed task"))
        })?;
        let sink_spec = self.network.task(sink_task).ok_or_else(|| {
            DynamicsError::InternalError(format!("{sink_task} is not a deployed task"))
        })?;
        if source_spec.find_output_port(source_port).is_none() {
            return Err(DynamicsError::InternalError(format!(
                "{source_port} is not an output port of {source_task}"
            )));
        }
        let sink_model = sink_spec.find_input_port(sink_port).ok_or_else(|| {
            DynamicsError::InternalError(format!("{sink_port} is not an input port of {sink_task}"))
        })?;
        debug!(%source, %sink, "computing policy");

        if !sink_model.needs_reliable_connection {
            let policy = match sink_model.required_connection_type {
                ConnectionKind::Data => ConnectionPolicy::PassThrough,
                ConnectionKind::Buffer => ConnectionPolicy::SingleSlot,
            };
            debug!(%source, %sink, %policy, "sink does not need a reliable connection");
            return Ok(SynthesizedPolicy {
                policy,
                origin: PolicyOrigin::Unreliable,
            });
        }

        let source_port_name = source_port.to_string();
        let input_dynamics = if self
            .state
            .has_final_information_for(&source_spec.name, Some(&source_port_name))
        {
            self.state.info(&source_spec.name, Some(&source_port_name))
        } else {
            None
        };
        let sink_task_dynamics = if self.state.has_final_information_for(&sink_spec.name, None) {
            self.state.info(&sink_spec.name, None)
        } else {
            None
        };

        let reading_latency = if sink_model.trigger_port {
            Some(sink_spec.trigger_latency)
        } else {
            sink_task_dynamics
                .and_then(|d| d.minimal_period())
                .map(|period| period + sink_spec.trigger_latency)
        };

        let (input_dynamics, reading_latency) = match (input_dynamics, reading_latency) {
            (Some(dynamics), Some(latency)) => (dynamics, latency),
            (input_dynamics, _) => {
                let reason = if input_dynamics.is_none() {
                    FallbackReason::MissingSourceDynamics
                } else {
                    FallbackReason::MissingSinkPeriod
                };
                return self.fallback(edge, source, sink, &sink_spec.name, reason);
            }
        };

        let queue_size = input_dynamics.queue_size(reading_latency);
        let size = buffer_size(queue_size, self.config.buffer_size_margin);
        debug!(
            %source,
            %sink,
            input_period = ?input_dynamics.minimal_period(),
            reading_latency = reading_latency.as_secs_f64(),
            sample_size = input_dynamics.sample_size(),
            queue_size,
            size,
            "sized buffer"
        );

        Ok(SynthesizedPolicy {
            policy: ConnectionPolicy::Buffer { size },
            origin: PolicyOrigin::Computed {
                reading_latency,
                queue_size,
            },
        })
    }

    fn fallback(
        &self,
        edge: &EdgePolicy,
        source: String,
        sink: String,
        sink_task: &str,
        reason: FallbackReason,
    ) -> Result<SynthesizedPolicy> {
        if let Some(fallback) = edge.fallback {
            let warning = PolicyWarning {
                source,
                sink,
                reason,
                fallback,
            };
            warn!("{warning}");
            return Ok(SynthesizedPolicy {
                policy: fallback,
                origin: PolicyOrigin::Fallback(warning),
            });
        }

        match reason {
            FallbackReason::MissingSourceDynamics => {
                if let Some(cycle) = self.cycle_through(&source) {
                    return Err(DynamicsError::TimingCycle(format!(
                        "{source} cannot be resolved because it depends on itself through {cycle}"
                    )));
                }
                Err(DynamicsError::UnresolvedDynamics {
                    output: source,
                    sink,
                })
            }
            FallbackReason::MissingSinkPeriod => Err(DynamicsError::MissingSinkPeriod {
                sink_task: sink_task.to_string(),
                sink,
            }),
        }
    }

    /// The stalled cycle going through the `task.port` node, rendered.
    fn cycle_through(&self, node: &str) -> Option<String> {
        self.cycles
            .iter()
            .find(|cycle| cycle.iter().any(|n| node_label(n) == node))
            .map(|cycle| {
                cycle
                    .iter()
                    .map(node_label)
                    .collect::<Vec<_>>()
                    .join(" -> ")
            })
    }
}

/// `task.port`, or `task` for a task node.
pub fn node_label((task, port): &NodeKey) -> String {
    match port {
        Some(port) => format!("{task}.{port}"),
        None => task.clone(),
    }
}
