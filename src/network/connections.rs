// src/network/connections.rs

//! The concrete connection graph and connection policies.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::network::{PortName, TaskName};

/// How a channel between two ports is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ConnectionPolicy {
    /// Latest-value overwrite.
    PassThrough,
    /// One-slot non-blocking buffer.
    SingleSlot,
    /// Buffer of `size` slots.
    Buffer { size: u64 },
}

impl fmt::Display for ConnectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionPolicy::PassThrough => write!(f, "pass-through"),
            ConnectionPolicy::SingleSlot => write!(f, "single-slot"),
            ConnectionPolicy::Buffer { size } => write!(f, "buffer(size={size})"),
        }
    }
}

/// Policy annotation carried by an edge before synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgePolicy {
    /// Explicit choice; synthesis never overrides it.
    pub policy: Option<ConnectionPolicy>,
    /// Used when the dynamics needed to size the channel are unknown.
    pub fallback: Option<ConnectionPolicy>,
}

impl EdgePolicy {
    pub fn fixed(policy: ConnectionPolicy) -> Self {
        Self {
            policy: Some(policy),
            fallback: None,
        }
    }

    pub fn with_fallback(fallback: ConnectionPolicy) -> Self {
        Self {
            policy: None,
            fallback: Some(fallback),
        }
    }
}

/// Source and sink port of one link between two tasks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortMapping {
    pub source_port: PortName,
    pub sink_port: PortName,
}

/// Point-to-point port links between tasks, each carrying an `E`.
///
/// Edges are keyed by `(source task, sink task)`; one edge groups every port
/// link between the two tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionGraph<E> {
    edges: BTreeMap<(TaskName, TaskName), BTreeMap<PortMapping, E>>,
}

impl<E> Default for ConnectionGraph<E> {
    fn default() -> Self {
        Self {
            edges: BTreeMap::new(),
        }
    }
}

impl<E> ConnectionGraph<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the link `source_task.source_port -> sink_task.sink_port`.
    pub fn add_connection(
        &mut self,
        source_task: impl Into<TaskName>,
        source_port: impl Into<PortName>,
        sink_task: impl Into<TaskName>,
        sink_port: impl Into<PortName>,
        annotation: E,
    ) {
        let mapping = PortMapping {
            source_port: source_port.into(),
            sink_port: sink_port.into(),
        };
        self.edges
            .entry((source_task.into(), sink_task.into()))
            .or_default()
            .insert(mapping, annotation);
    }

    /// All edges as `((source task, sink task), links)`.
    pub fn edges(
        &self,
    ) -> impl Iterator<Item = (&(TaskName, TaskName), &BTreeMap<PortMapping, E>)> {
        self.edges.iter()
    }

    /// Links between two tasks, if they are connected.
    pub fn edge_info(
        &self,
        source_task: &str,
        sink_task: &str,
    ) -> Option<&BTreeMap<PortMapping, E>> {
        self.edges
            .get(&(source_task.to_string(), sink_task.to_string()))
    }

    /// Annotation of one port link.
    pub fn link(
        &self,
        source_task: &str,
        source_port: &str,
        sink_task: &str,
        sink_port: &str,
    ) -> Option<&E> {
        self.edge_info(source_task, sink_task)?.get(&PortMapping {
            source_port: source_port.to_string(),
            sink_port: sink_port.to_string(),
        })
    }

    /// Whether some task writes into `task.port`.
    pub fn has_concrete_input_connection(&self, task: &str, port: &str) -> bool {
        self.edges
            .iter()
            .filter(|((_, sink), _)| sink == task)
            .any(|(_, links)| links.keys().any(|m| m.sink_port == port))
    }

    /// Every `(task, port)` output writing into `task.port`.
    pub fn sources_of(&self, task: &str, port: &str) -> Vec<(&str, &str)> {
        self.edges
            .iter()
            .filter(|((_, sink), _)| sink == task)
            .flat_map(move |((source, _), links)| {
                links
                    .keys()
                    .filter(move |m| m.sink_port == port)
                    .map(move |m| (source.as_str(), m.source_port.as_str()))
            })
            .collect()
    }

    /// Number of port links.
    pub fn len(&self) -> usize {
        self.edges.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.values().all(BTreeMap::is_empty)
    }
}
