// src/propagation/state.rs

//! Per-run node information and resolution status.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::propagation::Information;

/// Information known about every node, plus which nodes are final.
///
/// A node is `(task, None)` for the task itself or `(task, Some(port))` for
/// one of its ports. Once a node is final its information is frozen: later
/// additions are ignored.
#[derive(Debug, Clone)]
pub struct PropagationState<T, P, I> {
    info: BTreeMap<T, BTreeMap<Option<P>, I>>,
    finals: BTreeMap<T, BTreeSet<Option<P>>>,
}

impl<T, P, I> Default for PropagationState<T, P, I> {
    fn default() -> Self {
        Self {
            info: BTreeMap::new(),
            finals: BTreeMap::new(),
        }
    }
}

impl<T, P, I> PropagationState<T, P, I>
where
    T: Ord + Clone + std::fmt::Debug,
    P: Ord + Clone + std::fmt::Debug,
    I: Information + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything from a previous run.
    pub fn clear(&mut self) {
        self.info.clear();
        self.finals.clear();
    }

    /// Whether anything at all is known about the node.
    pub fn has_information_for(&self, task: &T, port: Option<&P>) -> bool {
        self.info
            .get(task)
            .is_some_and(|ports| ports.contains_key(&port.cloned()))
    }

    /// Whether the node is resolved for good.
    pub fn has_final_information_for(&self, task: &T, port: Option<&P>) -> bool {
        self.finals
            .get(task)
            .is_some_and(|ports| ports.contains(&port.cloned()))
    }

    pub fn info(&self, task: &T, port: Option<&P>) -> Option<&I> {
        self.info.get(task)?.get(&port.cloned())
    }

    /// Replace the node's information. Ignored on final nodes.
    pub fn set_info(&mut self, task: &T, port: Option<&P>, info: I) -> bool {
        if self.has_final_information_for(task, port) {
            debug!(?task, ?port, "ignoring set on final node");
            return false;
        }
        self.info
            .entry(task.clone())
            .or_default()
            .insert(port.cloned(), info);
        true
    }

    /// Merge `info` into the node, creating it if needed. Ignored on final
    /// nodes.
    ///
    /// Returns `true` if the node's information changed.
    pub fn add_info(&mut self, task: &T, port: Option<&P>, info: &I) -> bool {
        if self.has_final_information_for(task, port) {
            debug!(?task, ?port, "ignoring new information on final node");
            return false;
        }
        let ports = self.info.entry(task.clone()).or_default();
        match ports.get_mut(&port.cloned()) {
            Some(existing) => existing.merge(info),
            None => {
                ports.insert(port.cloned(), info.clone());
                true
            }
        }
    }

    /// Mark the node final.
    ///
    /// Returns `false` if it already was. Nodes with no information yet are
    /// final with no information (`info` stays `None`).
    pub fn mark_final(&mut self, task: &T, port: Option<&P>) -> bool {
        let inserted = self
            .finals
            .entry(task.clone())
            .or_default()
            .insert(port.cloned());
        if inserted {
            debug!(?task, ?port, "node is final");
        }
        inserted
    }

    /// Every node with information, final or partial.
    pub fn result(&self) -> &BTreeMap<T, BTreeMap<Option<P>, I>> {
        &self.info
    }

    /// Final nodes only, keyed by task then port.
    pub fn final_nodes(&self) -> &BTreeMap<T, BTreeSet<Option<P>>> {
        &self.finals
    }

    /// Information of final nodes only.
    pub fn final_result(&self) -> BTreeMap<T, BTreeMap<Option<P>, I>> {
        let mut out: BTreeMap<T, BTreeMap<Option<P>, I>> = BTreeMap::new();
        for (task, ports) in &self.finals {
            for port in ports {
                if let Some(info) = self.info(task, port.as_ref()) {
                    out.entry(task.clone())
                        .or_default()
                        .insert(port.clone(), info.clone());
                }
            }
        }
        out
    }
}
