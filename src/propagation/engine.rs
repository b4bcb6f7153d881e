// src/propagation/engine.rs

//! The worklist loop.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use tracing::{debug, info};

use crate::propagation::{Information, PropagationState};

/// Domain rules plugged into the [`PropagationEngine`].
///
/// All hooks receive the engine's state so they can read what is known and
/// record new facts.
pub trait NodeResolver {
    type Task: Ord + Clone + Debug;
    type Port: Ord + Clone + Debug;
    type Info: Information + Clone;

    /// Nodes that must become final for `task` to be considered done.
    fn required_information(&self, task: &Self::Task) -> BTreeSet<Option<Self::Port>>;

    /// Seed the facts that do not depend on any other node.
    fn initial_information(
        &mut self,
        _state: &mut PropagationState<Self::Task, Self::Port, Self::Info>,
        _task: &Self::Task,
    ) {
    }

    /// Compute the dependency relation for `task`. Runs once per task after
    /// seeding and before the first pass.
    fn triggering_inputs(
        &mut self,
        _state: &mut PropagationState<Self::Task, Self::Port, Self::Info>,
        _task: &Self::Task,
    ) {
    }

    /// Try to resolve one node from nodes that are already final.
    ///
    /// Returns `true` if the node is resolved. The engine marks it final.
    fn compute_info_for(
        &mut self,
        state: &mut PropagationState<Self::Task, Self::Port, Self::Info>,
        task: &Self::Task,
        port: Option<&Self::Port>,
    ) -> bool;
}

/// Summary of one [`PropagationEngine::propagate`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationOutcome<T, P> {
    /// Full passes over the tasks, including the final one that made no
    /// progress.
    pub passes: usize,
    /// Required nodes taken off the worklist during the passes, including
    /// those that were already final after seeding.
    pub resolved: usize,
    /// Required nodes that never became final, per task.
    pub unresolved: BTreeMap<T, BTreeSet<Option<P>>>,
}

impl<T, P> PropagationOutcome<T, P> {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Reusable fixpoint solver.
///
/// One engine can serve many runs; [`reset`](Self::reset) wipes all per-run
/// state and is called by [`propagate`](Self::propagate).
#[derive(Debug)]
pub struct PropagationEngine<T, P, I> {
    state: PropagationState<T, P, I>,
    missing: BTreeMap<T, BTreeSet<Option<P>>>,
}

impl<T, P, I> Default for PropagationEngine<T, P, I> {
    fn default() -> Self {
        Self {
            state: PropagationState::default(),
            missing: BTreeMap::new(),
        }
    }
}

impl<T, P, I> PropagationEngine<T, P, I>
where
    T: Ord + Clone + Debug,
    P: Ord + Clone + Debug,
    I: Information + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all state and recompute the required nodes of every task.
    pub fn reset<R>(&mut self, resolver: &R, tasks: &[T])
    where
        R: NodeResolver<Task = T, Port = P, Info = I>,
    {
        self.state.clear();
        self.missing.clear();
        for task in tasks {
            let required = resolver.required_information(task);
            if !required.is_empty() {
                self.missing.insert(task.clone(), required);
            }
        }
    }

    /// Seed, then resolve nodes pass after pass until a pass makes no
    /// progress.
    pub fn propagate<R>(&mut self, resolver: &mut R, tasks: &[T]) -> PropagationOutcome<T, P>
    where
        R: NodeResolver<Task = T, Port = P, Info = I>,
    {
        self.reset(resolver, tasks);

        for task in tasks {
            resolver.initial_information(&mut self.state, task);
        }
        for task in tasks {
            resolver.triggering_inputs(&mut self.state, task);
        }

        let mut passes = 0;
        let mut resolved = 0;
        while !self.missing.is_empty() {
            passes += 1;
            let mut progress = 0;
            for task in tasks {
                progress += self.propagate_task(resolver, task);
            }
            resolved += progress;
            debug!(pass = passes, progress, "propagation pass done");
            if progress == 0 {
                break;
            }
        }

        if self.missing.is_empty() {
            info!(passes, resolved, "propagation reached a fixpoint");
        } else {
            info!(
                passes,
                resolved,
                stalled_tasks = self.missing.len(),
                "propagation stalled with unresolved nodes"
            );
        }

        PropagationOutcome {
            passes,
            resolved,
            unresolved: self.missing.clone(),
        }
    }

    /// Try every missing node of `task` once. Returns how many resolved.
    fn propagate_task<R>(&mut self, resolver: &mut R, task: &T) -> usize
    where
        R: NodeResolver<Task = T, Port = P, Info = I>,
    {
        let Some(required) = self.missing.get(task) else {
            return 0;
        };
        let required: Vec<Option<P>> = required.iter().cloned().collect();
        debug!(?task, ?required, "trying to resolve task");

        let mut done = Vec::new();
        for port in required {
            let port_ref = port.as_ref();
            if self.state.has_final_information_for(task, port_ref)
                || resolver.compute_info_for(&mut self.state, task, port_ref)
            {
                self.state.mark_final(task, port_ref);
                done.push(port);
            } else {
                debug!(?task, port = ?port_ref, "cannot resolve yet");
            }
        }

        if let Some(missing) = self.missing.get_mut(task) {
            for port in &done {
                missing.remove(port);
            }
            if missing.is_empty() {
                self.missing.remove(task);
            }
        }
        done.len()
    }

    pub fn state(&self) -> &PropagationState<T, P, I> {
        &self.state
    }

    /// Required nodes still unresolved, per task.
    pub fn missing(&self) -> &BTreeMap<T, BTreeSet<Option<P>>> {
        &self.missing
    }

    pub fn has_information_for(&self, task: &T, port: Option<&P>) -> bool {
        self.state.has_information_for(task, port)
    }

    pub fn has_final_information_for(&self, task: &T, port: Option<&P>) -> bool {
        self.state.has_final_information_for(task, port)
    }
}
