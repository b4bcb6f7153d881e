// src/propagation/mod.rs

//! Generic fixpoint propagation over (task, optional port) nodes.
//!
//! The engine knows nothing about ports, periods or buffers. A domain plugs
//! in through [`NodeResolver`]: it seeds initial facts, declares which
//! nodes every task needs, and tries to resolve one node at a time from
//! nodes that are already final. The engine keeps re-running passes over
//! the unresolved nodes until a full pass makes no progress.
//!
//! - [`state`] holds the per-node information and the final markers.
//! - [`engine`] holds the worklist loop and the [`NodeResolver`] seam.
//! - [`cycles`] finds dependency cycles among nodes that stalled.

pub mod cycles;
pub mod engine;
pub mod state;

pub use cycles::dependency_cycles;
pub use engine::{NodeResolver, PropagationEngine, PropagationOutcome};
pub use state::PropagationState;

/// Information attached to a node, accumulated monotonically.
pub trait Information {
    /// Fold `other` into `self`, never dropping anything already known.
    ///
    /// Returns `true` if `self` changed.
    fn merge(&mut self, other: &Self) -> bool;
}
