// src/dynamics/mod.rs

//! Temporal behaviour of ports and tasks.
//!
//! - [`trigger`] holds the immutable [`Trigger`] fact ("N samples every P").
//! - [`port_dynamics`] holds the [`PortDynamics`] accumulator built from a
//!   set of triggers, and the derived sample/queue computations.

pub mod port_dynamics;
pub mod trigger;

pub use port_dynamics::PortDynamics;
pub use trigger::Trigger;
