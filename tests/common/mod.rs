#![allow(dead_code)]

pub use dataflow_dynamics_test_utils::builders;
pub use dataflow_dynamics_test_utils::init_tracing;
