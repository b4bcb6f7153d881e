// tests/connection_policies.rs

mod common;
use crate::common::builders::{NetworkBuilder, TaskSpecBuilder};
use crate::common::init_tracing;

use std::time::Duration;

use dataflow_dynamics::errors::DynamicsError;
use dataflow_dynamics::flow::{
    BufferSizeMargin, DataFlowDynamics, FallbackReason, PolicyOrigin, PolicySynthesizer,
    SynthesisConfig, buffer_size, compute_connection_policies,
};
use dataflow_dynamics::network::{ConnectionPolicy, EdgePolicy, Network};
use dataflow_dynamics::types::ConnectionKind;

/// Periodic writer at 10 Hz feeding a periodic reader at 2 Hz.
fn periodic_pair(edge: EdgePolicy) -> Network {
    NetworkBuilder::new()
        .task(TaskSpecBuilder::periodic("A", 0.1).output("out"))
        .task(
            TaskSpecBuilder::periodic("B", 0.5)
                .trigger_latency(0.01)
                .reliable_input("in", false),
        )
        .connect("A.out", "B.in", edge)
        .build()
}

/// Two triggered tasks waking each other up.
fn ping_pong(edge: EdgePolicy) -> Network {
    NetworkBuilder::new()
        .task(
            TaskSpecBuilder::triggered("X")
                .reliable_input("in", true)
                .output("out"),
        )
        .task(
            TaskSpecBuilder::triggered("Y")
                .reliable_input("in", true)
                .output("out"),
        )
        .connect("X.out", "Y.in", edge)
        .connect("Y.out", "X.in", edge)
        .build()
}

#[test]
fn buffer_sized_from_reader_period() {
    init_tracing();
    let network = periodic_pair(EdgePolicy::default());

    let report = compute_connection_policies(&network, SynthesisConfig::default()).unwrap();

    // Reading latency 0.51s sees 5 writes: queue (5 + 1), ceil(1.1 * 6) + 1.
    assert_eq!(
        report.policy("A", "out", "B", "in"),
        Some(ConnectionPolicy::Buffer { size: 8 })
    );
    assert!(report.warnings.is_empty());
    assert!(report.unresolved.is_empty());

    let source = report.port_dynamics("A", "out").unwrap();
    assert_eq!(source.triggers().count(), 1);
    assert_eq!(source.minimal_period(), Some(Duration::from_millis(100)));
}

#[test]
fn policy_origin_records_latency_and_queue() {
    init_tracing();
    let network = periodic_pair(EdgePolicy::default());
    let mut dynamics = DataFlowDynamics::new(SynthesisConfig::default());
    assert!(dynamics.propagate(&network).is_complete());

    let synthesizer =
        PolicySynthesizer::new(&network, dynamics.state(), &[], *dynamics.config());
    let policy = synthesizer
        .policy_for("A", "out", "B", "in", &EdgePolicy::default())
        .unwrap();

    match policy.origin {
        PolicyOrigin::Computed {
            reading_latency,
            queue_size,
        } => {
            assert!(reading_latency >= Duration::from_millis(509));
            assert!(reading_latency <= Duration::from_millis(510));
            assert_eq!(queue_size, 6);
        }
        other => panic!("expected a computed policy, got {other:?}"),
    }
}

#[test]
fn trigger_port_reads_within_trigger_latency() {
    init_tracing();
    let network = NetworkBuilder::new()
        .task(TaskSpecBuilder::periodic("A", 0.1).output("out"))
        .task(
            TaskSpecBuilder::triggered("B")
                .trigger_latency(0.01)
                .reliable_input("in", true),
        )
        .connect("A.out", "B.in", EdgePolicy::default())
        .build();

    let report = compute_connection_policies(&network, SynthesisConfig::default()).unwrap();

    // No full period fits in 10ms: queue 1, ceil(1.1) + 1.
    assert_eq!(
        report.policy("A", "out", "B", "in"),
        Some(ConnectionPolicy::Buffer { size: 3 })
    );
    // The reader inherits the writer's rate through its trigger port.
    let reader = report.task_dynamics("B").unwrap();
    assert_eq!(reader.minimal_period(), Some(Duration::from_millis(100)));
}

#[test]
fn margin_scales_the_buffer() {
    init_tracing();
    let network = periodic_pair(EdgePolicy::default());
    let config = SynthesisConfig {
        buffer_size_margin: BufferSizeMargin::new(1.0).unwrap(),
    };

    let report = compute_connection_policies(&network, config).unwrap();

    assert_eq!(
        report.policy("A", "out", "B", "in"),
        Some(ConnectionPolicy::Buffer { size: 13 })
    );
}

#[test]
fn unreliable_sinks_get_latest_value_or_single_slot() {
    init_tracing();
    let network = NetworkBuilder::new()
        .task(TaskSpecBuilder::periodic("A", 0.1).output("out"))
        .task(
            TaskSpecBuilder::triggered("B")
                .unreliable_input("data", ConnectionKind::Data)
                .unreliable_input("queued", ConnectionKind::Buffer),
        )
        .connect("A.out", "B.data", EdgePolicy::default())
        .connect("A.out", "B.queued", EdgePolicy::default())
        .build();

    let report = compute_connection_policies(&network, SynthesisConfig::default()).unwrap();

    assert_eq!(
        report.policy("A", "out", "B", "data"),
        Some(ConnectionPolicy::PassThrough)
    );
    assert_eq!(
        report.policy("A", "out", "B", "queued"),
        Some(ConnectionPolicy::SingleSlot)
    );
}

#[test]
fn preset_policy_is_kept_and_stable() {
    init_tracing();
    let preset = ConnectionPolicy::Buffer { size: 42 };
    let network = periodic_pair(EdgePolicy::fixed(preset));
    let mut dynamics = DataFlowDynamics::new(SynthesisConfig::default());

    let first = dynamics.compute_connection_policies(&network).unwrap();
    let second = dynamics.compute_connection_policies(&network).unwrap();

    assert_eq!(first.policy("A", "out", "B", "in"), Some(preset));
    assert_eq!(first.policies, second.policies);
    assert_eq!(first.dynamics, second.dynamics);
}

#[test]
fn cycle_without_fallback_is_a_timing_cycle() {
    init_tracing();
    let network = ping_pong(EdgePolicy::default());

    let err = compute_connection_policies(&network, SynthesisConfig::default()).unwrap_err();

    match err {
        DynamicsError::TimingCycle(msg) => {
            assert!(msg.contains("X.out") || msg.contains("Y.out"), "{msg}");
        }
        other => panic!("expected TimingCycle, got {other:?}"),
    }
}

#[test]
fn cycle_with_fallback_uses_exactly_the_fallback() {
    init_tracing();
    let fallback = ConnectionPolicy::Buffer { size: 10 };
    let network = ping_pong(EdgePolicy::with_fallback(fallback));

    let report = compute_connection_policies(&network, SynthesisConfig::default()).unwrap();

    assert_eq!(report.policy("X", "out", "Y", "in"), Some(fallback));
    assert_eq!(report.policy("Y", "out", "X", "in"), Some(fallback));
    assert_eq!(report.warnings.len(), 2);
    assert!(report
        .warnings
        .iter()
        .all(|w| w.reason == FallbackReason::MissingSourceDynamics && w.fallback == fallback));
    assert!(!report.cycles.is_empty());
    assert!(report.unresolved.contains_key("X"));
    assert!(report.unresolved.contains_key("Y"));
}

#[test]
fn sink_without_period_needs_a_fallback() {
    init_tracing();
    let build = |edge| {
        NetworkBuilder::new()
            .task(TaskSpecBuilder::periodic("A", 0.1).output("out"))
            .task(TaskSpecBuilder::triggered("S").reliable_input("in", false))
            .connect("A.out", "S.in", edge)
            .build()
    };

    let err = compute_connection_policies(&build(EdgePolicy::default()), SynthesisConfig::default())
        .unwrap_err();
    match err {
        DynamicsError::MissingSinkPeriod { sink_task, sink } => {
            assert_eq!(sink_task, "S");
            assert_eq!(sink, "S.in");
        }
        other => panic!("expected MissingSinkPeriod, got {other:?}"),
    }

    let report = compute_connection_policies(
        &build(EdgePolicy::with_fallback(ConnectionPolicy::SingleSlot)),
        SynthesisConfig::default(),
    )
    .unwrap();
    assert_eq!(
        report.policy("A", "out", "S", "in"),
        Some(ConnectionPolicy::SingleSlot)
    );
    assert_eq!(report.warnings[0].reason, FallbackReason::MissingSinkPeriod);
}

#[test]
fn link_to_undeclared_port_is_an_internal_error() {
    init_tracing();
    let mut network = periodic_pair(EdgePolicy::default());
    network.connect("A", "missing", "B", "in", EdgePolicy::default());

    let err = compute_connection_policies(&network, SynthesisConfig::default()).unwrap_err();
    assert!(matches!(err, DynamicsError::InternalError(_)), "{err:?}");

    let mut network = periodic_pair(EdgePolicy::default());
    network.connect("A", "out", "Ghost", "in", EdgePolicy::default());
    let err = compute_connection_policies(&network, SynthesisConfig::default()).unwrap_err();
    assert!(matches!(err, DynamicsError::InternalError(_)), "{err:?}");
}

#[test]
fn buffer_size_formula() {
    let margin = BufferSizeMargin::DEFAULT;
    assert_eq!(buffer_size(0, margin), 1);
    assert_eq!(buffer_size(1, margin), 3);
    assert_eq!(buffer_size(6, margin), 8);
    // 1.1 * 10 is 11.000000000000002 in binary.
    assert_eq!(buffer_size(10, margin), 12);
    assert_eq!(buffer_size(400, margin), 441);

    let none = BufferSizeMargin::new(0.0).unwrap();
    assert_eq!(buffer_size(5, none), 6);
}

#[test]
fn invalid_margins_are_rejected() {
    for value in [-0.1, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            BufferSizeMargin::new(value),
            Err(DynamicsError::InvalidMargin(_))
        ));
    }
    assert_eq!(BufferSizeMargin::default().value(), 0.1);
}
