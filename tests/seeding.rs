// tests/seeding.rs

mod common;
use crate::common::builders::{NetworkBuilder, TaskSpecBuilder, device};
use crate::common::init_tracing;

use std::time::Duration;

use dataflow_dynamics::dynamics::PortDynamics;
use dataflow_dynamics::flow::{DynamicsReport, SynthesisConfig, compute_connection_policies};
use dataflow_dynamics::network::{ConnectionPolicy, EdgePolicy, Network, OutputPort};

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn report_for(network: &Network) -> DynamicsReport {
    compute_connection_policies(network, SynthesisConfig::default()).unwrap()
}

fn source_names(dynamics: &PortDynamics) -> Vec<&str> {
    dynamics.triggers().map(|t| t.source_name()).collect()
}

#[test]
fn slaves_inherit_their_master_dynamics() {
    init_tracing();
    let network = NetworkBuilder::new()
        .task(TaskSpecBuilder::periodic("M", 0.2).output("out"))
        .task(TaskSpecBuilder::slave("S", "M").output("out"))
        .task(TaskSpecBuilder::slave("SS", "S").output("out"))
        .build();

    let report = report_for(&network);

    assert!(report.unresolved.is_empty());
    for task in ["S", "SS"] {
        let main = report.task_dynamics(task).unwrap();
        assert_eq!(source_names(main), vec!["M.main-period"]);
        assert_eq!(main.minimal_period(), Some(ms(200)));

        let out = report.port_dynamics(task, "out").unwrap();
        assert_eq!(out.minimal_period(), Some(ms(200)));
    }
    assert_eq!(
        network.find_period_of(network.task("SS").unwrap()),
        Some(ms(200))
    );
}

#[test]
fn periodic_reader_resamples_its_inputs() {
    init_tracing();
    let network = NetworkBuilder::new()
        .task(TaskSpecBuilder::periodic("A", 0.1).output("out"))
        .task(
            TaskSpecBuilder::periodic("B", 0.5)
                .input("in")
                .output_on("out", &["in"]),
        )
        .connect("A.out", "B.in", EdgePolicy::default())
        .build();

    let report = report_for(&network);
    let out = report.port_dynamics("B", "out").unwrap();

    assert_eq!(source_names(out), vec!["B.in.resample(A.main-period,0.5)"]);
    assert_eq!(out.minimal_period(), Some(ms(500)));
    // Five writes plus one pending per read.
    assert_eq!(out.sample_count(ms(500)), 6);
}

#[test]
fn triggered_reader_merges_inputs_unchanged() {
    init_tracing();
    let network = NetworkBuilder::new()
        .task(TaskSpecBuilder::periodic("fast", 0.1).output("out"))
        .task(TaskSpecBuilder::periodic("slow", 0.3).output("out"))
        .task(TaskSpecBuilder::triggered("fusion").input("a").input("b").output("out"))
        .connect("fast.out", "fusion.a", EdgePolicy::default())
        .connect("slow.out", "fusion.b", EdgePolicy::default())
        .build();

    let report = report_for(&network);
    let out = report.port_dynamics("fusion", "out").unwrap();

    assert_eq!(
        source_names(out),
        vec!["fast.main-period", "slow.main-period"]
    );
    assert_eq!(out.minimal_period(), Some(ms(100)));
    // 3 fast writes + 1 slow write over 300ms.
    assert_eq!(out.sample_count(ms(300)), 4);
}

#[test]
fn output_without_writers_is_final_and_empty() {
    init_tracing();
    let network = NetworkBuilder::new()
        .task(TaskSpecBuilder::periodic("A", 0.1).output_on("events", &[]))
        .build();

    let report = report_for(&network);
    let events = report.port_dynamics("A", "events").unwrap();

    assert!(events.is_empty());
}

#[test]
fn polled_device_gives_one_batch_per_cycle() {
    init_tracing();
    let network = NetworkBuilder::new()
        .task(
            TaskSpecBuilder::periodic("imu_driver", 0.1)
                .output("samples")
                .driver(device("imu", Some(0.01), 0, 1), &["samples"]),
        )
        .build();

    let report = report_for(&network);
    let samples = report.port_dynamics("imu_driver", "samples").unwrap();

    // Ten device samples plus one pending, every driver cycle.
    assert!(
        samples
            .triggers()
            .any(|t| t.source_name() == "imu" && t.period() == ms(100) && t.sample_count() == 11)
    );
    assert_eq!(samples.minimal_period(), Some(ms(100)));
}

#[test]
fn device_wakes_up_a_triggered_driver() {
    init_tracing();
    let network = NetworkBuilder::new()
        .task(
            TaskSpecBuilder::triggered("gps_driver")
                .output("fix")
                .driver(device("gps", Some(1.0), 2, 1), &["fix"]),
        )
        .build();

    let report = report_for(&network);

    let fix = report.port_dynamics("gps_driver", "fix").unwrap();
    assert_eq!(fix.minimal_period(), Some(Duration::from_secs(1)));
    // One periodic sample plus a burst of two.
    assert_eq!(fix.sample_count(Duration::from_secs(1)), 3);

    let main = report.task_dynamics("gps_driver").unwrap();
    assert_eq!(source_names(main), vec!["gps", "gps-burst"]);
}

#[test]
fn bus_inputs_follow_the_devices_behind_the_bus() {
    init_tracing();
    let network = NetworkBuilder::new()
        .task(
            TaskSpecBuilder::triggered("can_bus")
                .input("rx")
                .combus(device("wheel", Some(0.05), 4, 2), &["rx"]),
        )
        .build();

    let report = report_for(&network);
    let rx = report.port_dynamics("can_bus", "rx").unwrap();

    assert_eq!(rx.sample_size(), 2);
    assert_eq!(rx.minimal_period(), Some(ms(50)));
    // 4 single samples plus one burst of 4 over 200ms.
    assert_eq!(rx.sample_count(ms(200)), 8);
    assert_eq!(rx.queue_size(ms(200)), 18);
}

#[test]
fn port_hints_are_final_from_the_start() {
    init_tracing();
    let mut hint = PortDynamics::new("ext.out", 1);
    hint.add_trigger("external", ms(50), 1);

    let network = NetworkBuilder::new()
        .task(TaskSpecBuilder::triggered("proxy").input("in").output("out").port_hint("out", hint))
        .task(TaskSpecBuilder::periodic("reader", 0.2).reliable_input("in", false))
        .connect("proxy.out", "reader.in", EdgePolicy::default())
        .build();

    let report = report_for(&network);
    let out = report.port_dynamics("proxy", "out").unwrap();

    assert_eq!(source_names(out), vec!["external"]);
    assert!(report.policy("proxy", "out", "reader", "in").is_some());
}

#[test]
fn task_hints_flow_into_outputs() {
    init_tracing();
    let mut hint = PortDynamics::new("planner.main", 1);
    hint.add_trigger("requested", ms(250), 1);

    let network = NetworkBuilder::new()
        .task(TaskSpecBuilder::triggered("planner").output("plan").task_hint(hint))
        .build();

    let report = report_for(&network);

    let plan = report.port_dynamics("planner", "plan").unwrap();
    assert_eq!(source_names(plan), vec!["requested"]);
    assert_eq!(plan.minimal_period(), Some(ms(250)));
}

#[test]
fn unconnected_port_trigger_adds_no_writes() {
    init_tracing();
    let network = NetworkBuilder::new()
        .task(
            TaskSpecBuilder::periodic("A", 0.1)
                .input("cmd")
                .output_port({
                    let mut out = OutputPort::new("out");
                    out.port_triggers = vec!["cmd".to_string()];
                    out
                })
                .output_on("events", &["cmd"]),
        )
        .task(
            TaskSpecBuilder::periodic("C", 0.5)
                .trigger_latency(0.01)
                .reliable_input("in", false),
        )
        .connect("A.out", "C.in", EdgePolicy::default())
        .build();

    let report = report_for(&network);

    // Only the periodic update writes `out`.
    let out = report.port_dynamics("A", "out").unwrap();
    assert_eq!(source_names(out), vec!["A.main-period"]);
    assert_eq!(
        report.policy("A", "out", "C", "in"),
        Some(ConnectionPolicy::Buffer { size: 8 })
    );

    // Nothing ever writes `events`.
    let events = report.port_dynamics("A", "events").unwrap();
    assert!(events.is_empty());
}
