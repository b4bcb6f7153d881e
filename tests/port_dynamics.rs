// tests/port_dynamics.rs

use std::time::Duration;

use dataflow_dynamics::dynamics::{PortDynamics, Trigger};

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[test]
fn same_trigger_is_recorded_once() {
    let mut dynamics = PortDynamics::new("cam.frames", 1);

    assert!(dynamics.add_trigger("cam.main-period", ms(100), 1));
    assert!(!dynamics.add_trigger("cam.main-period", ms(100), 1));
    assert_eq!(dynamics.triggers().count(), 1);

    // Same source, different rate: a distinct fact.
    assert!(dynamics.add_trigger("cam.main-period", ms(200), 1));
    assert_eq!(dynamics.triggers().count(), 2);
}

#[test]
fn zero_sample_count_adds_nothing() {
    let mut dynamics = PortDynamics::new("cam.frames", 1);
    assert!(!dynamics.add_trigger("burst", Duration::ZERO, 0));
    assert!(dynamics.is_empty());
    assert_eq!(dynamics.sample_count(ms(1000)), 0);
    assert_eq!(dynamics.queue_size(ms(1000)), 1);
}

#[test]
fn sample_size_is_at_least_one() {
    assert_eq!(PortDynamics::new("x", 0).sample_size(), 1);
    assert_eq!(PortDynamics::new("x", 3).sample_size(), 3);
}

#[test]
fn sample_count_combines_periodic_and_burst_triggers() {
    let mut dynamics = PortDynamics::new("lidar.scans", 2);
    dynamics.add_trigger("lidar.main-period", ms(100), 2);
    dynamics.add_trigger("lidar-burst", Duration::ZERO, 3);

    // floor(250 / 100) * 2 + 3
    assert_eq!(dynamics.sample_count(ms(250)), 7);
    // (7 + 1) * 2
    assert_eq!(dynamics.queue_size(ms(250)), 16);
}

#[test]
fn sample_count_is_exact_on_period_boundaries() {
    let mut dynamics = PortDynamics::new("a.out", 1);
    dynamics.add_trigger("a.main-period", ms(100), 1);

    assert_eq!(dynamics.sample_count(ms(99)), 0);
    assert_eq!(dynamics.sample_count(ms(100)), 1);
    assert_eq!(dynamics.sample_count(ms(200)), 2);
    assert_eq!(dynamics.sample_count(Duration::ZERO), 0);
}

#[test]
fn minimal_period_ignores_bursts() {
    let mut dynamics = PortDynamics::new("a.out", 1);
    assert_eq!(dynamics.minimal_period(), None);

    dynamics.add_trigger("burst", Duration::ZERO, 5);
    assert_eq!(dynamics.minimal_period(), None);

    dynamics.add_trigger("slow", ms(300), 1);
    dynamics.add_trigger("fast", ms(100), 1);
    assert_eq!(dynamics.minimal_period(), Some(ms(100)));
}

#[test]
fn merge_reports_whether_anything_changed() {
    let mut left = PortDynamics::new("left", 1);
    left.add_trigger("a", ms(100), 1);

    let mut right = PortDynamics::new("right", 1);
    right.add_trigger("a", ms(100), 1);
    right.add_trigger("b", ms(50), 2);

    assert!(left.merge(&right));
    assert_eq!(left.triggers().count(), 2);
    assert!(!left.merge(&right));

    // Merging never removes anything.
    let empty = PortDynamics::new("empty", 1);
    assert!(!left.merge(&empty));
    assert_eq!(left.triggers().count(), 2);
}

#[test]
fn resampling_folds_everything_into_one_trigger() {
    let mut dynamics = PortDynamics::new("reader.in", 1);
    dynamics.add_trigger("writer.main-period", ms(100), 1);

    let resampled = dynamics.sampled_at(ms(500));
    let triggers: Vec<&Trigger> = resampled.triggers().collect();

    assert_eq!(triggers.len(), 1);
    assert_eq!(
        triggers[0].source_name(),
        "reader.in.resample(writer.main-period,0.5)"
    );
    assert_eq!(triggers[0].period(), ms(500));
    // queue_size(500ms) = (5 + 1) * 1
    assert_eq!(triggers[0].sample_count(), 6);
    assert_eq!(resampled.sample_size(), 1);
}

#[test]
fn resampling_nothing_stays_empty() {
    let dynamics = PortDynamics::new("reader.cmd", 2);
    let resampled = dynamics.sampled_at(ms(500));

    assert!(resampled.is_empty());
    assert_eq!(resampled.sample_size(), 2);
    assert_eq!(resampled.sample_count(ms(500)), 0);
}

#[test]
fn trigger_display_is_readable() {
    let trigger = Trigger::new("cam.main-period", ms(100), 1);
    assert_eq!(trigger.to_string(), "(cam.main-period): 0.1s x1");
    assert!(!trigger.is_aperiodic());
    assert!(Trigger::new("burst", Duration::ZERO, 4).is_aperiodic());
}
