// tests/dependency_cycles.rs

use dataflow_dynamics::propagation::dependency_cycles;

#[test]
fn acyclic_edges_have_no_cycles() {
    let cycles = dependency_cycles([(1, 2), (2, 3), (1, 3)]);
    assert!(cycles.is_empty());
}

#[test]
fn cycles_and_self_loops_are_reported_sorted() {
    let cycles = dependency_cycles([(5, 4), (4, 5), (3, 3), (1, 2), (7, 8), (8, 9), (9, 7)]);
    assert_eq!(cycles, vec![vec![3], vec![4, 5], vec![7, 8, 9]]);
}

#[test]
fn nodes_outside_a_cycle_are_left_out() {
    // c depends on the cycle but is not part of it.
    let cycles = dependency_cycles([("a", "b"), ("b", "a"), ("c", "a")]);
    assert_eq!(cycles, vec![vec!["a", "b"]]);
}
