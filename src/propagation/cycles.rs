// src/propagation/cycles.rs

//! Dependency cycle detection for stalled propagations.

use std::collections::BTreeMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

/// Strongly connected groups of nodes that depend on each other.
///
/// `edges` are `(node, dependency)` pairs. Only real cycles are returned:
/// components of two or more nodes, or a single node depending on itself.
/// Each cycle is sorted, and cycles are ordered by their first node.
pub fn dependency_cycles<N>(edges: impl IntoIterator<Item = (N, N)>) -> Vec<Vec<N>>
where
    N: Ord + Clone,
{
    let mut graph: DiGraph<N, ()> = DiGraph::new();
    let mut index: BTreeMap<N, NodeIndex> = BTreeMap::new();

    let mut node_index = |graph: &mut DiGraph<N, ()>, node: N| -> NodeIndex {
        *index
            .entry(node.clone())
            .or_insert_with(|| graph.add_node(node))
    };

    for (node, dependency) in edges {
        let from = node_index(&mut graph, node);
        let to = node_index(&mut graph, dependency);
        graph.update_edge(from, to, ());
    }

    let mut cycles: Vec<Vec<N>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| match component.as_slice() {
            [single] => graph.contains_edge(*single, *single),
            _ => true,
        })
        .map(|component| {
            let mut nodes: Vec<N> = component.iter().map(|i| graph[*i].clone()).collect();
            nodes.sort();
            nodes
        })
        .collect();
    cycles.sort();
    cycles
}
