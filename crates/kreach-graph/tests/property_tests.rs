//! Property-based tests for the proof graph.
//!
//! These check the structural guarantees the provers rely on (prune
//! exactness, cover acyclicity, frontier determinism) across randomized
//! graph shapes.

use kreach_core::{State, Term};
use kreach_graph::{GraphError, NodeId, ProofGraph};
use proptest::prelude::*;

// ============================================================================
// Helper functions
// ============================================================================

fn state(tag: u64) -> State {
    State::new(Term::app("n", vec![Term::int(tag as i64)]))
}

/// Grow a random graph by applying a sequence of edge operations to
/// whatever frontier exists at each step. `ops` encodes the shape:
/// 0 => step edge to a fresh node, 1 => two-way split, 2 => cover into the
/// target.
fn build_graph(ops: &[u8]) -> ProofGraph {
    let mut graph = ProofGraph::from_claim_states(state(0), state(u64::MAX));
    let target = graph.targets().next().unwrap();
    let mut fresh = 1u64;
    for op in ops {
        let Some(&source) = graph.frontier().first() else {
            break;
        };
        match op % 3 {
            0 => {
                let next = graph.add_node(state(fresh));
                fresh += 1;
                graph.add_step_edge(source, next, 1, vec![]).unwrap();
            }
            1 => {
                let pred = Term::var("B");
                graph
                    .add_split_edge(
                        source,
                        vec![(pred.clone(), state(fresh)), (pred.negate(), state(fresh + 1))],
                    )
                    .unwrap();
                fresh += 2;
            }
            _ => {
                graph.add_cover_edge(source, target).unwrap();
            }
        }
    }
    graph
}

fn reachable_node_ids(graph: &ProofGraph) -> Vec<NodeId> {
    graph.reachable_from(graph.init()).into_iter().collect()
}

// ============================================================================
// Structural properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_every_node_reachable_from_init(ops in prop::collection::vec(0u8..3, 0..24)) {
        let graph = build_graph(&ops);
        let reachable = reachable_node_ids(&graph);
        for node in graph.nodes() {
            // the target node may predate any edge into it; everything else
            // is created by an edge operation and must stay connected
            if !graph.is_target(node.id) {
                prop_assert!(reachable.contains(&node.id), "unreachable node {}", node.id);
            }
        }
    }

    #[test]
    fn prop_prune_removes_exactly_unreachable(
        ops in prop::collection::vec(0u8..3, 1..24),
        pick in 0usize..64,
    ) {
        let mut graph = build_graph(&ops);
        let candidates: Vec<NodeId> = graph
            .nodes()
            .map(|n| n.id)
            .filter(|id| *id != graph.init())
            .collect();
        prop_assume!(!candidates.is_empty());
        let victim = candidates[pick % candidates.len()];

        let before: Vec<NodeId> = graph.nodes().map(|n| n.id).collect();
        let removed = graph.remove_subgraph(victim).unwrap();

        // removed and kept partition the old node set
        let kept: Vec<NodeId> = graph.nodes().map(|n| n.id).collect();
        let mut recombined = kept.clone();
        recombined.extend(removed.iter().copied());
        recombined.sort();
        prop_assert_eq!(recombined, before);

        // the victim is gone, init survives, and no kept node lost its
        // connection to init
        prop_assert!(removed.contains(&victim));
        prop_assert!(graph.contains(graph.init()));
        let reachable = reachable_node_ids(&graph);
        for id in kept {
            if !graph.is_target(id) {
                prop_assert!(reachable.contains(&id));
            }
        }
        // no dangling edges survive
        for (_, edge) in graph.edges() {
            for target in edge.targets() {
                prop_assert!(graph.contains(target));
            }
        }
    }

    #[test]
    fn prop_init_never_removable(ops in prop::collection::vec(0u8..3, 0..16)) {
        let mut graph = build_graph(&ops);
        let init = graph.init();
        prop_assert_eq!(graph.remove_subgraph(init), Err(GraphError::PruneInitNode(init)));
    }

    #[test]
    fn prop_frontier_is_deterministic_and_sorted(ops in prop::collection::vec(0u8..3, 0..24)) {
        let graph = build_graph(&ops);
        let frontier = graph.frontier();
        let mut sorted = frontier.clone();
        sorted.sort();
        prop_assert_eq!(&frontier, &sorted);
        prop_assert_eq!(frontier, graph.frontier());
    }
}
