//! Graph editing without a backend: merge and prune.
//!
//! Used interactively for proof debugging and by repair workflows on a
//! previously persisted graph. Every precondition is validated before the
//! first mutation, so a rejected operation leaves the graph untouched.

use crate::error::{ExploreError, ExploreResult};
use kreach_core::{State, Term};
use kreach_graph::{NodeId, ProofGraph};
use tracing::info;

/// Merge frontier nodes into a single disjunction node.
///
/// All inputs must currently be frontier nodes and share one configuration
/// up to variable renaming; otherwise the merged node could denote states
/// none of the inputs denote. The merged node keeps the first input's
/// variable names, its constraint set is the disjunction of the inputs'
/// conjoined constraints, and every edge that pointed at an input is
/// rewired to the merged node before the inputs are removed. Case-splitting
/// the merged node on the recorded disjuncts re-derives each input.
pub fn merge(graph: &mut ProofGraph, node_ids: &[NodeId]) -> ExploreResult<NodeId> {
    if node_ids.len() < 2 {
        return Err(ExploreError::MergeIncompatible(format!(
            "need at least 2 nodes, got {}",
            node_ids.len()
        )));
    }
    let frontier = graph.frontier();
    for id in node_ids {
        if *id == graph.init() {
            return Err(ExploreError::MergeIncompatible(
                "the init node cannot be merged".to_string(),
            ));
        }
        if !frontier.contains(id) {
            return Err(ExploreError::MergeIncompatible(format!(
                "node {} is not a frontier node",
                id
            )));
        }
    }

    let base = graph.node(node_ids[0])?.state.clone();
    let mut disjuncts = vec![base.constraint_conjunction()];
    for id in &node_ids[1..] {
        let state = &graph.node(*id)?.state;
        let Some(renaming) = state.config_alpha_eq(&base) else {
            return Err(ExploreError::MergeIncompatible(format!(
                "configurations of nodes {} and {} differ beyond renaming",
                node_ids[0], id
            )));
        };
        disjuncts.push(state.constraint_conjunction().rename(&renaming));
    }

    let constraints = if disjuncts.iter().all(|d| *d == Term::Bool(true)) {
        Vec::new()
    } else {
        vec![Term::app("orBool", disjuncts)]
    };
    let merged = graph.add_node(State::with_constraints(base.config, constraints));
    for id in node_ids {
        graph.rewire_incoming(*id, merged)?;
        graph.remove_node(*id)?;
    }
    info!(nodes = ?node_ids, into = %merged, "merged frontier nodes");
    Ok(merged)
}

/// Prune a node and everything only it reaches. Thin wrapper so editing
/// call sites go through one module.
pub fn prune(graph: &mut ProofGraph, node: NodeId) -> ExploreResult<Vec<NodeId>> {
    let removed = graph.remove_subgraph(node)?;
    info!(node = %node, count = removed.len(), "pruned subgraph");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kreach_graph::{Edge, GraphError};

    fn constrained(config: Term, constraint: Term) -> State {
        State::with_constraints(config, vec![constraint])
    }

    /// init splits on B into two frontier leaves with alpha-equivalent
    /// configurations.
    fn split_graph() -> (ProofGraph, Vec<NodeId>, Term, Term) {
        let mut graph =
            ProofGraph::from_claim_states(State::new(Term::symbol("init")), State::new(Term::symbol("target")));
        let config_l = Term::app("end", vec![Term::var("X")]);
        let config_r = Term::app("end", vec![Term::var("Y")]);
        let pred = Term::var("B");
        let c_l = Term::app("<", vec![Term::var("X"), Term::int(0)]);
        let c_r = Term::app(">=", vec![Term::var("Y"), Term::int(0)]);
        let children = graph
            .add_split_edge(
                graph.init(),
                vec![
                    (pred.clone(), constrained(config_l, c_l.clone())),
                    (pred.negate(), constrained(config_r, c_r.clone())),
                ],
            )
            .unwrap();
        (graph, children, c_l, c_r)
    }

    #[test]
    fn test_merge_disjoins_constraints_under_renaming() {
        let (mut graph, children, c_l, c_r) = split_graph();
        let merged = merge(&mut graph, &children).unwrap();

        let state = &graph.node(merged).unwrap().state;
        assert_eq!(state.config, Term::app("end", vec![Term::var("X")]));
        // second disjunct renamed into the first input's variables
        let expected_r = Term::app(">=", vec![Term::var("X"), Term::int(0)]);
        assert_eq!(
            state.constraints,
            vec![Term::app("orBool", vec![c_l, expected_r.clone()])]
        );
        assert_ne!(expected_r, c_r);

        // both split branches rewired to the merged node, inputs gone
        let Some(Edge::Split { branches }) = graph.edge(graph.init()) else {
            panic!("split edge expected");
        };
        assert!(branches.iter().all(|b| b.target == merged));
        assert!(!graph.contains(children[0]));
        assert!(!graph.contains(children[1]));
    }

    #[test]
    fn test_merge_rejects_incompatible_configs() {
        let mut graph =
            ProofGraph::from_claim_states(State::new(Term::symbol("init")), State::new(Term::symbol("target")));
        let children = graph
            .add_split_edge(
                graph.init(),
                vec![
                    (Term::var("B"), State::new(Term::app("end", vec![Term::var("X")]))),
                    (Term::var("B").negate(), State::new(Term::app("other", vec![Term::var("Y")]))),
                ],
            )
            .unwrap();
        let before = graph.node_count();
        let err = merge(&mut graph, &children).unwrap_err();
        assert!(matches!(err, ExploreError::MergeIncompatible(_)));
        assert_eq!(graph.node_count(), before);
    }

    #[test]
    fn test_merge_rejects_non_frontier_nodes() {
        let (mut graph, children, _, _) = split_graph();
        let target = graph.targets().next().unwrap();
        // a covered node is no longer frontier
        graph.add_cover_edge(children[0], target).unwrap();
        let err = merge(&mut graph, &children).unwrap_err();
        assert!(matches!(err, ExploreError::MergeIncompatible(_)));
    }

    #[test]
    fn test_merge_rejects_init() {
        let (mut graph, children, _, _) = split_graph();
        let init = graph.init();
        let err = merge(&mut graph, &[init, children[0]]).unwrap_err();
        assert!(matches!(err, ExploreError::MergeIncompatible(_)));
    }

    #[test]
    fn test_prune_init_propagates_graph_error() {
        let (mut graph, _, _, _) = split_graph();
        let init = graph.init();
        let err = prune(&mut graph, init).unwrap_err();
        assert!(matches!(
            err,
            ExploreError::Graph(GraphError::PruneInitNode(_))
        ));
    }
}
