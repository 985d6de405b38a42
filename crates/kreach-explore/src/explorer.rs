//! The Explorer: backend calls with claim-graph-aware pre/post-processing.

use crate::error::{ExploreError, ExploreResult};
use kreach_backend::{Backend, ExecuteOutcome, Model, ModelOutcome};
use kreach_core::State;
use kreach_graph::{Edge, NodeId, ProofGraph};
use tracing::debug;

/// Result of an implication check, with the failure reason and optional
/// counterexample model on the negative side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Implication {
    Implied,
    NotImplied {
        reason: String,
        model: Option<Model>,
    },
}

impl Implication {
    pub fn is_implied(&self) -> bool {
        matches!(self, Implication::Implied)
    }
}

/// Wraps one exclusive backend session with proof-aware operations. The
/// handle is scoped: constructing an `Explorer` takes ownership of the
/// connection and dropping it releases the session, on every exit path.
pub struct Explorer<B> {
    backend: B,
}

impl<B: Backend> Explorer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Add the backend's definedness side conditions to a state. Fails
    /// when the constrained state is provably empty: such a claim is
    /// malformed and proving it would be vacuous.
    pub fn assume_defined(&mut self, state: &State) -> ExploreResult<State> {
        let mut constrained = state.clone();
        constrained.add_constraint(state.defined_predicate());
        let simplified = self.backend.simplify(&constrained)?;
        if simplified.is_bottom() {
            return Err(ExploreError::UndefinedInitialState);
        }
        Ok(simplified)
    }

    /// Backend-simplify a node's state and replace it in the graph under
    /// the same id. Returns whether anything changed; a second call on an
    /// already-simplified node is a no-op.
    pub fn simplify_node(
        &mut self,
        graph: &mut ProofGraph,
        id: NodeId,
    ) -> ExploreResult<bool> {
        let state = graph.node(id)?.state.clone();
        let simplified = self.backend.simplify(&state)?;
        if simplified == state {
            return Ok(false);
        }
        debug!(node = %id, "replacing node with simplified state");
        graph.replace_node(id, simplified)?;
        Ok(true)
    }

    /// Check subset inclusion of denoted states, fetching a counterexample
    /// model only when the caller asked for one.
    pub fn check_implies(
        &mut self,
        antecedent: &State,
        consequent: &State,
        want_model: bool,
    ) -> ExploreResult<Implication> {
        match self.backend.implies(antecedent, consequent)? {
            kreach_backend::ImpliesOutcome::Implied => Ok(Implication::Implied),
            kreach_backend::ImpliesOutcome::NotImplied { reason } => {
                let model = if want_model {
                    match self.backend.get_model(antecedent)? {
                        ModelOutcome::Model { model } => Some(model),
                        ModelOutcome::Unsat | ModelOutcome::Unknown { .. } => None,
                    }
                } else {
                    None
                };
                Ok(Implication::NotImplied { reason, model })
            }
        }
    }

    /// Ask the backend for a satisfying assignment of a state's path
    /// constraints, for counterexample display. `None` when the backend
    /// cannot produce one.
    pub fn counterexample(&mut self, state: &State) -> ExploreResult<Option<Model>> {
        match self.backend.get_model(state)? {
            ModelOutcome::Model { model } => Ok(Some(model)),
            ModelOutcome::Unsat | ModelOutcome::Unknown { .. } => Ok(None),
        }
    }

    /// Run the backend rewrite engine from a state.
    pub fn execute(
        &mut self,
        state: &State,
        max_depth: usize,
        terminal_rules: &[String],
        cut_point_rules: &[String],
    ) -> ExploreResult<ExecuteOutcome> {
        let outcome = self
            .backend
            .execute(state, max_depth, terminal_rules, cut_point_rules)?;
        debug!(depth = outcome.depth(), rule = ?outcome.rule(), "backend execution stopped");
        Ok(outcome)
    }

    /// Force exactly `depth` rewrite steps from a node, ignoring terminal
    /// and cut-point rules, and record the step edge. Manual exploration
    /// only; the provers never force depth this way.
    pub fn step(
        &mut self,
        graph: &mut ProofGraph,
        node: NodeId,
        depth: usize,
    ) -> ExploreResult<NodeId> {
        let state = graph.node(node)?.state.clone();
        let outcome = self.backend.execute(&state, depth, &[], &[])?;
        let actual = outcome.depth();
        let next_state = match outcome {
            ExecuteOutcome::Branching { .. } => {
                return Err(ExploreError::StepBranched { node });
            }
            _ if actual != depth => {
                return Err(ExploreError::StepMismatch {
                    node,
                    requested: depth,
                    actual,
                });
            }
            ExecuteOutcome::DepthBound { state, .. }
            | ExecuteOutcome::Terminal { state, .. }
            | ExecuteOutcome::CutPoint { state, .. }
            | ExecuteOutcome::Stuck { state, .. } => state,
            ExecuteOutcome::Vacuous { .. } => State::bottom(),
        };
        let next = graph.add_node(next_state);
        graph.add_step_edge(node, next, depth, Vec::new())?;
        Ok(next)
    }

    /// Split a step edge of depth `k` into `sections` roughly even
    /// segments by re-executing from the source, inserting `sections - 1`
    /// intermediate checkpoint nodes. The final segment reuses the
    /// original target. Returns the inserted node ids.
    pub fn section_edge(
        &mut self,
        graph: &mut ProofGraph,
        source: NodeId,
        target: NodeId,
        sections: usize,
    ) -> ExploreResult<Vec<NodeId>> {
        let Some(Edge::Step { target: t, depth, rules }) = graph.edge(source) else {
            return Err(kreach_graph::GraphError::EdgeMissing { from: source, target }.into());
        };
        if *t != target {
            return Err(kreach_graph::GraphError::EdgeMissing { from: source, target }.into());
        }
        let (depth, rules) = (*depth, rules.clone());
        if sections < 2 || depth < sections {
            return Err(ExploreError::SectionTooShort { depth, sections });
        }

        graph.remove_edge(source, target)?;
        let increment = depth / sections;
        let mut inserted = Vec::with_capacity(sections - 1);
        let mut cursor = source;
        let mut remaining = depth;
        for _ in 0..sections - 1 {
            cursor = self.step(graph, cursor, increment)?;
            inserted.push(cursor);
            remaining -= increment;
        }
        graph.add_step_edge(cursor, target, remaining, rules)?;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kreach_backend::{BackendError, ImpliesOutcome, MockBackend};
    use kreach_core::Term;

    fn state(tag: &str) -> State {
        State::new(Term::symbol(tag))
    }

    fn graph() -> ProofGraph {
        ProofGraph::from_claim_states(state("init"), state("target"))
    }

    #[test]
    fn test_assume_defined_keeps_backend_conditions() {
        let gas_positive = Term::app(">=", vec![Term::var("Gas"), Term::int(0)]);
        let refined = State::with_constraints(Term::symbol("init"), vec![gas_positive.clone()]);
        let mut explorer = Explorer::new(MockBackend::new().expect_simplify(refined));
        let result = explorer.assume_defined(&state("init")).unwrap();
        assert_eq!(result.constraints, vec![gas_positive]);
    }

    #[test]
    fn test_assume_defined_bottom_is_undefined_claim() {
        let mut explorer = Explorer::new(MockBackend::new().expect_simplify(State::bottom()));
        let err = explorer.assume_defined(&state("init")).unwrap_err();
        assert!(matches!(err, ExploreError::UndefinedInitialState));
    }

    #[test]
    fn test_simplify_node_is_idempotent() {
        let simplified = State::with_constraints(
            Term::symbol("init"),
            vec![Term::app("<", vec![Term::var("X"), Term::int(8)])],
        );
        let mut graph = graph();
        let mut explorer =
            Explorer::new(MockBackend::new().expect_simplify(simplified.clone()));
        let init = graph.init();
        assert!(explorer.simplify_node(&mut graph, init).unwrap());
        assert_eq!(graph.node(graph.init()).unwrap().state, simplified);
        // mock falls back to identity: second call reports no change
        assert!(!explorer.simplify_node(&mut graph, init).unwrap());
        assert_eq!(graph.node(graph.init()).unwrap().state, simplified);
    }

    #[test]
    fn test_check_implies_fetches_model_only_on_request() {
        let model = Model {
            assignments: [("X".to_string(), Term::int(4))].into_iter().collect(),
        };
        let mock = MockBackend::new()
            .expect_implies(ImpliesOutcome::NotImplied {
                reason: "X may exceed the bound".into(),
            })
            .expect_implies(ImpliesOutcome::NotImplied {
                reason: "X may exceed the bound".into(),
            })
            .expect_model(model.clone());
        let calls = mock.calls();
        let mut explorer = Explorer::new(mock);

        let without = explorer
            .check_implies(&state("a"), &state("b"), false)
            .unwrap();
        assert_eq!(
            without,
            Implication::NotImplied {
                reason: "X may exceed the bound".into(),
                model: None
            }
        );
        assert_eq!(calls.get_model.load(std::sync::atomic::Ordering::Relaxed), 0);

        let with = explorer
            .check_implies(&state("a"), &state("b"), true)
            .unwrap();
        assert_eq!(
            with,
            Implication::NotImplied {
                reason: "X may exceed the bound".into(),
                model: Some(model)
            }
        );
        assert_eq!(calls.get_model.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[test]
    fn test_step_inserts_edge_of_exact_depth() {
        let mut graph = graph();
        let mut explorer = Explorer::new(MockBackend::new().expect_execute(
            ExecuteOutcome::DepthBound {
                state: state("stepped"),
                depth: 7,
            },
        ));
        let init = graph.init();
        let next = explorer.step(&mut graph, init, 7).unwrap();
        assert_eq!(graph.node(next).unwrap().state, state("stepped"));
        assert!(matches!(
            graph.edge(graph.init()),
            Some(Edge::Step { depth: 7, .. })
        ));
    }

    #[test]
    fn test_step_mismatch_when_backend_stops_early() {
        let mut graph = graph();
        let mut explorer = Explorer::new(MockBackend::new().expect_execute(
            ExecuteOutcome::Terminal {
                state: state("halted"),
                depth: 3,
                rule: "halt".into(),
            },
        ));
        let init = graph.init();
        let err = explorer.step(&mut graph, init, 7).unwrap_err();
        assert!(matches!(
            err,
            ExploreError::StepMismatch {
                requested: 7,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_section_edge_builds_chain() {
        let mut graph = graph();
        let end = graph.add_node(state("end"));
        graph
            .add_step_edge(graph.init(), end, 10, vec!["loop".into()])
            .unwrap();

        let mock = MockBackend::new()
            .expect_execute(ExecuteOutcome::DepthBound {
                state: state("mid1"),
                depth: 3,
            })
            .expect_execute(ExecuteOutcome::DepthBound {
                state: state("mid2"),
                depth: 3,
            });
        let mut explorer = Explorer::new(mock);
        let init = graph.init();
        let inserted = explorer
            .section_edge(&mut graph, init, end, 3)
            .unwrap();
        assert_eq!(inserted.len(), 2);

        // chain: init -3-> mid1 -3-> mid2 -4-> end, rules preserved on the
        // final segment
        let Some(Edge::Step { target, depth: 3, .. }) = graph.edge(graph.init()) else {
            panic!("expected step edge from init");
        };
        assert_eq!(*target, inserted[0]);
        let Some(Edge::Step { target, depth, rules }) = graph.edge(inserted[1]) else {
            panic!("expected step edge from last checkpoint");
        };
        assert_eq!((*target, *depth), (end, 4));
        assert_eq!(rules, &vec!["loop".to_string()]);
    }

    #[test]
    fn test_section_too_short_leaves_graph_unchanged() {
        let mut graph = graph();
        let end = graph.add_node(state("end"));
        let init = graph.init();
        graph.add_step_edge(init, end, 2, vec![]).unwrap();
        let mut explorer = Explorer::new(MockBackend::new());
        let err = explorer
            .section_edge(&mut graph, init, end, 3)
            .unwrap_err();
        assert!(matches!(
            err,
            ExploreError::SectionTooShort { depth: 2, sections: 3 }
        ));
        assert!(matches!(graph.edge(graph.init()), Some(Edge::Step { depth: 2, .. })));
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_backend_error_propagates() {
        let mut explorer = Explorer::new(
            MockBackend::new().fail_simplify(BackendError::Crash("boom".into())),
        );
        let err = explorer.assume_defined(&state("init")).unwrap_err();
        assert!(matches!(err, ExploreError::Backend(BackendError::Crash(_))));
    }
}
