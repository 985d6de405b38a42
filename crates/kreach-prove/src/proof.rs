//! Claims and proofs.

use kreach_core::State;
use kreach_graph::ProofGraph;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The unit of proof: "init reaches target". Side conditions live in the
/// init state's constraint list; the loader folds them in before the claim
/// reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub init: State,
    pub target: State,
}

impl Claim {
    pub fn new(id: impl Into<String>, init: State, target: State) -> Self {
        Self {
            id: id.into(),
            init,
            target,
        }
    }
}

/// Where a proof stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofStatus {
    /// Frontier nodes remain and the iteration budget was not exhausted.
    Pending,
    /// Every branch is closed: covered by a target or vacuous.
    Proven,
    /// At least one stuck node, or the iteration budget ran out.
    Failed,
}

impl ProofStatus {
    pub fn passed(&self) -> bool {
        matches!(self, ProofStatus::Proven)
    }
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProofStatus::Pending => write!(f, "pending"),
            ProofStatus::Proven => write!(f, "proven"),
            ProofStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A claim's proof graph plus run metadata. This is the persisted record:
/// the store serializes it whole after every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proof {
    pub id: String,
    pub graph: ProofGraph,
    /// BMC loop bound; `None` for plain reachability proofs.
    pub bound: Option<usize>,
    /// Expansion iterations spent so far, across resumes.
    pub iterations: usize,
}

impl Proof {
    pub fn new(id: impl Into<String>, graph: ProofGraph, bound: Option<usize>) -> Self {
        Self {
            id: id.into(),
            graph,
            bound,
            iterations: 0,
        }
    }

    /// Status derived from the graph alone. Budget exhaustion is a run
    /// property, not a graph property: the prover reports `Failed` for an
    /// out-of-budget run even while the stored graph still derives
    /// `Pending`.
    pub fn status(&self) -> ProofStatus {
        if self.graph.stuck().next().is_some() {
            ProofStatus::Failed
        } else if self.graph.frontier().is_empty() {
            ProofStatus::Proven
        } else {
            ProofStatus::Pending
        }
    }

    pub fn passed(&self) -> bool {
        self.status().passed()
    }
}

impl fmt::Display for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({} nodes, {} edges, {} frontier, {} stuck, {} iterations)",
            self.id,
            self.status(),
            self.graph.node_count(),
            self.graph.edge_count(),
            self.graph.frontier().len(),
            self.graph.stuck().count(),
            self.iterations,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kreach_core::Term;
    use kreach_graph::StuckReason;

    fn state(tag: &str) -> State {
        State::new(Term::symbol(tag))
    }

    #[test]
    fn test_status_of_trivial_claim_is_proven() {
        let graph = ProofGraph::from_claim_states(state("same"), state("same"));
        let proof = Proof::new("trivial", graph, None);
        assert_eq!(proof.status(), ProofStatus::Proven);
        assert!(proof.passed());
    }

    #[test]
    fn test_status_pending_then_failed() {
        let graph = ProofGraph::from_claim_states(state("init"), state("target"));
        let mut proof = Proof::new("claim", graph, None);
        assert_eq!(proof.status(), ProofStatus::Pending);

        let init = proof.graph.init();
        proof
            .graph
            .mark_stuck(
                init,
                StuckReason::ImplicationFailure {
                    reason: "does not reach target".into(),
                },
            )
            .unwrap();
        assert_eq!(proof.status(), ProofStatus::Failed);
    }

    #[test]
    fn test_display_summary() {
        let graph = ProofGraph::from_claim_states(state("init"), state("target"));
        let proof = Proof::new("Counter.testIncrement", graph, Some(3));
        let line = proof.to_string();
        assert!(line.starts_with("Counter.testIncrement: pending"));
        assert!(line.contains("2 nodes"));
    }
}
