//! Node and edge store with derived status queries.
//!
//! # Design
//!
//! Each node owns at most one outgoing edge record, kept in a successor
//! table keyed by source id. This makes "a cover is always a node's sole
//! outgoing edge" true by construction, and keeps the derived queries cheap
//! scans over ordered maps, so iteration order (and therefore frontier
//! selection) is deterministic for a given graph.
//!
//! Invariants:
//! - exactly one init node, one or more targets
//! - node ids are assigned monotonically and never reused
//! - every surviving node is reachable from init or is a designated
//!   target awaiting its first cover (maintained by prune)
//! - cover edges never close a cycle (checked on insertion)

use crate::error::{GraphError, GraphResult};
use kreach_core::{State, Term};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use tracing::warn;

/// Stable node identifier, unique within one proof graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A graph node: an id and the symbolic state it denotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub state: State,
}

/// One branch of a split edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitBranch {
    pub predicate: Term,
    pub target: NodeId,
}

/// A node's outgoing edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edge {
    /// Source reaches the target by `depth` concrete rewrite steps.
    Step {
        target: NodeId,
        depth: usize,
        rules: Vec<String>,
    },
    /// Exhaustive, mutually exclusive case partition proposed by the
    /// backend. The partition is recorded as given; exhaustiveness is the
    /// backend's contract (see DESIGN.md).
    Split { branches: Vec<SplitBranch> },
    /// The source's denoted states are a subset of the target's. Closes
    /// the branch.
    Cover { target: NodeId },
}

impl Edge {
    /// Targets of this edge, in branch order.
    pub fn targets(&self) -> Vec<NodeId> {
        match self {
            Edge::Step { target, .. } | Edge::Cover { target } => vec![*target],
            Edge::Split { branches } => branches.iter().map(|b| b.target).collect(),
        }
    }

    fn references(&self, id: NodeId) -> bool {
        self.targets().contains(&id)
    }
}

/// Why the prover gave up on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StuckReason {
    /// A leaf state failed to imply any target.
    ImplicationFailure { reason: String },
    /// The backend call timed out after the configured retries.
    SolverTimeout { attempts: u32 },
    /// The backend crashed mid-expansion.
    BackendCrash { detail: String },
    /// The BMC loop bound was reached at this node.
    BmcBoundExceeded { bound: usize },
}

impl fmt::Display for StuckReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StuckReason::ImplicationFailure { reason } => {
                write!(f, "implication failure: {}", reason)
            }
            StuckReason::SolverTimeout { attempts } => {
                write!(f, "solver timeout after {} attempts", attempts)
            }
            StuckReason::BackendCrash { detail } => write!(f, "backend crash: {}", detail),
            StuckReason::BmcBoundExceeded { bound } => {
                write!(f, "bmc-bound-exceeded (bound {})", bound)
            }
        }
    }
}

/// The proof graph for one claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofGraph {
    nodes: BTreeMap<NodeId, Node>,
    successors: BTreeMap<NodeId, Edge>,
    init: NodeId,
    targets: BTreeSet<NodeId>,
    stuck: BTreeMap<NodeId, StuckReason>,
    vacuous: BTreeSet<NodeId>,
    next_id: u64,
}

impl ProofGraph {
    /// Build the initial graph for a claim: one init node and one target
    /// node, or a single node serving as both when the two states are
    /// syntactically identical, in which case the claim is already closed.
    pub fn from_claim_states(init: State, target: State) -> Self {
        let mut graph = ProofGraph {
            nodes: BTreeMap::new(),
            successors: BTreeMap::new(),
            init: NodeId(0),
            targets: BTreeSet::new(),
            stuck: BTreeMap::new(),
            vacuous: BTreeSet::new(),
            next_id: 1,
        };
        let init_id = graph.add_node(init.clone());
        graph.init = init_id;
        let target_id = if init == target {
            init_id
        } else {
            graph.add_node(target)
        };
        graph.targets.insert(target_id);
        graph
    }

    pub fn init(&self) -> NodeId {
        self.init
    }

    pub fn targets(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.targets.iter().copied()
    }

    pub fn is_target(&self, id: NodeId) -> bool {
        self.targets.contains(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> GraphResult<&Node> {
        self.nodes.get(&id).ok_or(GraphError::NodeMissing(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge(&self, source: NodeId) -> Option<&Edge> {
        self.successors.get(&source)
    }

    pub fn edges(&self) -> impl Iterator<Item = (NodeId, &Edge)> {
        self.successors.iter().map(|(id, edge)| (*id, edge))
    }

    pub fn edge_count(&self) -> usize {
        self.successors.len()
    }

    pub fn add_node(&mut self, state: State) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node { id, state });
        id
    }

    pub fn add_step_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        depth: usize,
        rules: Vec<String>,
    ) -> GraphResult<()> {
        self.check_edge_free(source)?;
        self.node(target)?;
        self.successors.insert(
            source,
            Edge::Step {
                target,
                depth,
                rules,
            },
        );
        Ok(())
    }

    /// Record a case split: one child node per branch, each annotated with
    /// its branch predicate. A single-branch partition is degenerate and
    /// logged, but recorded as the backend proposed it.
    pub fn add_split_edge(
        &mut self,
        source: NodeId,
        branches: Vec<(Term, State)>,
    ) -> GraphResult<Vec<NodeId>> {
        self.check_edge_free(source)?;
        if branches.len() < 2 {
            warn!(%source, count = branches.len(), "degenerate split partition");
        }
        let branches: Vec<SplitBranch> = branches
            .into_iter()
            .map(|(predicate, state)| SplitBranch {
                predicate,
                target: self.add_node(state),
            })
            .collect();
        let children = branches.iter().map(|b| b.target).collect();
        self.successors.insert(source, Edge::Split { branches });
        Ok(children)
    }

    /// Record that `source`'s states are subsumed by `target`'s. Rejected
    /// when `target` already reaches `source`: such a cover would let a
    /// node transitively cover itself and trivially close any claim.
    pub fn add_cover_edge(&mut self, source: NodeId, target: NodeId) -> GraphResult<()> {
        self.check_edge_free(source)?;
        self.node(target)?;
        if source == target || self.reachable_from(target).contains(&source) {
            return Err(GraphError::CoverCycle { from: source, target });
        }
        self.successors.insert(source, Edge::Cover { target });
        Ok(())
    }

    /// Replace a node's state in place, keeping its id. Only valid for
    /// backend simplification: the replacement must still bind every
    /// variable an outgoing split edge branches on.
    pub fn replace_node(&mut self, id: NodeId, state: State) -> GraphResult<()> {
        self.node(id)?;
        if let Some(Edge::Split { branches }) = self.successors.get(&id) {
            let bound = state.free_vars();
            let missing: Vec<String> = branches
                .iter()
                .flat_map(|b| b.predicate.free_vars())
                .filter(|v| !bound.contains(v))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            if !missing.is_empty() {
                return Err(GraphError::ReplaceInconsistent {
                    node: id,
                    missing: missing.join(", "),
                });
            }
        }
        self.nodes.insert(id, Node { id, state });
        Ok(())
    }

    /// Prune: delete `id` and every node reachable from it that is not
    /// otherwise reachable from init through a different path. A target
    /// node that is not yet covered sits outside the reachable region and
    /// is never collateral damage. Edges touching a deleted node are
    /// removed whole, so surviving predecessors become leaves again.
    /// Returns the removed ids.
    pub fn remove_subgraph(&mut self, id: NodeId) -> GraphResult<Vec<NodeId>> {
        if id == self.init {
            return Err(GraphError::PruneInitNode(id));
        }
        self.node(id)?;
        let descendants = self.reachable_from(id);
        let kept = self.reachable_excluding(id);
        let removed: Vec<NodeId> = descendants
            .into_iter()
            .filter(|n| !kept.contains(n))
            .collect();
        for n in &removed {
            self.nodes.remove(n);
            self.successors.remove(n);
            self.targets.remove(n);
            self.stuck.remove(n);
            self.vacuous.remove(n);
        }
        self.successors
            .retain(|_, edge| !removed.iter().any(|n| edge.references(*n)));
        Ok(removed)
    }

    /// Remove a single unreferenced node (merge bookkeeping). Fails while
    /// any edge still points at it.
    pub fn remove_node(&mut self, id: NodeId) -> GraphResult<()> {
        if id == self.init {
            return Err(GraphError::PruneInitNode(id));
        }
        self.node(id)?;
        if self.successors.values().any(|edge| edge.references(id)) {
            return Err(GraphError::StillReferenced(id));
        }
        self.nodes.remove(&id);
        self.successors.remove(&id);
        self.targets.remove(&id);
        self.stuck.remove(&id);
        self.vacuous.remove(&id);
        Ok(())
    }

    /// Redirect every edge pointing at `old` to point at `new` instead.
    pub fn rewire_incoming(&mut self, old: NodeId, new: NodeId) -> GraphResult<()> {
        self.node(new)?;
        for edge in self.successors.values_mut() {
            match edge {
                Edge::Step { target, .. } | Edge::Cover { target } => {
                    if *target == old {
                        *target = new;
                    }
                }
                Edge::Split { branches } => {
                    for branch in branches.iter_mut() {
                        if branch.target == old {
                            branch.target = new;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Drop the edge `source -> target`, whatever its kind.
    pub fn remove_edge(&mut self, source: NodeId, target: NodeId) -> GraphResult<()> {
        match self.successors.get(&source) {
            Some(edge) if edge.references(target) => {
                self.successors.remove(&source);
                Ok(())
            }
            _ => Err(GraphError::EdgeMissing { from: source, target }),
        }
    }

    pub fn mark_stuck(&mut self, id: NodeId, reason: StuckReason) -> GraphResult<()> {
        self.check_leaf(id)?;
        self.stuck.insert(id, reason);
        Ok(())
    }

    pub fn mark_vacuous(&mut self, id: NodeId) -> GraphResult<()> {
        self.check_leaf(id)?;
        self.vacuous.insert(id);
        Ok(())
    }

    /// Leaves: nodes with no outgoing edge.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes
            .keys()
            .copied()
            .filter(|id| !self.successors.contains_key(id))
            .collect()
    }

    /// Frontier: leaves still eligible for expansion. Lowest id first, so
    /// frontier selection is reproducible across runs.
    pub fn frontier(&self) -> Vec<NodeId> {
        self.leaves()
            .into_iter()
            .filter(|id| {
                !self.targets.contains(id)
                    && !self.stuck.contains_key(id)
                    && !self.vacuous.contains(id)
            })
            .collect()
    }

    /// Reporting alias for the frontier: nodes a finished-but-failed proof
    /// still considers unexplored.
    pub fn pending(&self) -> Vec<NodeId> {
        self.frontier()
    }

    pub fn stuck(&self) -> impl Iterator<Item = (NodeId, &StuckReason)> {
        self.stuck.iter().map(|(id, reason)| (*id, reason))
    }

    pub fn is_stuck(&self, id: NodeId) -> bool {
        self.stuck.contains_key(&id)
    }

    pub fn is_vacuous(&self, id: NodeId) -> bool {
        self.vacuous.contains(&id)
    }

    /// Every node reachable from `from` through outgoing edges, `from`
    /// included.
    pub fn reachable_from(&self, from: NodeId) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(edge) = self.successors.get(&id) {
                queue.extend(edge.targets());
            }
        }
        seen
    }

    fn reachable_excluding(&self, excluded: NodeId) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([self.init]);
        while let Some(id) = queue.pop_front() {
            if id == excluded || !seen.insert(id) {
                continue;
            }
            if let Some(edge) = self.successors.get(&id) {
                queue.extend(edge.targets());
            }
        }
        seen
    }

    /// Shortest chain of node ids from init to `id` along step and split
    /// edges (covers close branches and do not extend paths). Used for BMC
    /// loop-recurrence counting.
    pub fn path_from_init(&self, id: NodeId) -> Option<Vec<NodeId>> {
        let mut previous: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        let mut queue = VecDeque::from([self.init]);
        let mut seen = BTreeSet::from([self.init]);
        while let Some(current) = queue.pop_front() {
            if current == id {
                let mut path = vec![current];
                let mut cursor = current;
                while let Some(prev) = previous.get(&cursor) {
                    path.push(*prev);
                    cursor = *prev;
                }
                path.reverse();
                return Some(path);
            }
            let Some(edge) = self.successors.get(&current) else {
                continue;
            };
            if let Edge::Cover { .. } = edge {
                continue;
            }
            for next in edge.targets() {
                if seen.insert(next) {
                    previous.insert(next, current);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    fn check_edge_free(&self, source: NodeId) -> GraphResult<()> {
        self.node(source)?;
        if self.successors.contains_key(&source) {
            return Err(GraphError::EdgeExists(source));
        }
        Ok(())
    }

    fn check_leaf(&self, id: NodeId) -> GraphResult<()> {
        self.node(id)?;
        if self.successors.contains_key(&id) {
            return Err(GraphError::NotALeaf(id));
        }
        Ok(())
    }
}
