//! The proving state machine.
//!
//! # Algorithm
//!
//! ```text
//! while a frontier node exists and budget remains:
//!   pick the lowest-id frontier node          (deterministic re-runs)
//!   BMC only: if its loop signature recurred `bound` times on the path
//!     from init, mark it stuck (bmc-bound-exceeded) and continue
//!   execute it against the backend:
//!     branching   -> split edge, children join the frontier
//!     depth/cut   -> step edge; covered by a target? close : frontier
//!     terminal    -> step edge; covered by a target? close : stuck
//!     vacuous     -> mark vacuous (closed, not a failure)
//!   checkpoint the proof
//! Proven  iff no stuck and no frontier node remains
//! Failed  on stuck nodes, exhausted budget, or a backend crash
//! ```
//!
//! Backend trouble never escapes a claim: a timeout (after the client's
//! retries) turns the node stuck, a crash records itself on the node and
//! fails this proof only.

use crate::error::ProveResult;
use crate::proof::{Claim, Proof, ProofStatus};
use crate::store::ProofStore;
use kreach_backend::{Backend, BackendError, ExecuteOutcome};
use kreach_core::State;
use kreach_explore::{ExploreError, Explorer, Implication};
use kreach_graph::{NodeId, ProofGraph, StuckReason};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Which proving algorithm drives the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProverKind {
    /// Plain reachability.
    Apr,
    /// Reachability with loop-iteration bounding. Terminates on specs
    /// whose rewriting does not, at the cost of reporting a correct but
    /// unbounded loop as a failure past the bound.
    Bmc { bound: usize },
}

/// Knobs for one proving run.
#[derive(Debug, Clone)]
pub struct ProverConfig {
    /// Backend depth budget per expansion.
    pub execute_depth: usize,
    /// Expansion budget per `advance` call; `None` runs to completion.
    pub max_iterations: Option<usize>,
    /// Rules that end execution and make the state a leaf candidate.
    pub terminal_rules: Vec<String>,
    /// Rules that stop execution early at a branch point.
    pub cut_point_rules: Vec<String>,
    /// Fetch counterexample models for stuck nodes when reporting.
    pub counterexample_info: bool,
    /// Checked between iterations; set to request a graceful stop.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            execute_depth: 1000,
            max_iterations: None,
            terminal_rules: Vec::new(),
            cut_point_rules: Vec::new(),
            counterexample_info: false,
            cancel: None,
        }
    }
}

impl ProverConfig {
    pub fn with_execute_depth(mut self, depth: usize) -> Self {
        self.execute_depth = depth;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub fn with_terminal_rules(mut self, rules: Vec<String>) -> Self {
        self.terminal_rules = rules;
        self
    }

    pub fn with_cut_point_rules(mut self, rules: Vec<String>) -> Self {
        self.cut_point_rules = rules;
        self
    }

    pub fn with_counterexample_info(mut self, enabled: bool) -> Self {
        self.counterexample_info = enabled;
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

enum Expansion {
    Continue,
    Crashed,
}

/// Drives one proof against one exclusive backend session.
pub struct Prover<B> {
    kind: ProverKind,
    explorer: Explorer<B>,
    config: ProverConfig,
}

impl<B: Backend> Prover<B> {
    pub fn new(kind: ProverKind, explorer: Explorer<B>, config: ProverConfig) -> Self {
        Self {
            kind,
            explorer,
            config,
        }
    }

    pub fn apr(explorer: Explorer<B>, config: ProverConfig) -> Self {
        Self::new(ProverKind::Apr, explorer, config)
    }

    pub fn bmc(explorer: Explorer<B>, config: ProverConfig, bound: usize) -> Self {
        Self::new(ProverKind::Bmc { bound }, explorer, config)
    }

    pub fn kind(&self) -> ProverKind {
        self.kind
    }

    pub fn explorer_mut(&mut self) -> &mut Explorer<B> {
        &mut self.explorer
    }

    /// Build the initial proof for a claim: assume definedness of the init
    /// state, then seed the graph with init and target.
    pub fn init_proof(&mut self, claim: &Claim) -> ProveResult<Proof> {
        let init = self.explorer.assume_defined(&claim.init)?;
        let graph = ProofGraph::from_claim_states(init, claim.target.clone());
        let bound = match self.kind {
            ProverKind::Bmc { bound } => Some(bound),
            ProverKind::Apr => None,
        };
        Ok(Proof::new(claim.id.clone(), graph, bound))
    }

    /// Expand frontier nodes until the proof closes, fails, runs out of
    /// budget, or is cancelled. The proof is checkpointed after every
    /// completed expansion, so a killed worker loses at most one.
    pub fn advance(&mut self, proof: &mut Proof, store: Option<&ProofStore>) -> ProveResult<ProofStatus> {
        let mut spent = 0usize;
        loop {
            if let Some(cancel) = &self.config.cancel {
                if cancel.load(Ordering::Relaxed) {
                    info!(claim = %proof.id, "cancelled between iterations");
                    return Ok(proof.status());
                }
            }
            let Some(node) = proof.graph.frontier().first().copied() else {
                break;
            };
            if let Some(max) = self.config.max_iterations {
                if spent >= max {
                    warn!(claim = %proof.id, max, "iteration budget exhausted");
                    return Ok(ProofStatus::Failed);
                }
            }
            spent += 1;
            proof.iterations += 1;
            debug!(claim = %proof.id, %node, iteration = proof.iterations, "expanding");

            if let ProverKind::Bmc { bound } = self.kind {
                if loop_bound_reached(&proof.graph, node, bound)? {
                    info!(claim = %proof.id, %node, bound, "loop recurrence bound reached");
                    proof
                        .graph
                        .mark_stuck(node, StuckReason::BmcBoundExceeded { bound })?;
                    checkpoint(store, proof)?;
                    continue;
                }
            }

            let expansion = self.expand(proof, node)?;
            checkpoint(store, proof)?;
            if let Expansion::Crashed = expansion {
                return Ok(ProofStatus::Failed);
            }
        }
        let status = proof.status();
        info!(claim = %proof.id, %status, iterations = proof.iterations, "proof settled");
        Ok(status)
    }

    fn expand(&mut self, proof: &mut Proof, node: NodeId) -> ProveResult<Expansion> {
        let state = proof.graph.node(node)?.state.clone();
        let outcome = match self.explorer.execute(
            &state,
            self.config.execute_depth,
            &self.config.terminal_rules,
            &self.config.cut_point_rules,
        ) {
            Ok(outcome) => outcome,
            Err(ExploreError::Backend(err)) => {
                return self.give_up(proof, node, err);
            }
            Err(other) => return Err(other.into()),
        };

        match outcome {
            ExecuteOutcome::Branching {
                state,
                depth,
                branches,
            } => {
                let source = if depth > 0 {
                    let mid = proof.graph.add_node(state);
                    proof.graph.add_step_edge(node, mid, depth, Vec::new())?;
                    mid
                } else {
                    node
                };
                let parts = branches
                    .into_iter()
                    .map(|branch| (branch.predicate, branch.state))
                    .collect();
                let children = proof.graph.add_split_edge(source, parts)?;
                debug!(%node, children = children.len(), "split recorded");
                Ok(Expansion::Continue)
            }
            ExecuteOutcome::DepthBound { state, depth } => {
                let leaf = insert_step(&mut proof.graph, node, state, depth, None)?;
                self.close_or_continue(proof, leaf, false)
            }
            ExecuteOutcome::CutPoint { state, depth, rule } => {
                let leaf = insert_step(&mut proof.graph, node, state, depth, Some(rule))?;
                self.close_or_continue(proof, leaf, false)
            }
            ExecuteOutcome::Terminal { state, depth, rule } => {
                let leaf = insert_step(&mut proof.graph, node, state, depth, Some(rule))?;
                self.close_or_continue(proof, leaf, true)
            }
            ExecuteOutcome::Stuck { state, depth } => {
                let leaf = insert_step(&mut proof.graph, node, state, depth, None)?;
                self.close_or_continue(proof, leaf, true)
            }
            ExecuteOutcome::Vacuous { depth } => {
                let leaf = insert_step(&mut proof.graph, node, State::bottom(), depth, None)?;
                proof.graph.mark_vacuous(leaf)?;
                debug!(%node, "path condition vacuous");
                Ok(Expansion::Continue)
            }
        }
    }

    /// Check the leaf against every target; cover into the first target it
    /// implies. Otherwise the leaf either stays on the frontier (execution
    /// can continue) or is marked stuck (execution ended here).
    fn close_or_continue(
        &mut self,
        proof: &mut Proof,
        leaf: NodeId,
        stuck_on_failure: bool,
    ) -> ProveResult<Expansion> {
        let state = proof.graph.node(leaf)?.state.clone();
        if state.is_bottom() {
            proof.graph.mark_vacuous(leaf)?;
            return Ok(Expansion::Continue);
        }
        let targets: Vec<NodeId> = proof.graph.targets().collect();
        let mut failure = String::from("no target to imply");
        for target in targets {
            let target_state = proof.graph.node(target)?.state.clone();
            match self.explorer.check_implies(&state, &target_state, false) {
                Ok(Implication::Implied) => {
                    proof.graph.add_cover_edge(leaf, target)?;
                    debug!(%leaf, %target, "leaf covered by target");
                    return Ok(Expansion::Continue);
                }
                Ok(Implication::NotImplied { reason, .. }) => failure = reason,
                Err(ExploreError::Backend(err)) => {
                    return self.give_up(proof, leaf, err);
                }
                Err(other) => return Err(other.into()),
            }
        }
        if stuck_on_failure {
            info!(%leaf, %failure, "leaf failed to imply any target");
            proof
                .graph
                .mark_stuck(leaf, StuckReason::ImplicationFailure { reason: failure })?;
        }
        Ok(Expansion::Continue)
    }

    /// Record a backend failure on the node: timeouts leave the node stuck
    /// and let the proof continue elsewhere, anything else is a crash that
    /// fails this proof (and only this proof).
    fn give_up(
        &mut self,
        proof: &mut Proof,
        node: NodeId,
        err: BackendError,
    ) -> ProveResult<Expansion> {
        if let BackendError::Timeout { attempts } = err {
            warn!(%node, attempts, "backend timed out, node is stuck");
            proof
                .graph
                .mark_stuck(node, StuckReason::SolverTimeout { attempts })?;
            return Ok(Expansion::Continue);
        }
        error!(%node, %err, "backend crashed mid-expansion");
        proof.graph.mark_stuck(
            node,
            StuckReason::BackendCrash {
                detail: err.to_string(),
            },
        )?;
        Ok(Expansion::Crashed)
    }
}

/// Insert the post-execution state as a new node behind a step edge. A
/// zero-depth execution made no progress: the node itself remains the leaf
/// under scrutiny and no edge is added.
fn insert_step(
    graph: &mut ProofGraph,
    node: NodeId,
    state: State,
    depth: usize,
    rule: Option<String>,
) -> ProveResult<NodeId> {
    if depth == 0 {
        return Ok(node);
    }
    let leaf = graph.add_node(state);
    graph.add_step_edge(node, leaf, depth, rule.into_iter().collect())?;
    Ok(leaf)
}

/// Count how often this node's loop signature already occurred on the path
/// from init. Reaching `bound` recurrences stops expansion.
fn loop_bound_reached(graph: &ProofGraph, node: NodeId, bound: usize) -> ProveResult<bool> {
    let Some(signature) = graph.node(node)?.state.loop_signature() else {
        return Ok(false);
    };
    let Some(path) = graph.path_from_init(node) else {
        return Ok(false);
    };
    let mut recurrences = 0;
    for ancestor in &path[..path.len() - 1] {
        if graph.node(*ancestor)?.state.loop_signature().as_ref() == Some(&signature) {
            recurrences += 1;
        }
    }
    Ok(recurrences >= bound)
}

fn checkpoint(store: Option<&ProofStore>, proof: &Proof) -> ProveResult<()> {
    match store {
        Some(store) => store.save(proof),
        None => Ok(()),
    }
}
