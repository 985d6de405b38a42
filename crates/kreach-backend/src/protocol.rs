//! Wire types for the backend protocol.
//!
//! Requests and responses travel as newline-delimited JSON-RPC 2.0, one
//! message per line. The payload shapes below are the whole contract this
//! engine has with the backend; transport details beyond that are the
//! backend's business.

use kreach_core::{State, Term};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Error code the backend uses for an SMT solver timeout. Calls failing
/// with this code are retried with identical inputs.
pub const SMT_TIMEOUT_CODE: i64 = -32002;

#[derive(Debug, Serialize)]
pub(crate) struct Request<P> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    pub params: P,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Response<R> {
    #[allow(dead_code)]
    pub id: u64,
    pub result: Option<R>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExecuteParams<'a> {
    pub state: &'a State,
    pub max_depth: usize,
    pub terminal_rules: &'a [String],
    pub cut_point_rules: &'a [String],
}

#[derive(Debug, Serialize)]
pub(crate) struct SimplifyParams<'a> {
    pub state: &'a State,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImpliesParams<'a> {
    pub antecedent: &'a State,
    pub consequent: &'a State,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SimplifyResult {
    pub state: State,
}

/// One branch of a backend-proposed case partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub predicate: Term,
    pub state: State,
}

/// How a backend execution stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum ExecuteOutcome {
    /// Ran out of depth budget with rewriting still possible.
    DepthBound { state: State, depth: usize },
    /// A terminal rule applied; the state is a leaf candidate.
    Terminal {
        state: State,
        depth: usize,
        rule: String,
    },
    /// A cut-point rule applied; execution stopped early for branching or
    /// manual continuation.
    CutPoint {
        state: State,
        depth: usize,
        rule: String,
    },
    /// The backend proposed multiple next states with branch predicates.
    Branching {
        state: State,
        depth: usize,
        branches: Vec<Branch>,
    },
    /// No rule applies to the state.
    Stuck { state: State, depth: usize },
    /// The path condition became unsatisfiable during execution.
    Vacuous { depth: usize },
}

impl ExecuteOutcome {
    /// Rewrite steps actually taken before stopping.
    pub fn depth(&self) -> usize {
        match self {
            ExecuteOutcome::DepthBound { depth, .. }
            | ExecuteOutcome::Terminal { depth, .. }
            | ExecuteOutcome::CutPoint { depth, .. }
            | ExecuteOutcome::Branching { depth, .. }
            | ExecuteOutcome::Stuck { depth, .. }
            | ExecuteOutcome::Vacuous { depth } => *depth,
        }
    }

    /// The rule that ended execution, for terminal and cut-point stops.
    pub fn rule(&self) -> Option<&str> {
        match self {
            ExecuteOutcome::Terminal { rule, .. } | ExecuteOutcome::CutPoint { rule, .. } => {
                Some(rule)
            }
            _ => None,
        }
    }
}

/// Result of an implication (subset-of-denoted-states) check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "kebab-case")]
pub enum ImpliesOutcome {
    Implied,
    NotImplied { reason: String },
}

impl ImpliesOutcome {
    pub fn is_implied(&self) -> bool {
        matches!(self, ImpliesOutcome::Implied)
    }
}

/// A satisfying assignment for a state's path constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub assignments: BTreeMap<String, Term>,
}

impl Model {
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.assignments.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.assignments {
            writeln!(f, "  {} = {}", name, value)?;
        }
        Ok(())
    }
}

/// Result of a model query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "kebab-case")]
pub enum ModelOutcome {
    Model { model: Model },
    Unsat,
    Unknown { reason: String },
}
