//! Exploration and editing errors.

use kreach_backend::BackendError;
use kreach_graph::{GraphError, NodeId};
use thiserror::Error;

/// Result type for exploration operations
pub type ExploreResult<T> = Result<T, ExploreError>;

#[derive(Debug, Error)]
pub enum ExploreError {
    /// The claim's initial state simplifies to bottom; the claim itself is
    /// malformed and cannot be proved or refuted.
    #[error("initial state is undefined: definedness constraints simplify to bottom")]
    UndefinedInitialState,

    /// Nodes violate a merge precondition
    #[error("cannot merge: {0}")]
    MergeIncompatible(String),

    /// A step edge is shorter than the requested number of sections
    #[error("edge has depth {depth}, cannot section into {sections} parts")]
    SectionTooShort { depth: usize, sections: usize },

    /// Forced stepping did not advance exactly as requested
    #[error("step from node {node} produced {actual} steps, expected {requested}")]
    StepMismatch {
        node: NodeId,
        requested: usize,
        actual: usize,
    },

    /// Forced stepping hit a branch point
    #[error("step from node {node} branched; section at the branch instead")]
    StepBranched { node: NodeId },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}
