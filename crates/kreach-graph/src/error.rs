//! Error types for proof-graph operations.
//!
//! Every precondition violation is rejected synchronously and leaves the
//! graph unchanged.

use crate::graph::NodeId;
use thiserror::Error;

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// Referenced node does not exist
    #[error("no such node: {0}")]
    NodeMissing(NodeId),

    /// Node already has an outgoing edge
    #[error("node {0} already has an outgoing edge")]
    EdgeExists(NodeId),

    /// No edge between the given nodes
    #[error("no edge from {from} to {target}")]
    EdgeMissing { from: NodeId, target: NodeId },

    /// Cover would make the source reach itself through the covering node
    #[error("cover from {from} to {target} would close a cycle")]
    CoverCycle { from: NodeId, target: NodeId },

    /// The init node cannot be pruned
    #[error("cannot prune the init node {0}")]
    PruneInitNode(NodeId),

    /// Replacement state drops variables an outgoing split edge still uses
    #[error("replacement for node {node} no longer binds: {missing}")]
    ReplaceInconsistent { node: NodeId, missing: String },

    /// Status marks apply to leaves only
    #[error("node {0} is not a leaf")]
    NotALeaf(NodeId),

    /// Node is still referenced by an edge and cannot be removed directly
    #[error("node {0} is still referenced by an edge")]
    StillReferenced(NodeId),
}
