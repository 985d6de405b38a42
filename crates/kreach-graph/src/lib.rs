//! The proof graph: the node/edge store behind every reachability proof.
//!
//! One graph exists per claim. Nodes hold symbolic states; edges record how
//! exploration related them: a step edge for concrete rewriting, a split
//! edge for an exhaustive case partition, a cover edge for subsumption into
//! an existing node. The prover and the graph editor are the only mutators;
//! frontier/stuck status is derived from topology (plus explicit marks), not
//! stored per node.

mod error;
mod graph;

pub use error::{GraphError, GraphResult};
pub use graph::{Edge, Node, NodeId, ProofGraph, SplitBranch, StuckReason};
