//! Proving errors.

use kreach_explore::ExploreError;
use kreach_graph::GraphError;
use thiserror::Error;

/// Result type for proving operations
pub type ProveResult<T> = Result<T, ProveError>;

#[derive(Debug, Error)]
pub enum ProveError {
    #[error(transparent)]
    Explore(#[from] ExploreError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("proof store: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed proof record: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("no proof record for claim '{0}'")]
    UnknownProof(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("proof worker panicked: {0}")]
    Worker(String),
}

impl ProveError {
    /// Only a failure to acquire a backend session is fatal for a whole
    /// batch; every other error stays local to one claim.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProveError::Explore(ExploreError::Backend(e)) if e.is_fatal()
        )
    }
}
