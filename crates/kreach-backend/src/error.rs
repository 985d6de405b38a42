//! Backend client errors.
//!
//! The taxonomy matters for recovery: `Connect` is fatal for the whole run
//! (no backend to talk to), `Timeout` turns the node being expanded into a
//! stuck node, everything else is a per-claim crash that must never abort a
//! batch.

use thiserror::Error;

/// Result type for backend calls
pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Error)]
pub enum BackendError {
    /// Could not establish a backend session at all
    #[error("cannot connect to backend at {addr}: {reason}")]
    Connect { addr: String, reason: String },

    /// Call timed out after the configured retries with identical inputs
    #[error("backend call timed out after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// The backend died or returned an error mid-call
    #[error("backend crash: {0}")]
    Crash(String),

    /// Malformed response for the request that was sent
    #[error("backend protocol violation: {0}")]
    Protocol(String),
}

impl BackendError {
    /// Timeouts are retried and then reported as a stuck node; everything
    /// that is not a timeout or a connect failure is handled as a crash.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Timeout { .. })
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, BackendError::Connect { .. })
    }
}
