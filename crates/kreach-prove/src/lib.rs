//! Provers: drive a proof graph to completion against the backend.
//!
//! One [`Proof`] exists per claim. The [`Prover`] expands its graph until
//! every frontier state is covered by the target or reported as a genuine
//! failure; the bounded-model-checking variant additionally cuts off loop
//! recurrences at a configured bound so proofs over non-terminating specs
//! still finish. Proofs are checkpointed through the [`ProofStore`] after
//! every expansion, and independent claims run in parallel through
//! [`prove_batch`], one exclusive backend session per worker.

mod batch;
mod error;
mod proof;
mod prover;
mod report;
mod store;

pub use batch::{prove_batch, ClaimOutcome};
pub use error::{ProveError, ProveResult};
pub use proof::{Claim, Proof, ProofStatus};
pub use prover::{Prover, ProverConfig, ProverKind};
pub use report::{FailureReport, StuckNodeReport};
pub use store::ProofStore;
