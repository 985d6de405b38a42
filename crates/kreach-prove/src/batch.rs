//! Parallel proving of independent claims.
//!
//! Claims share no mutable state, so they run as a fixed-size worker pool:
//! a semaphore caps concurrency, each admitted claim gets a fresh,
//! exclusive backend session from the factory and runs its (blocking)
//! prover loop on a blocking thread. Failure to open a session aborts the
//! whole run (there is nothing to prove without a backend), while every
//! per-claim error becomes that claim's Failed outcome. Connections are
//! dropped with their prover on every exit path, panics included.

use crate::error::{ProveError, ProveResult};
use crate::proof::{Proof, ProofStatus};
use crate::prover::{Prover, ProverConfig, ProverKind};
use crate::report::FailureReport;
use crate::store::ProofStore;
use crate::Claim;
use kreach_backend::{Backend, BackendResult};
use kreach_explore::Explorer;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

/// How one claim's proof attempt ended.
#[derive(Debug)]
pub struct ClaimOutcome {
    pub status: ProofStatus,
    /// Structured failure detail for non-passing proofs.
    pub report: Option<FailureReport>,
    /// Claim-level error (malformed claim, worker failure) when the proof
    /// never settled.
    pub error: Option<String>,
}

impl ClaimOutcome {
    pub fn passed(&self) -> bool {
        self.status.passed()
    }

    fn from_error(err: &ProveError) -> Self {
        Self {
            status: ProofStatus::Failed,
            report: None,
            error: Some(err.to_string()),
        }
    }
}

/// Prove a batch of claims on `workers` parallel workers. Returns one
/// outcome per claim id, in claim-id order.
pub async fn prove_batch<B, F>(
    claims: Vec<Claim>,
    kind: ProverKind,
    config: ProverConfig,
    workers: usize,
    store: Option<ProofStore>,
    backend_factory: F,
) -> ProveResult<BTreeMap<String, ClaimOutcome>>
where
    B: Backend + 'static,
    F: Fn() -> BackendResult<B> + Send + Sync + 'static,
{
    if workers == 0 {
        return Err(ProveError::InvalidConfig(
            "at least one worker is required".to_string(),
        ));
    }
    info!(claims = claims.len(), workers, ?kind, "starting proof batch");

    let semaphore = Arc::new(Semaphore::new(workers));
    let factory = Arc::new(backend_factory);
    let mut handles = Vec::with_capacity(claims.len());
    for claim in claims {
        let semaphore = Arc::clone(&semaphore);
        let factory = Arc::clone(&factory);
        let config = config.clone();
        let store = store.clone();
        let id = claim.id.clone();
        let handle = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("batch semaphore is never closed");
            match tokio::task::spawn_blocking(move || {
                prove_one(claim, kind, config, store.as_ref(), &*factory)
            })
            .await
            {
                Ok(result) => result,
                Err(join) => Err(ProveError::Worker(join.to_string())),
            }
        });
        handles.push((id, handle));
    }

    let mut outcomes = BTreeMap::new();
    for (id, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(join) => Err(ProveError::Worker(join.to_string())),
        };
        match result {
            Ok(outcome) => {
                outcomes.insert(id, outcome);
            }
            Err(err) if err.is_fatal() => {
                error!(claim = %id, %err, "fatal backend failure, aborting batch");
                return Err(err);
            }
            Err(err) => {
                error!(claim = %id, %err, "claim failed without settling");
                outcomes.insert(id, ClaimOutcome::from_error(&err));
            }
        }
    }
    let failed = outcomes.values().filter(|o| !o.passed()).count();
    info!(total = outcomes.len(), failed, "proof batch finished");
    Ok(outcomes)
}

/// Run one claim to completion against a fresh backend session. Resumes
/// from a persisted record when the store already has one.
fn prove_one<B, F>(
    claim: Claim,
    kind: ProverKind,
    config: ProverConfig,
    store: Option<&ProofStore>,
    factory: &F,
) -> ProveResult<ClaimOutcome>
where
    B: Backend,
    F: Fn() -> BackendResult<B>,
{
    let backend = factory().map_err(kreach_explore::ExploreError::from)?;
    let counterexample_info = config.counterexample_info;
    let mut prover = Prover::new(kind, Explorer::new(backend), config);

    let mut proof: Proof = match store {
        Some(store) if store.contains(&claim.id) => {
            info!(claim = %claim.id, "resuming persisted proof");
            store.load(&claim.id)?
        }
        _ => prover.init_proof(&claim)?,
    };
    if let Some(store) = store {
        store.save(&proof)?;
    }

    let status = prover.advance(&mut proof, store)?;
    let report = if status.passed() {
        None
    } else {
        Some(FailureReport::collect(
            &proof,
            prover.explorer_mut(),
            counterexample_info,
        ))
    };
    Ok(ClaimOutcome {
        status,
        report,
        error: None,
    })
}
