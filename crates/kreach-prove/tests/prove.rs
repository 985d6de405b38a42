//! End-to-end proving against the scripted backend, through the persisted
//! store.

use kreach_backend::{ExecuteOutcome, ImpliesOutcome, MockBackend};
use kreach_core::{State, Term};
use kreach_explore::Explorer;
use kreach_prove::{
    prove_batch, Claim, Proof, ProofStatus, ProofStore, Prover, ProverConfig, ProverKind,
};
use tempfile::tempdir;

fn state(tag: &str) -> State {
    State::new(Term::symbol(tag))
}

#[tokio::test]
async fn test_batch_checkpoints_records_per_claim() {
    let dir = tempdir().unwrap();
    let store = ProofStore::new(dir.path());
    let claims = vec![
        Claim::new("pass.trivial", state("same"), state("same")),
        Claim::new("fail.unreachable", state("init"), state("target")),
    ];
    let outcomes = prove_batch(
        claims,
        ProverKind::Apr,
        ProverConfig::default(),
        2,
        Some(store.clone()),
        || Ok(MockBackend::new()),
    )
    .await
    .unwrap();

    assert!(outcomes["pass.trivial"].passed());
    assert!(!outcomes["fail.unreachable"].passed());

    // both graphs persisted and reload to the same verdicts
    assert_eq!(
        store.list().unwrap(),
        vec!["fail.unreachable", "pass.trivial"]
    );
    let passed = store.load("pass.trivial").unwrap();
    assert_eq!(passed.status(), ProofStatus::Proven);
    assert_eq!(passed.graph.node_count(), 1);
    let failed = store.load("fail.unreachable").unwrap();
    assert_eq!(failed.status(), ProofStatus::Failed);
    assert_eq!(failed.graph.stuck().count(), 1);
}

#[tokio::test]
async fn test_resume_continues_a_pending_record() {
    let dir = tempdir().unwrap();
    let store = ProofStore::new(dir.path());

    // first run stops on its iteration budget with a live frontier
    let claims = vec![Claim::new("slow.loop", state("init"), state("target"))];
    let outcomes = prove_batch(
        claims.clone(),
        ProverKind::Apr,
        ProverConfig::default().with_max_iterations(1),
        1,
        Some(store.clone()),
        || {
            Ok(MockBackend::new().expect_execute(ExecuteOutcome::DepthBound {
                state: state("mid"),
                depth: 50,
            }))
        },
    )
    .await
    .unwrap();
    assert_eq!(outcomes["slow.loop"].status, ProofStatus::Failed);
    let parked = store.load("slow.loop").unwrap();
    assert_eq!(parked.status(), ProofStatus::Pending);
    assert_eq!(parked.iterations, 1);

    // second run resumes the same record instead of reinitializing: the
    // frontier node is `mid`, and covering it closes the proof
    let outcomes = prove_batch(
        claims,
        ProverKind::Apr,
        ProverConfig::default(),
        1,
        Some(store.clone()),
        || {
            Ok(MockBackend::new()
                .expect_execute(ExecuteOutcome::Terminal {
                    state: state("end"),
                    depth: 3,
                    rule: "halt".into(),
                })
                .expect_implies(ImpliesOutcome::Implied))
        },
    )
    .await
    .unwrap();
    assert!(outcomes["slow.loop"].passed());
    let finished = store.load("slow.loop").unwrap();
    assert_eq!(finished.status(), ProofStatus::Proven);
    assert_eq!(finished.iterations, 2);
}

#[test]
fn test_checkpoint_survives_abandoned_run() {
    // the prover checkpoints after every expansion: a run that dies after
    // one expansion leaves a loadable record one step ahead
    let dir = tempdir().unwrap();
    let store = ProofStore::new(dir.path());
    let mock = MockBackend::new()
        .expect_simplify(state("init"))
        .expect_execute(ExecuteOutcome::DepthBound {
            state: state("mid"),
            depth: 10,
        });
    let mut prover = Prover::apr(
        Explorer::new(mock),
        ProverConfig::default().with_max_iterations(1),
    );
    let claim = Claim::new("crashy", state("init"), state("target"));
    let mut proof = prover.init_proof(&claim).unwrap();
    store.save(&proof).unwrap();

    let status = prover.advance(&mut proof, Some(&store)).unwrap();
    assert_eq!(status, ProofStatus::Failed); // budget, not settled

    let recovered: Proof = store.load("crashy").unwrap();
    assert_eq!(recovered.graph.node_count(), 3);
    assert_eq!(recovered.iterations, 1);
    assert_eq!(recovered.graph.frontier().len(), 1);
}

#[tokio::test]
async fn test_bmc_batch_reports_bound_exceeded() {
    fn looping(i: i64) -> State {
        State::new(Term::app(
            "pgm",
            vec![
                Term::app("while", vec![Term::var("C")]),
                Term::app("env", vec![Term::int(i)]),
            ],
        ))
    }
    let claims = vec![Claim::new("loop.forever", looping(0), state("target"))];
    let outcomes = prove_batch(
        claims,
        ProverKind::Bmc { bound: 3 },
        ProverConfig::default(),
        1,
        None,
        || {
            Ok(MockBackend::new()
                .expect_execute(ExecuteOutcome::DepthBound { state: looping(1), depth: 7 })
                .expect_execute(ExecuteOutcome::DepthBound { state: looping(2), depth: 7 })
                .expect_execute(ExecuteOutcome::DepthBound { state: looping(3), depth: 7 }))
        },
    )
    .await
    .unwrap();

    let outcome = &outcomes["loop.forever"];
    assert_eq!(outcome.status, ProofStatus::Failed);
    let report = outcome.report.as_ref().unwrap();
    assert_eq!(report.stuck.len(), 1);
    assert!(report.stuck[0].reason.contains("bmc-bound-exceeded"));
}
