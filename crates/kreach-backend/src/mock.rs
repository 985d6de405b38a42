//! Scripted in-memory backend for tests.
//!
//! Responses are queued per operation; when a queue is empty the mock
//! falls back to conservative syntactic defaults (execution is stuck,
//! simplification resolves definedness markers and keeps everything else,
//! implication holds only for equal states, no model). Call counts are
//! recorded so tests can assert on
//! traffic, e.g. that a timed-out call was retried the configured number
//! of times.

use crate::client::Backend;
use crate::error::{BackendError, BackendResult};
use crate::protocol::{ExecuteOutcome, ImpliesOutcome, Model, ModelOutcome};
use kreach_core::State;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Number of calls per operation, shared with the test that built the mock.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub execute: AtomicU32,
    pub simplify: AtomicU32,
    pub implies: AtomicU32,
    pub get_model: AtomicU32,
}

#[derive(Default)]
pub struct MockBackend {
    execute: VecDeque<BackendResult<ExecuteOutcome>>,
    simplify: VecDeque<BackendResult<State>>,
    implies: VecDeque<BackendResult<ImpliesOutcome>>,
    models: VecDeque<BackendResult<ModelOutcome>>,
    calls: Arc<CallCounts>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the per-operation call counters.
    pub fn calls(&self) -> Arc<CallCounts> {
        Arc::clone(&self.calls)
    }

    pub fn expect_execute(mut self, outcome: ExecuteOutcome) -> Self {
        self.execute.push_back(Ok(outcome));
        self
    }

    pub fn fail_execute(mut self, error: BackendError) -> Self {
        self.execute.push_back(Err(error));
        self
    }

    pub fn expect_simplify(mut self, state: State) -> Self {
        self.simplify.push_back(Ok(state));
        self
    }

    pub fn fail_simplify(mut self, error: BackendError) -> Self {
        self.simplify.push_back(Err(error));
        self
    }

    pub fn expect_implies(mut self, outcome: ImpliesOutcome) -> Self {
        self.implies.push_back(Ok(outcome));
        self
    }

    pub fn expect_model(mut self, model: Model) -> Self {
        self.models.push_back(Ok(ModelOutcome::Model { model }));
        self
    }

    pub fn expect_model_outcome(mut self, outcome: ModelOutcome) -> Self {
        self.models.push_back(Ok(outcome));
        self
    }
}

impl Backend for MockBackend {
    fn execute(
        &mut self,
        state: &State,
        _max_depth: usize,
        _terminal_rules: &[String],
        _cut_point_rules: &[String],
    ) -> BackendResult<ExecuteOutcome> {
        self.calls.execute.fetch_add(1, Ordering::Relaxed);
        self.execute.pop_front().unwrap_or_else(|| {
            Ok(ExecuteOutcome::Stuck {
                state: state.clone(),
                depth: 0,
            })
        })
    }

    fn simplify(&mut self, state: &State) -> BackendResult<State> {
        self.calls.simplify.fetch_add(1, Ordering::Relaxed);
        self.simplify.pop_front().unwrap_or_else(|| {
            // default semantics: every state is trivially defined, so
            // definedness markers resolve away; everything else is kept
            let mut resolved = state.clone();
            resolved.constraints.retain(|c| c.head() != "#Defined");
            Ok(resolved)
        })
    }

    fn implies(
        &mut self,
        antecedent: &State,
        consequent: &State,
    ) -> BackendResult<ImpliesOutcome> {
        self.calls.implies.fetch_add(1, Ordering::Relaxed);
        self.implies.pop_front().unwrap_or_else(|| {
            if antecedent == consequent {
                Ok(ImpliesOutcome::Implied)
            } else {
                Ok(ImpliesOutcome::NotImplied {
                    reason: format!("{} does not imply {}", antecedent, consequent),
                })
            }
        })
    }

    fn get_model(&mut self, _state: &State) -> BackendResult<ModelOutcome> {
        self.calls.get_model.fetch_add(1, Ordering::Relaxed);
        self.models.pop_front().unwrap_or_else(|| {
            Ok(ModelOutcome::Unknown {
                reason: "no model scripted".to_string(),
            })
        })
    }
}
