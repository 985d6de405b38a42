//! Client for the symbolic-execution/SMT backend service.
//!
//! The backend owns rewriting and implication semantics; this crate owns
//! nothing but the four-operation protocol (`execute`, `simplify`,
//! `implies`, `get-model`) and a connection-per-session client with
//! per-call timeout and bounded retry. The [`Backend`] trait seams the
//! transport so tests run against the scripted [`MockBackend`] instead of
//! a live service.

mod client;
mod error;
pub mod mock;
mod protocol;

pub use client::{Backend, BackendConfig, RpcBackend};
pub use error::{BackendError, BackendResult};
pub use mock::MockBackend;
pub use protocol::{Branch, ExecuteOutcome, ImpliesOutcome, Model, ModelOutcome};
