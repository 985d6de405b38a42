//! Symbolic terms and states for reachability proofs.
//!
//! A claim relates two symbolic states, each a structured configuration
//! plus an ordered list of path-constraint predicates. The proving engine
//! never interprets these terms itself; they are shuttled to the rewrite/SMT
//! backend, which owns their semantics. This crate only provides the
//! syntactic operations the engine needs locally: free-variable collection,
//! equality up to variable renaming, and the loop-signature projection used
//! by bounded model checking.

mod state;
mod term;

pub use state::{LoopSignature, State};
pub use term::{Renaming, Term};
