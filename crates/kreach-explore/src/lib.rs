//! Claim-aware exploration over the backend, plus graph editing.
//!
//! The [`Explorer`] owns a scoped backend handle for the lifetime of one
//! proof session and wraps the raw protocol with the operations the
//! provers and the operator surface actually need: definedness assumption,
//! simplify-and-replace, implication with a failure reason, forced
//! stepping and edge sectioning. The [`editor`] module hosts the editing
//! operations that need no backend at all (merge, prune).

pub mod editor;
mod error;
mod explorer;

pub use error::{ExploreError, ExploreResult};
pub use explorer::{Explorer, Implication};
