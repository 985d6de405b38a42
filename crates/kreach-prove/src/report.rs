//! Structured failure reporting for non-passing proofs.
//!
//! Every failed claim gets a reason a human can act on: the pending nodes
//! the budget never reached, and each stuck node with its failure text
//! and, on request, a counterexample model from the backend.

use crate::proof::Proof;
use kreach_backend::{Backend, Model};
use kreach_explore::Explorer;
use kreach_graph::NodeId;
use std::fmt;
use tracing::warn;

/// One stuck node with its reason and optional counterexample.
#[derive(Debug, Clone)]
pub struct StuckNodeReport {
    pub node: NodeId,
    pub reason: String,
    pub model: Option<Model>,
}

/// Why a proof did not pass.
#[derive(Debug, Clone)]
pub struct FailureReport {
    pub claim: String,
    pub pending: Vec<NodeId>,
    pub stuck: Vec<StuckNodeReport>,
}

impl FailureReport {
    /// Collect the report from a settled proof. Counterexample models are
    /// fetched per stuck node when `counterexample_info` is set; a backend
    /// refusal only drops the model, never the report.
    pub fn collect<B: Backend>(
        proof: &Proof,
        explorer: &mut Explorer<B>,
        counterexample_info: bool,
    ) -> Self {
        let mut stuck = Vec::new();
        for (node, reason) in proof.graph.stuck() {
            let model = if counterexample_info {
                match proof.graph.node(node) {
                    Ok(n) => explorer.counterexample(&n.state).unwrap_or_else(|err| {
                        warn!(%node, %err, "could not fetch counterexample model");
                        None
                    }),
                    Err(_) => None,
                }
            } else {
                None
            };
            stuck.push(StuckNodeReport {
                node,
                reason: reason.to_string(),
                model,
            });
        }
        Self {
            claim: proof.id.clone(),
            pending: proof.graph.pending(),
            stuck,
        }
    }

    pub fn failure_count(&self) -> usize {
        self.pending.len() + self.stuck.len()
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} failure nodes ({} pending, {} stuck)",
            self.claim,
            self.failure_count(),
            self.pending.len(),
            self.stuck.len()
        )?;
        if !self.pending.is_empty() {
            writeln!(f, "Pending nodes:")?;
            for node in &self.pending {
                writeln!(f, "  {}", node)?;
            }
        }
        for report in &self.stuck {
            writeln!(f, "Stuck node {}:", report.node)?;
            writeln!(f, "  Failure reason:")?;
            writeln!(f, "    {}", report.reason)?;
            if let Some(model) = &report.model {
                writeln!(f, "  Model:")?;
                write!(f, "{}", model)?;
            }
        }
        Ok(())
    }
}
