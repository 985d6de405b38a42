//! Symbolic states: a configuration plus ordered path constraints.

use crate::term::{Renaming, Term};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A symbolic program state.
///
/// The constraint list is ordered and conjunctive: the state denotes every
/// concrete state matching `config` under all constraints. Constraint
/// simplification happens backend-side; locally a state is only inspected
/// syntactically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub config: Term,
    pub constraints: Vec<Term>,
}

impl State {
    pub fn new(config: Term) -> Self {
        Self {
            config,
            constraints: Vec::new(),
        }
    }

    pub fn with_constraints(config: Term, constraints: Vec<Term>) -> Self {
        Self {
            config,
            constraints,
        }
    }

    /// The empty state, denoting no concrete states.
    pub fn bottom() -> Self {
        Self {
            config: Term::symbol("#Bottom"),
            constraints: vec![Term::Bool(false)],
        }
    }

    /// A state is bottom when the backend has collapsed it to the empty
    /// denotation: the `#Bottom` marker configuration or a literal `false`
    /// constraint.
    pub fn is_bottom(&self) -> bool {
        self.config == Term::symbol("#Bottom")
            || self.constraints.contains(&Term::Bool(false))
    }

    /// Append a constraint, skipping syntactic duplicates and literal `true`.
    pub fn add_constraint(&mut self, constraint: Term) {
        if constraint == Term::Bool(true) || self.constraints.contains(&constraint) {
            return;
        }
        self.constraints.push(constraint);
    }

    /// The definedness side condition for this state's configuration. The
    /// backend resolves it into concrete constraints (or bottom) during
    /// simplification.
    pub fn defined_predicate(&self) -> Term {
        Term::app("#Defined", vec![self.config.clone()])
    }

    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut vars = self.config.free_vars();
        for constraint in &self.constraints {
            vars.extend(constraint.free_vars());
        }
        vars
    }

    /// Configuration equality up to consistent variable renaming.
    /// Constraints are not compared; merge compatibility only requires the
    /// configurations to coincide.
    pub fn config_alpha_eq(&self, other: &State) -> Option<Renaming> {
        self.config.alpha_eq(&other.config)
    }

    /// Conjoin this state's constraints into a single predicate term.
    pub fn constraint_conjunction(&self) -> Term {
        match self.constraints.as_slice() {
            [] => Term::Bool(true),
            [single] => single.clone(),
            many => Term::app("andBool", many.to_vec()),
        }
    }

    /// The loop signature of this state, if its configuration exposes one.
    pub fn loop_signature(&self) -> Option<LoopSignature> {
        let Term::App { args, .. } = &self.config else {
            return None;
        };
        let point = args.first()?.head().to_string();
        let call_depth = args.iter().find_map(|arg| match arg {
            Term::App { label, args } if label == "callDepth" => match args.first() {
                Some(Term::Int(depth)) => Some(depth.clone()),
                _ => None,
            },
            _ => None,
        });
        Some(LoopSignature { point, call_depth })
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.config)?;
        for constraint in &self.constraints {
            write!(f, " #And {}", constraint)?;
        }
        Ok(())
    }
}

/// Projection of a configuration identifying a program location and call
/// depth. Two states on the same path sharing a signature are treated as
/// successive iterations of one loop by the BMC prover. Metadata only; no
/// soundness invariant depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoopSignature {
    pub point: String,
    pub call_depth: Option<BigInt>,
}

impl fmt::Display for LoopSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.call_depth {
            Some(depth) => write!(f, "{}@{}", self.point, depth),
            None => write!(f, "{}", self.point),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loop_state(counter: i64) -> State {
        State::new(Term::app(
            "pgm",
            vec![
                Term::app("while", vec![Term::var("B")]),
                Term::app("callDepth", vec![Term::int(0)]),
                Term::app("env", vec![Term::int(counter)]),
            ],
        ))
    }

    #[test]
    fn test_bottom_detection() {
        assert!(State::bottom().is_bottom());
        let mut s = State::new(Term::symbol("ok"));
        assert!(!s.is_bottom());
        s.add_constraint(Term::Bool(false));
        assert!(s.is_bottom());
    }

    #[test]
    fn test_add_constraint_dedupes() {
        let mut s = State::new(Term::symbol("ok"));
        let c = Term::app("<", vec![Term::var("X"), Term::int(3)]);
        s.add_constraint(c.clone());
        s.add_constraint(c.clone());
        s.add_constraint(Term::Bool(true));
        assert_eq!(s.constraints, vec![c]);
    }

    #[test]
    fn test_constraint_conjunction() {
        let mut s = State::new(Term::symbol("ok"));
        assert_eq!(s.constraint_conjunction(), Term::Bool(true));
        let c1 = Term::app(">", vec![Term::var("X"), Term::int(0)]);
        s.add_constraint(c1.clone());
        assert_eq!(s.constraint_conjunction(), c1);
        let c2 = Term::app("<", vec![Term::var("X"), Term::int(9)]);
        s.add_constraint(c2.clone());
        assert_eq!(s.constraint_conjunction(), Term::app("andBool", vec![c1, c2]));
    }

    #[test]
    fn test_loop_signature_stable_across_iterations() {
        let a = loop_state(0).loop_signature().unwrap();
        let b = loop_state(17).loop_signature().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.point, "while");
        assert_eq!(a.call_depth, Some(0.into()));
        assert_eq!(a.to_string(), "while@0");
    }

    #[test]
    fn test_loop_signature_absent_on_atoms() {
        assert!(State::new(Term::var("X")).loop_signature().is_none());
        assert!(State::new(Term::symbol("done")).loop_signature().is_none());
    }

    #[test]
    fn test_defined_predicate_wraps_config() {
        let s = State::new(Term::symbol("cfg"));
        assert_eq!(
            s.defined_predicate(),
            Term::app("#Defined", vec![Term::symbol("cfg")])
        );
    }
}
