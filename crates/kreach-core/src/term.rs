//! Structured configuration terms.
//!
//! Terms are uninterpreted here: labels mean whatever the backend's rewrite
//! theory says they mean. The engine needs exactly three syntactic
//! operations over them (free variables, consistent-renaming equality, and
//! renaming application), all defined in this module.

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A variable renaming, as extracted by [`Term::alpha_eq`].
pub type Renaming = BTreeMap<String, String>;

/// A symbolic configuration term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    /// Free variable
    Var(String),
    /// Integer literal
    Int(BigInt),
    /// Boolean literal
    Bool(bool),
    /// String literal
    Str(String),
    /// Labeled application, `label(args...)`
    App { label: String, args: Vec<Term> },
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }

    pub fn int(value: impl Into<BigInt>) -> Self {
        Term::Int(value.into())
    }

    pub fn app(label: impl Into<String>, args: Vec<Term>) -> Self {
        Term::App {
            label: label.into(),
            args,
        }
    }

    /// Nullary application, used for rule labels and markers.
    pub fn symbol(label: impl Into<String>) -> Self {
        Term::app(label, Vec::new())
    }

    /// The head label of this term: the application label, or a canonical
    /// tag for atoms. Used by loop-signature projection.
    pub fn head(&self) -> &str {
        match self {
            Term::Var(name) => name,
            Term::Int(_) => "#int",
            Term::Bool(_) => "#bool",
            Term::Str(_) => "#str",
            Term::App { label, .. } => label,
        }
    }

    /// All free variables, in name order.
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, vars: &mut BTreeSet<String>) {
        match self {
            Term::Var(name) => {
                vars.insert(name.clone());
            }
            Term::Int(_) | Term::Bool(_) | Term::Str(_) => {}
            Term::App { args, .. } => {
                for arg in args {
                    arg.collect_vars(vars);
                }
            }
        }
    }

    /// Structural equality up to a consistent, bijective variable renaming.
    ///
    /// Returns the renaming mapping `self`'s variables onto `other`'s when
    /// the terms match, `None` otherwise. A variable must map to the same
    /// counterpart at every occurrence, and two distinct variables may not
    /// collapse onto one.
    pub fn alpha_eq(&self, other: &Term) -> Option<Renaming> {
        let mut forward = Renaming::new();
        let mut taken = BTreeSet::new();
        if self.alpha_eq_under(other, &mut forward, &mut taken) {
            Some(forward)
        } else {
            None
        }
    }

    fn alpha_eq_under(
        &self,
        other: &Term,
        forward: &mut Renaming,
        taken: &mut BTreeSet<String>,
    ) -> bool {
        match (self, other) {
            (Term::Var(a), Term::Var(b)) => match forward.get(a) {
                Some(mapped) => mapped == b,
                None => {
                    if taken.contains(b) {
                        return false;
                    }
                    forward.insert(a.clone(), b.clone());
                    taken.insert(b.clone());
                    true
                }
            },
            (Term::Int(a), Term::Int(b)) => a == b,
            (Term::Bool(a), Term::Bool(b)) => a == b,
            (Term::Str(a), Term::Str(b)) => a == b,
            (
                Term::App { label: la, args: aa },
                Term::App { label: lb, args: ab },
            ) => {
                la == lb
                    && aa.len() == ab.len()
                    && aa
                        .iter()
                        .zip(ab)
                        .all(|(x, y)| x.alpha_eq_under(y, forward, taken))
            }
            _ => false,
        }
    }

    /// Apply a renaming. Variables not in the map are left unchanged.
    pub fn rename(&self, renaming: &Renaming) -> Term {
        match self {
            Term::Var(name) => match renaming.get(name) {
                Some(new) => Term::Var(new.clone()),
                None => self.clone(),
            },
            Term::Int(_) | Term::Bool(_) | Term::Str(_) => self.clone(),
            Term::App { label, args } => Term::App {
                label: label.clone(),
                args: args.iter().map(|arg| arg.rename(renaming)).collect(),
            },
        }
    }

    /// Logical negation of a predicate term.
    pub fn negate(&self) -> Term {
        match self {
            Term::Bool(b) => Term::Bool(!b),
            Term::App { label, args } if label == "notBool" && args.len() == 1 => {
                args[0].clone()
            }
            _ => Term::app("notBool", vec![self.clone()]),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(name) => write!(f, "{}", name),
            Term::Int(i) => write!(f, "{}", i),
            Term::Bool(b) => write!(f, "{}", b),
            Term::Str(s) => write!(f, "{:?}", s),
            Term::App { label, args } => {
                if args.is_empty() {
                    return write!(f, "{}", label);
                }
                write!(f, "{}(", label)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(lhs: Term, rhs: Term) -> Term {
        Term::app("==", vec![lhs, rhs])
    }

    #[test]
    fn test_free_vars() {
        let t = Term::app(
            "add",
            vec![Term::var("X"), Term::app("mul", vec![Term::var("Y"), Term::int(2)])],
        );
        let vars = t.free_vars();
        assert_eq!(
            vars.into_iter().collect::<Vec<_>>(),
            vec!["X".to_string(), "Y".to_string()]
        );
    }

    #[test]
    fn test_alpha_eq_renames_consistently() {
        let a = eq(Term::var("X"), Term::var("X"));
        let b = eq(Term::var("Y"), Term::var("Y"));
        let renaming = a.alpha_eq(&b).unwrap();
        assert_eq!(renaming.get("X"), Some(&"Y".to_string()));
    }

    #[test]
    fn test_alpha_eq_rejects_inconsistent_renaming() {
        // X used twice cannot map to two different variables
        let a = eq(Term::var("X"), Term::var("X"));
        let b = eq(Term::var("Y"), Term::var("Z"));
        assert!(a.alpha_eq(&b).is_none());
    }

    #[test]
    fn test_alpha_eq_rejects_variable_collapse() {
        // Distinct X, Y cannot both map onto Z
        let a = eq(Term::var("X"), Term::var("Y"));
        let b = eq(Term::var("Z"), Term::var("Z"));
        assert!(a.alpha_eq(&b).is_none());
    }

    #[test]
    fn test_alpha_eq_rejects_label_mismatch() {
        let a = Term::app("foo", vec![Term::var("X")]);
        let b = Term::app("bar", vec![Term::var("X")]);
        assert!(a.alpha_eq(&b).is_none());
    }

    #[test]
    fn test_rename_roundtrip() {
        let a = eq(Term::var("X"), Term::int(1));
        let b = eq(Term::var("V0"), Term::int(1));
        let renaming = a.alpha_eq(&b).unwrap();
        assert_eq!(a.rename(&renaming), b);
    }

    #[test]
    fn test_negate_removes_double_negation() {
        let p = Term::app("<", vec![Term::var("X"), Term::int(10)]);
        let np = p.negate();
        assert_eq!(np.negate(), p);
        assert_eq!(Term::Bool(true).negate(), Term::Bool(false));
    }

    #[test]
    fn test_display() {
        let t = Term::app("==", vec![Term::var("X"), Term::int(42)]);
        assert_eq!(t.to_string(), "==(X, 42)");
        assert_eq!(Term::symbol("#halt").to_string(), "#halt");
    }

    #[test]
    fn test_serde_roundtrip() {
        let t = Term::app("pc", vec![Term::int(7), Term::var("Gas")]);
        let json = serde_json::to_string(&t).unwrap();
        let back: Term = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
