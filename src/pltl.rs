//! Full past-time LTL formula AST, already negation-normal-form by
//! construction: negation only ever appears on [`Formula::Atom`].
//!
//! Future operators: `X` (next), `F` (eventually), `G` (globally), `U`
//! (until), `R` (release). Past operators: `Y` (previously), `Z`
//! (not-previously-not), `O` (once), `H` (historically), `S` (since), `T`
//! (triggered). See GLOSSARY.

use std::rc::Rc;

/// A PLTL formula, NNF by construction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Formula {
    True,
    False,
    /// A named propositional atom, or its negation.
    Atom { name: Rc<str>, negated: bool },
    And(Rc<Formula>, Rc<Formula>),
    Or(Rc<Formula>, Rc<Formula>),
    Next(Rc<Formula>),
    Eventually(Rc<Formula>),
    Globally(Rc<Formula>),
    Until(Rc<Formula>, Rc<Formula>),
    Release(Rc<Formula>, Rc<Formula>),
    Previously(Rc<Formula>),
    NotPrevNotPrev(Rc<Formula>),
    Once(Rc<Formula>),
    Historically(Rc<Formula>),
    Since(Rc<Formula>, Rc<Formula>),
    Triggered(Rc<Formula>, Rc<Formula>),
}

impl Formula {
    pub fn atom(name: impl Into<Rc<str>>) -> Rc<Formula> {
        Rc::new(Formula::Atom {
            name: name.into(),
            negated: false,
        })
    }

    pub fn not_atom(name: impl Into<Rc<str>>) -> Rc<Formula> {
        Rc::new(Formula::Atom {
            name: name.into(),
            negated: true,
        })
    }

    pub fn and(a: Rc<Formula>, b: Rc<Formula>) -> Rc<Formula> {
        Rc::new(Formula::And(a, b))
    }

    pub fn or(a: Rc<Formula>, b: Rc<Formula>) -> Rc<Formula> {
        Rc::new(Formula::Or(a, b))
    }

    pub fn globally(a: Rc<Formula>) -> Rc<Formula> {
        Rc::new(Formula::Globally(a))
    }

    pub fn eventually(a: Rc<Formula>) -> Rc<Formula> {
        Rc::new(Formula::Eventually(a))
    }

    pub fn next(a: Rc<Formula>) -> Rc<Formula> {
        Rc::new(Formula::Next(a))
    }

    pub fn once(a: Rc<Formula>) -> Rc<Formula> {
        Rc::new(Formula::Once(a))
    }

    /// The direct children, in the order the tableau's worklist traversal
    /// must visit them (left before right where both exist).
    pub fn children(&self) -> Vec<&Rc<Formula>> {
        match self {
            Formula::True | Formula::False | Formula::Atom { .. } => vec![],
            Formula::Next(a)
            | Formula::Eventually(a)
            | Formula::Globally(a)
            | Formula::Previously(a)
            | Formula::NotPrevNotPrev(a)
            | Formula::Once(a)
            | Formula::Historically(a) => vec![a],
            Formula::And(a, b)
            | Formula::Or(a, b)
            | Formula::Until(a, b)
            | Formula::Release(a, b)
            | Formula::Since(a, b)
            | Formula::Triggered(a, b) => vec![a, b],
        }
    }

    pub fn is_future_eventuality(&self) -> bool {
        matches!(self, Formula::Eventually(_) | Formula::Until(..))
    }

    pub fn is_future_universal(&self) -> bool {
        matches!(self, Formula::Globally(_) | Formula::Release(..))
    }

    pub fn is_past(&self) -> bool {
        matches!(
            self,
            Formula::Previously(_)
                | Formula::NotPrevNotPrev(_)
                | Formula::Once(_)
                | Formula::Historically(_)
                | Formula::Since(..)
                | Formula::Triggered(..)
        )
    }
}

/// Push `¬` through `f` and return the NNF result; the driver negates the
/// caller's property once, up front, since C4 only ever sees an
/// already-negated formula (spec §4.2.1).
pub fn negate(f: &Rc<Formula>) -> Rc<Formula> {
    match &**f {
        Formula::True => Rc::new(Formula::False),
        Formula::False => Rc::new(Formula::True),
        Formula::Atom { name, negated } => Rc::new(Formula::Atom {
            name: name.clone(),
            negated: !negated,
        }),
        Formula::And(a, b) => Formula::or(negate(a), negate(b)),
        Formula::Or(a, b) => Formula::and(negate(a), negate(b)),
        Formula::Next(a) => Formula::next(negate(a)),
        Formula::Eventually(a) => Formula::globally(negate(a)),
        Formula::Globally(a) => Formula::eventually(negate(a)),
        Formula::Until(a, b) => Rc::new(Formula::Release(negate(a), negate(b))),
        Formula::Release(a, b) => Rc::new(Formula::Until(negate(a), negate(b))),
        Formula::Previously(a) => Rc::new(Formula::NotPrevNotPrev(negate(a))),
        Formula::NotPrevNotPrev(a) => Rc::new(Formula::Previously(negate(a))),
        Formula::Once(a) => Rc::new(Formula::Historically(negate(a))),
        Formula::Historically(a) => Rc::new(Formula::Once(negate(a))),
        Formula::Since(a, b) => Rc::new(Formula::Triggered(negate(a), negate(b))),
        Formula::Triggered(a, b) => Rc::new(Formula::Since(negate(a), negate(b))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_arity_matches_operator() {
        let p = Formula::atom("p");
        let q = Formula::atom("q");
        assert_eq!(Formula::globally(p.clone()).children().len(), 1);
        assert_eq!(Formula::and(p, q).children().len(), 2);
        assert!(Formula::True.children().is_empty());
    }

    #[test]
    fn classification_helpers() {
        let p = Formula::atom("p");
        assert!(Formula::eventually(p.clone()).is_future_eventuality());
        assert!(Formula::globally(p.clone()).is_future_universal());
        assert!(Formula::once(p).is_past());
    }

    #[test]
    fn negate_globally_is_eventually_of_negated_atom() {
        let phi = Formula::globally(Formula::atom("p"));
        let neg = negate(&phi);
        match &*neg {
            Formula::Eventually(child) => match &**child {
                Formula::Atom { negated, .. } => assert!(negated),
                _ => panic!("expected atom"),
            },
            _ => panic!("expected Eventually"),
        }
    }

    #[test]
    fn negate_is_involutive_on_until() {
        let phi = Formula::and(Formula::atom("p"), Formula::atom("q"));
        let double = negate(&negate(&phi));
        assert_eq!(double, phi);
    }
}
