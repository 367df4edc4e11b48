//! CNF conversion with polarity-aware inlining (spec §4.6's "safe inlining").
//!
//! A node's Tseitin variable and bidirectional defining clauses, once
//! emitted, are a fact about the shared DAG, not about whichever call site
//! asked for them first — so they are cached forever and conceptually belong
//! to the *permanent* clause set regardless of which group the caller is
//! currently pushing into. [`CnfEncoder::force_true`]/[`force_false`]
//! additionally avoid allocating a Tseitin variable at all in the two cases
//! where it is never needed:
//! - asserting a conjunction true is exactly asserting both conjuncts true
//!   (no shared variable is corrupted by splitting it — it only ever adds
//!   more constraints);
//! - a negation's literal is just the negation of its child's literal, no
//!   defining clause needed.
//!
//! `force_true`/`force_false` return the list of *unit* literals the caller
//! must add to whichever clause group is currently active; the defining
//! clauses for any newly-Tseitin'd subterm are drained separately via
//! [`CnfEncoder::drain_definitions`] and always belong in the permanent
//! group.

use std::collections::HashMap;

use super::be::{Be, BeManager, VarId};

/// A DIMACS-style literal: positive variable id, or its negation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Lit {
    var: VarId,
    negated: bool,
}

impl Lit {
    pub fn pos(var: VarId) -> Self {
        Lit { var, negated: false }
    }

    pub fn neg(var: VarId) -> Self {
        Lit {
            var,
            negated: true,
        }
    }

    pub fn negate(self) -> Self {
        Lit {
            var: self.var,
            negated: !self.negated,
        }
    }

    pub fn var(self) -> VarId {
        self.var
    }

    pub fn is_negated(self) -> bool {
        self.negated
    }

    /// `i32` DIMACS encoding (positive/negative variable number), the
    /// boundary format `varisat::Lit::from_dimacs` consumes.
    pub fn to_dimacs(self) -> i32 {
        let v = self.var as i32;
        if self.negated {
            -v
        } else {
            v
        }
    }
}

pub type Clause = Vec<Lit>;

pub struct CnfEncoder {
    cache: HashMap<u64, Lit>,
    true_lit: Option<Lit>,
    false_lit: Option<Lit>,
    pending_definitions: Vec<Clause>,
}

impl CnfEncoder {
    pub fn new() -> Self {
        CnfEncoder {
            cache: HashMap::new(),
            true_lit: None,
            false_lit: None,
            pending_definitions: Vec::new(),
        }
    }

    /// Permanent-group clauses produced as a side effect of literal
    /// allocation since the last drain. Must be added to the permanent
    /// group before the unit clauses `force_true`/`force_false` return.
    pub fn drain_definitions(&mut self) -> Vec<Clause> {
        std::mem::take(&mut self.pending_definitions)
    }

    fn true_lit(&mut self, mgr: &mut BeManager) -> Lit {
        if let Some(l) = self.true_lit {
            return l;
        }
        let v = mgr.reserve_cnf_var();
        let l = Lit::pos(v);
        self.pending_definitions.push(vec![l]);
        self.true_lit = Some(l);
        l
    }

    fn false_lit(&mut self, mgr: &mut BeManager) -> Lit {
        if let Some(l) = self.false_lit {
            return l;
        }
        let v = mgr.reserve_cnf_var();
        let l = Lit::pos(v);
        self.pending_definitions.push(vec![l.negate()]);
        self.false_lit = Some(l);
        l
    }

    /// Literal representing `be` positively; allocates and caches a Tseitin
    /// variable (with both-direction defining clauses) for compound nodes
    /// that have not been seen before.
    pub fn literal_for(&mut self, mgr: &mut BeManager, be: &Be) -> Lit {
        if let Some(v) = be.as_var() {
            return Lit::pos(v);
        }
        if be.is_true() {
            return self.true_lit(mgr);
        }
        if be.is_false() {
            return self.false_lit(mgr);
        }
        if let Some(inner) = be.as_not() {
            let inner_lit = self.literal_for(mgr, inner);
            return inner_lit.negate();
        }
        if let Some(lit) = self.cache.get(&be.id()) {
            return *lit;
        }

        let lit = if let Some((a, b)) = be.as_and() {
            let (a, b) = (a.clone(), b.clone());
            let la = self.literal_for(mgr, &a);
            let lb = self.literal_for(mgr, &b);
            let v = mgr.reserve_cnf_var();
            let lv = Lit::pos(v);
            // v <=> (la & lb)
            self.pending_definitions.push(vec![lv.negate(), la]);
            self.pending_definitions.push(vec![lv.negate(), lb]);
            self.pending_definitions
                .push(vec![lv, la.negate(), lb.negate()]);
            lv
        } else if let Some((a, b)) = be.as_or() {
            let (a, b) = (a.clone(), b.clone());
            let la = self.literal_for(mgr, &a);
            let lb = self.literal_for(mgr, &b);
            let v = mgr.reserve_cnf_var();
            let lv = Lit::pos(v);
            // v <=> (la | lb)
            self.pending_definitions.push(vec![lv.negate(), la, lb]);
            self.pending_definitions.push(vec![lv, la.negate()]);
            self.pending_definitions.push(vec![lv, lb.negate()]);
            lv
        } else {
            unreachable!("BE node kind not covered by literal_for")
        };

        self.cache.insert(be.id(), lit);
        lit
    }

    /// Unit literals to add (each its own singleton clause) to assert `be`
    /// true in the caller's current group.
    pub fn force_true(&mut self, mgr: &mut BeManager, be: &Be) -> Vec<Lit> {
        if be.is_true() {
            return Vec::new();
        }
        if let Some((a, b)) = be.as_and() {
            let (a, b) = (a.clone(), b.clone());
            let mut out = self.force_true(mgr, &a);
            out.extend(self.force_true(mgr, &b));
            return out;
        }
        if let Some(inner) = be.as_not() {
            return self.force_false(mgr, inner);
        }
        vec![self.literal_for(mgr, be)]
    }

    /// Unit literals to add to assert `be` false in the caller's current
    /// group (De Morgan dual of `force_true`).
    pub fn force_false(&mut self, mgr: &mut BeManager, be: &Be) -> Vec<Lit> {
        if be.is_false() {
            return Vec::new();
        }
        if let Some((a, b)) = be.as_or() {
            let (a, b) = (a.clone(), b.clone());
            let mut out = self.force_false(mgr, &a);
            out.extend(self.force_false(mgr, &b));
            return out;
        }
        if let Some(inner) = be.as_not() {
            return self.force_true(mgr, inner);
        }
        vec![self.literal_for(mgr, be).negate()]
    }
}

impl Default for CnfEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_idx::Timing;

    #[test]
    fn and_inlines_without_new_clauses_beyond_children() {
        let mut mgr = BeManager::new();
        let mut cnf = CnfEncoder::new();
        let p = mgr.var_at("p", Timing::Untimed);
        let q = mgr.var_at("q", Timing::Untimed);
        let conj = mgr.and(&p, &q);
        let units = cnf.force_true(&mut mgr, &conj);
        assert_eq!(units.len(), 2, "AND inlines into two unit literals");
        assert!(cnf.drain_definitions().is_empty());
    }

    #[test]
    fn not_never_allocates_a_tseitin_var() {
        let mut mgr = BeManager::new();
        let mut cnf = CnfEncoder::new();
        let p = mgr.var_at("p", Timing::Untimed);
        let np = mgr.not(&p);
        let lit = cnf.literal_for(&mut mgr, &np);
        assert_eq!(lit.var(), p.as_var().unwrap());
        assert!(lit.is_negated());
        assert!(cnf.drain_definitions().is_empty());
    }

    #[test]
    fn or_allocates_one_tseitin_var_with_three_defining_clauses() {
        let mut mgr = BeManager::new();
        let mut cnf = CnfEncoder::new();
        let p = mgr.var_at("p", Timing::Untimed);
        let q = mgr.var_at("q", Timing::Untimed);
        let disj = mgr.or(&p, &q);
        let _lit = cnf.literal_for(&mut mgr, &disj);
        let defs = cnf.drain_definitions();
        assert_eq!(defs.len(), 3);
    }

    #[test]
    fn repeated_literal_for_reuses_cache() {
        let mut mgr = BeManager::new();
        let mut cnf = CnfEncoder::new();
        let p = mgr.var_at("p", Timing::Untimed);
        let q = mgr.var_at("q", Timing::Untimed);
        let disj = mgr.or(&p, &q);
        let l1 = cnf.literal_for(&mut mgr, &disj);
        let _ = cnf.drain_definitions();
        let l2 = cnf.literal_for(&mut mgr, &disj);
        assert_eq!(l1, l2);
        assert!(cnf.drain_definitions().is_empty(), "second lookup must not redefine");
    }
}
