//! The encoder façade (spec §6.1): the BE DAG, the named/timed variable
//! table, and CNF conversion bundled behind the single interface C4–C8 are
//! allowed to call. Nothing outside this module ever touches a `BeNode` or
//! a raw CNF variable number.

pub mod be;
pub mod cnf;

use std::collections::HashSet;

use crate::time_idx::{TimeIdx, Timing};

pub use be::{Be, VarId};
pub use cnf::{Clause, Lit};

use be::BeManager;
use cnf::CnfEncoder;

/// A scoped batch of freshly-declared state variables (spec §6.1
/// `fresh_layer`/`add_boolean_state_var`/`commit`/`remove`). Used by callers
/// that need to register a set of auxiliary booleans as a unit and be able
/// to unwind the registration on an aborted run (spec §5, §9 "scoped
/// resources").
pub struct Layer {
    name: String,
    position: usize,
    pending: Vec<String>,
}

impl Layer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

pub struct Encoder {
    be: BeManager,
    cnf: CnfEncoder,
}

impl Encoder {
    pub fn new() -> Self {
        Encoder {
            be: BeManager::new(),
            cnf: CnfEncoder::new(),
        }
    }

    pub fn var_at(&mut self, name: &str, time: TimeIdx) -> Be {
        self.be.var_at(name, Timing::At(time))
    }

    pub fn var_untimed(&mut self, name: &str) -> Be {
        self.be.var_at(name, Timing::Untimed)
    }

    pub fn var_to_index(&self, be: &Be) -> Option<VarId> {
        self.be.var_to_index(be)
    }

    pub fn index_to_name(&self, id: VarId) -> Option<&str> {
        self.be.index_to_name(id)
    }

    pub fn index_to_time(&self, id: VarId) -> Option<Timing> {
        self.be.index_to_time(id)
    }

    pub fn is_input_var(&self, name: &str) -> bool {
        self.be.is_input_var(name)
    }

    pub fn is_state_var(&self, name: &str) -> bool {
        self.be.is_state_var(name)
    }

    pub fn is_frozen_var(&self, name: &str) -> bool {
        self.be.is_frozen_var(name)
    }

    pub fn declare_state_var(&mut self, name: &str) {
        self.be.declare_state_var(name);
    }

    pub fn declare_input_var(&mut self, name: &str) {
        self.be.declare_input_var(name);
    }

    pub fn declare_frozen_var(&mut self, name: &str) {
        self.be.declare_frozen_var(name);
    }

    pub fn truth(&self) -> Be {
        self.be.truth()
    }

    pub fn falsity(&self) -> Be {
        self.be.falsity()
    }

    pub fn not(&mut self, a: &Be) -> Be {
        self.be.not(a)
    }

    pub fn and(&mut self, a: &Be, b: &Be) -> Be {
        self.be.and(a, b)
    }

    pub fn or(&mut self, a: &Be, b: &Be) -> Be {
        self.be.or(a, b)
    }

    pub fn implies(&mut self, a: &Be, b: &Be) -> Be {
        self.be.implies(a, b)
    }

    pub fn iff(&mut self, a: &Be, b: &Be) -> Be {
        self.be.iff(a, b)
    }

    pub fn ite(&mut self, c: &Be, t: &Be, e: &Be) -> Be {
        self.be.ite(c, t, e)
    }

    pub fn xor(&mut self, a: &Be, b: &Be) -> Be {
        self.be.xor(a, b)
    }

    pub fn and_many(&mut self, terms: impl IntoIterator<Item = Be>) -> Be {
        let mut acc = self.truth();
        for t in terms {
            acc = self.and(&acc, &t);
        }
        acc
    }

    pub fn dump(&self, be: &Be) -> String {
        self.be.dump(be)
    }

    /// Literal for `be`, allocating a Tseitin variable (and its defining
    /// clauses) the first time a compound node is seen.
    pub fn cnf_literal(&mut self, be: &Be) -> Lit {
        self.cnf.literal_for(&mut self.be, be)
    }

    /// Convert to CNF with safe inlining and return the unit literals that
    /// assert `be` true; any newly-created Tseitin definitions are drained
    /// separately via [`Encoder::drain_definitions`] and belong in the
    /// permanent group regardless of which group `be`'s assertion targets.
    pub fn force_true(&mut self, be: &Be) -> Vec<Lit> {
        self.cnf.force_true(&mut self.be, be)
    }

    pub fn force_false(&mut self, be: &Be) -> Vec<Lit> {
        self.cnf.force_false(&mut self.be, be)
    }

    pub fn drain_definitions(&mut self) -> Vec<Clause> {
        self.cnf.drain_definitions()
    }

    pub fn fresh_layer(&mut self, name: &str, position: usize) -> Layer {
        Layer {
            name: name.to_string(),
            position,
            pending: Vec::new(),
        }
    }

    pub fn add_boolean_state_var(&mut self, layer: &mut Layer, name: &str) -> Be {
        self.be.declare_state_var(name);
        layer.pending.push(name.to_string());
        self.be.var_at(name, Timing::Untimed)
    }

    /// Keep the variables a layer registered; the layer's bookkeeping is
    /// dropped, the declarations stay.
    pub fn commit(&mut self, layer: Layer) {
        drop(layer);
    }

    /// Undo a layer's state-var declarations (spec §5/§9: released on any
    /// exit path, including an aborted run). The underlying BE handles stay
    /// interned — only the "is a state var" classification is withdrawn, so
    /// a later re-declaration of the same name is safe.
    pub fn remove(&mut self, layer: Layer) {
        let mut seen = HashSet::new();
        for name in layer.pending {
            if seen.insert(name.clone()) {
                self.be.undeclare_state_var(&name);
            }
        }
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_remove_withdraws_state_var_classification() {
        let mut enc = Encoder::new();
        let mut layer = enc.fresh_layer("loop-vars", 0);
        enc.add_boolean_state_var(&mut layer, "aux_0");
        assert!(enc.is_state_var("aux_0"));
        enc.remove(layer);
        assert!(!enc.is_state_var("aux_0"));
    }

    #[test]
    fn layer_commit_keeps_declarations() {
        let mut enc = Encoder::new();
        let mut layer = enc.fresh_layer("loop-vars", 0);
        enc.add_boolean_state_var(&mut layer, "aux_0");
        enc.commit(layer);
        assert!(enc.is_state_var("aux_0"));
    }

    #[test]
    fn force_true_and_drain_round_trip() {
        let mut enc = Encoder::new();
        let p = enc.var_at("p", TimeIdx::real(0));
        let q = enc.var_at("q", TimeIdx::real(0));
        let conj = enc.and(&p, &q);
        let units = enc.force_true(&conj);
        assert_eq!(units.len(), 2);
        assert!(enc.drain_definitions().is_empty());
    }
}
