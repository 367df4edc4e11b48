//! Boolean-expression DAG with structural sharing (hash-consing).
//!
//! [`Be`] is an opaque, cheaply-cloned reference into a manager-owned DAG,
//! exactly the handle spec §3 describes: "obtained only through the encoder
//! interface", never deep-copied. Equality and hashing are by a private
//! monotone id assigned at interning time, so comparing two `Be`s (as
//! `And`/`Or` operands do while canonicalizing) never re-walks the subgraph.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::time_idx::Timing;

/// Identifier of a named (leaf) variable, also its CNF variable number.
pub type VarId = u32;

#[derive(Clone, Debug)]
enum BeNode {
    True,
    False,
    Var(VarId),
    Not(Be),
    And(Be, Be),
    Or(Be, Be),
}

struct BeCell {
    id: u64,
    node: BeNode,
}

impl PartialEq for BeCell {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for BeCell {}
impl Hash for BeCell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A shared, immutable handle into the BE DAG.
#[derive(Clone)]
pub struct Be(Rc<BeCell>);

impl PartialEq for Be {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for Be {}
impl Hash for Be {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}
impl fmt::Debug for Be {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Be(#{})", self.0.id)
    }
}

impl Be {
    pub fn id(&self) -> u64 {
        self.0.id
    }

    fn node(&self) -> &BeNode {
        &self.0.node
    }

    pub fn is_true(&self) -> bool {
        matches!(self.node(), BeNode::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self.node(), BeNode::False)
    }

    /// Decompose a conjunction for contexts that can inline it (see
    /// `cnf::force_true`), `None` otherwise.
    pub(crate) fn as_and(&self) -> Option<(&Be, &Be)> {
        match self.node() {
            BeNode::And(a, b) => Some((a, b)),
            _ => None,
        }
    }

    /// Decompose a disjunction for contexts that can inline it.
    pub(crate) fn as_or(&self) -> Option<(&Be, &Be)> {
        match self.node() {
            BeNode::Or(a, b) => Some((a, b)),
            _ => None,
        }
    }

    pub(crate) fn as_not(&self) -> Option<&Be> {
        match self.node() {
            BeNode::Not(a) => Some(a),
            _ => None,
        }
    }

    pub(crate) fn as_var(&self) -> Option<VarId> {
        match self.node() {
            BeNode::Var(v) => Some(*v),
            _ => None,
        }
    }
}

/// Interning key: structurally identical nodes map to the same [`Be`].
#[derive(PartialEq, Eq, Hash)]
enum InternKey {
    True,
    False,
    Var(VarId),
    Not(u64),
    And(u64, u64),
    Or(u64, u64),
}

/// Owns the BE DAG and the named-variable table (spec §3's "State-Vars
/// Registry" reads through this for `var_at`; the registry itself only
/// tracks *which* names participate, not their BE handles).
pub struct BeManager {
    interner: HashMap<InternKey, Be>,
    next_id: u64,
    next_var: VarId,
    truth: Be,
    falsity: Be,
    var_names: HashMap<VarId, (String, Timing)>,
    name_index: HashMap<(String, Timing), VarId>,
    state_vars: std::collections::HashSet<String>,
    input_vars: std::collections::HashSet<String>,
    frozen_vars: std::collections::HashSet<String>,
}

impl BeManager {
    pub fn new() -> Self {
        let mut interner = HashMap::new();
        let mut next_id = 0u64;
        let truth = Self::intern_fresh(&mut interner, &mut next_id, InternKey::True, BeNode::True);
        let falsity =
            Self::intern_fresh(&mut interner, &mut next_id, InternKey::False, BeNode::False);
        BeManager {
            interner,
            next_id,
            next_var: 1,
            truth,
            falsity,
            var_names: HashMap::new(),
            name_index: HashMap::new(),
            state_vars: std::collections::HashSet::new(),
            input_vars: std::collections::HashSet::new(),
            frozen_vars: std::collections::HashSet::new(),
        }
    }

    fn intern_fresh(
        interner: &mut HashMap<InternKey, Be>,
        next_id: &mut u64,
        key: InternKey,
        node: BeNode,
    ) -> Be {
        let id = *next_id;
        *next_id += 1;
        let be = Be(Rc::new(BeCell { id, node }));
        interner.insert(key, be.clone());
        be
    }

    fn intern(&mut self, key: InternKey, node: BeNode) -> Be {
        if let Some(existing) = self.interner.get(&key) {
            return existing.clone();
        }
        let id = self.next_id;
        self.next_id += 1;
        let be = Be(Rc::new(BeCell { id, node }));
        self.interner.insert(key, be.clone());
        be
    }

    pub fn truth(&self) -> Be {
        self.truth.clone()
    }

    pub fn falsity(&self) -> Be {
        self.falsity.clone()
    }

    pub fn not(&mut self, a: &Be) -> Be {
        match a.node() {
            BeNode::True => self.falsity(),
            BeNode::False => self.truth(),
            BeNode::Not(inner) => inner.clone(),
            _ => self.intern(InternKey::Not(a.id()), BeNode::Not(a.clone())),
        }
    }

    pub fn and(&mut self, a: &Be, b: &Be) -> Be {
        if a.is_false() || b.is_false() {
            return self.falsity();
        }
        if a.is_true() {
            return b.clone();
        }
        if b.is_true() {
            return a.clone();
        }
        if a == b {
            return a.clone();
        }
        let (lo, hi) = if a.id() <= b.id() {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        self.intern(InternKey::And(lo.id(), hi.id()), BeNode::And(lo, hi))
    }

    pub fn or(&mut self, a: &Be, b: &Be) -> Be {
        if a.is_true() || b.is_true() {
            return self.truth();
        }
        if a.is_false() {
            return b.clone();
        }
        if b.is_false() {
            return a.clone();
        }
        if a == b {
            return a.clone();
        }
        let (lo, hi) = if a.id() <= b.id() {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        self.intern(InternKey::Or(lo.id(), hi.id()), BeNode::Or(lo, hi))
    }

    pub fn implies(&mut self, a: &Be, b: &Be) -> Be {
        let not_a = self.not(a);
        self.or(&not_a, b)
    }

    pub fn iff(&mut self, a: &Be, b: &Be) -> Be {
        let fwd = self.implies(a, b);
        let bwd = self.implies(b, a);
        self.and(&fwd, &bwd)
    }

    pub fn ite(&mut self, c: &Be, t: &Be, e: &Be) -> Be {
        let then_branch = self.implies(c, t);
        let not_c = self.not(c);
        let else_branch = self.implies(&not_c, e);
        self.and(&then_branch, &else_branch)
    }

    pub fn xor(&mut self, a: &Be, b: &Be) -> Be {
        let n = self.iff(a, b);
        self.not(&n)
    }

    /// Look up or allocate the BE variable for `(name, timing)`. The same
    /// pair always returns the same handle (spec §3 registry invariant:
    /// "no name is added twice").
    pub fn var_at(&mut self, name: &str, timing: Timing) -> Be {
        let key = (name.to_string(), timing);
        if let Some(&id) = self.name_index.get(&key) {
            return self.interner[&InternKey::Var(id)].clone();
        }
        let id = self.next_var;
        self.next_var += 1;
        let be = self.intern(InternKey::Var(id), BeNode::Var(id));
        self.var_names.insert(id, key.clone());
        self.name_index.insert(key, id);
        be
    }

    pub fn declare_state_var(&mut self, name: &str) {
        self.state_vars.insert(name.to_string());
    }

    pub fn undeclare_state_var(&mut self, name: &str) {
        self.state_vars.remove(name);
    }

    pub fn declare_input_var(&mut self, name: &str) {
        self.input_vars.insert(name.to_string());
    }

    pub fn declare_frozen_var(&mut self, name: &str) {
        self.frozen_vars.insert(name.to_string());
    }

    pub fn is_state_var(&self, name: &str) -> bool {
        self.state_vars.contains(name)
    }

    pub fn is_input_var(&self, name: &str) -> bool {
        self.input_vars.contains(name)
    }

    pub fn is_frozen_var(&self, name: &str) -> bool {
        self.frozen_vars.contains(name)
    }

    pub fn var_to_index(&self, be: &Be) -> Option<VarId> {
        be.as_var()
    }

    pub fn index_to_name(&self, id: VarId) -> Option<&str> {
        self.var_names.get(&id).map(|(n, _)| n.as_str())
    }

    pub fn index_to_time(&self, id: VarId) -> Option<Timing> {
        self.var_names.get(&id).map(|(_, t)| *t)
    }

    /// Next free CNF variable number, so the Tseitin layer can allocate
    /// auxiliary variables from the same numbering space without collision.
    pub(crate) fn reserve_cnf_var(&mut self) -> VarId {
        let id = self.next_var;
        self.next_var += 1;
        id
    }

    pub fn dump(&self, be: &Be) -> String {
        self.dump_rec(be)
    }

    fn dump_rec(&self, be: &Be) -> String {
        match be.node() {
            BeNode::True => "TRUE".to_string(),
            BeNode::False => "FALSE".to_string(),
            BeNode::Var(v) => match self.var_names.get(v) {
                Some((name, timing)) => format!("{}@{}", name, timing),
                None => format!("v{}", v),
            },
            BeNode::Not(a) => format!("!{}", self.dump_rec(a)),
            BeNode::And(a, b) => format!("({} & {})", self.dump_rec(a), self.dump_rec(b)),
            BeNode::Or(a, b) => format!("({} | {})", self.dump_rec(a), self.dump_rec(b)),
        }
    }
}

impl Default for BeManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_sharing() {
        let mut m = BeManager::new();
        let p = m.var_at("p", Timing::Untimed);
        let q = m.var_at("q", Timing::Untimed);
        let a = m.and(&p, &q);
        let b = m.and(&p, &q);
        assert_eq!(a, b, "identical subterms must share the same Be");
    }

    #[test]
    fn double_negation_cancels() {
        let mut m = BeManager::new();
        let p = m.var_at("p", Timing::Untimed);
        let np = m.not(&p);
        let nnp = m.not(&np);
        assert_eq!(p, nnp);
    }

    #[test]
    fn true_false_absorb() {
        let mut m = BeManager::new();
        let p = m.var_at("p", Timing::Untimed);
        let t = m.truth();
        let f = m.falsity();
        assert_eq!(m.and(&p, &t), p);
        assert_eq!(m.and(&p, &f), f);
        assert_eq!(m.or(&p, &t), t);
        assert_eq!(m.or(&p, &f), p);
    }

    #[test]
    fn var_at_is_idempotent() {
        let mut m = BeManager::new();
        let a = m.var_at("s", Timing::Untimed);
        let b = m.var_at("s", Timing::Untimed);
        assert_eq!(a, b);
    }
}
