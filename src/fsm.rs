//! FSM interface (spec §6.2, consumed/out-of-scope in the original but
//! needed here as a concrete collaborator so the driver and the seed
//! scenarios have something to run against).
//!
//! [`Fsm`] is the trait C5 and the driver call through; [`ExplicitFsm`] is
//! a small table-driven implementation sufficient for the seed scenarios of
//! spec §8 and for property-based tests over tiny random FSMs.

use crate::encoder::{Be, Encoder};
use crate::time_idx::TimeIdx;

pub trait Fsm {
    /// `init_predicate(time_idx) → BE` (spec §6.2).
    fn init_predicate(&self, enc: &mut Encoder, time: TimeIdx) -> Be;

    /// `transition(from_time_idx, to_time_idx) → BE`.
    fn transition(&self, enc: &mut Encoder, from: TimeIdx, to: TimeIdx) -> Be;

    /// `fairness_list() → List<BE>`, each conjunct conjoined as `G F p_i`
    /// during pre-processing (owned by the caller, not this trait).
    fn fairness_list(&self, enc: &mut Encoder, time: TimeIdx) -> Vec<Be>;

    /// Names of the FSM's own state variables (feeds
    /// `transition_state_vars` in the registry).
    fn state_var_names(&self) -> &[String];

    fn input_var_names(&self) -> &[String] {
        &[]
    }
}

/// A next-state relation given as a disjunction of explicit per-variable
/// update rules: `next_var = f(current state)`. Good enough to express
/// every seed scenario in spec §8 without a BDD or symbolic package.
pub struct ExplicitFsm {
    state_vars: Vec<String>,
    input_vars: Vec<String>,
    /// Conjunction of literals true in every initial state, as `(name,
    /// value)` pairs.
    init: Vec<(String, bool)>,
    /// One closure per state variable computing its next value from the
    /// current named assignment; used only to describe `transition` via
    /// the caller-supplied BE builder below, so this struct stores the
    /// transition as a BE-builder closure instead of evaluating concrete
    /// booleans.
    transition_fn: Box<dyn Fn(&mut Encoder, TimeIdx, TimeIdx) -> Be>,
    fairness_fn: Box<dyn Fn(&mut Encoder, TimeIdx) -> Vec<Be>>,
}

impl ExplicitFsm {
    pub fn new(
        state_vars: Vec<String>,
        input_vars: Vec<String>,
        init: Vec<(String, bool)>,
        transition_fn: impl Fn(&mut Encoder, TimeIdx, TimeIdx) -> Be + 'static,
        fairness_fn: impl Fn(&mut Encoder, TimeIdx) -> Vec<Be> + 'static,
    ) -> Self {
        ExplicitFsm {
            state_vars,
            input_vars,
            init,
            transition_fn: Box::new(transition_fn),
            fairness_fn: Box::new(fairness_fn),
        }
    }

    /// A two-state counter `s ∈ {0,1}`, `s' = ¬s`, `init s=0` (seed scenario
    /// #1/#2/#5).
    pub fn toggling_counter() -> Self {
        ExplicitFsm::new(
            vec!["s".to_string()],
            vec![],
            vec![("s".to_string(), false)],
            |enc, from, to| {
                let s_from = enc.var_at("s", from);
                let s_to = enc.var_at("s", to);
                enc.xor(&s_from, &s_to)
            },
            |_, _| vec![],
        )
    }

    /// A bit that can stutter: `s ∈ {0,1}`, `s' ∈ {s, ¬s}` (seed scenario #3).
    pub fn stuttering_bit() -> Self {
        ExplicitFsm::new(
            vec!["s".to_string()],
            vec![],
            vec![("s".to_string(), false)],
            |enc, _from, _to| enc.truth(),
            |_, _| vec![],
        )
    }

    pub fn init_literals(&self) -> &[(String, bool)] {
        &self.init
    }
}

impl Fsm for ExplicitFsm {
    fn init_predicate(&self, enc: &mut Encoder, time: TimeIdx) -> Be {
        let mut acc = enc.truth();
        for (name, value) in &self.init {
            let v = enc.var_at(name, time);
            let lit = if *value { v } else { enc.not(&v) };
            acc = enc.and(&acc, &lit);
        }
        acc
    }

    fn transition(&self, enc: &mut Encoder, from: TimeIdx, to: TimeIdx) -> Be {
        (self.transition_fn)(enc, from, to)
    }

    fn fairness_list(&self, enc: &mut Encoder, time: TimeIdx) -> Vec<Be> {
        (self.fairness_fn)(enc, time)
    }

    fn state_var_names(&self) -> &[String] {
        &self.state_vars
    }

    fn input_var_names(&self) -> &[String] {
        &self.input_vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_counter_init_fixes_s_false() {
        let fsm = ExplicitFsm::toggling_counter();
        let mut enc = Encoder::new();
        let init = fsm.init_predicate(&mut enc, TimeIdx::real(0));
        let s0 = enc.var_at("s", TimeIdx::real(0));
        let not_s0 = enc.not(&s0);
        assert_eq!(init, not_s0);
    }

    #[test]
    fn toggling_counter_transition_is_xor() {
        let fsm = ExplicitFsm::toggling_counter();
        let mut enc = Encoder::new();
        let t = fsm.transition(&mut enc, TimeIdx::real(0), TimeIdx::real(1));
        let s0 = enc.var_at("s", TimeIdx::real(0));
        let s1 = enc.var_at("s", TimeIdx::real(1));
        assert_eq!(t, enc.xor(&s0, &s1));
    }
}
