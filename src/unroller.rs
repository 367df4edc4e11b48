//! Incremental Unroller (C5): emits, for a new bound, exactly the missing
//! slice of each constraint family (spec §4.3), using the zigzag cursor
//! `(prev_k, current_k)` to never touch an index already unrolled.

use std::rc::Rc;

use crate::encoder::{Be, Encoder, Lit};
use crate::formula_info::FormulaInfoMap;
use crate::fsm::Fsm;
use crate::pltl::Formula;
use crate::registry::StateVarsRegistry;
use crate::tableau::TableauBuilder;
use crate::time_idx::TimeIdx;

const SENTINEL: i64 = -2;

/// `(prev_k, current_k)`, spec §3's Zigzag Cursor.
pub struct Unroller {
    prev_k: i64,
}

impl Unroller {
    pub fn new() -> Self {
        Unroller { prev_k: SENTINEL }
    }

    pub fn prev_k(&self) -> i64 {
        self.prev_k
    }

    fn in_loop_name() -> &'static str {
        "InLoop"
    }

    pub fn in_loop_at(enc: &mut Encoder, time: TimeIdx) -> Be {
        enc.var_at(Self::in_loop_name(), time)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn unroll(
        &mut self,
        enc: &mut Encoder,
        info: &mut FormulaInfoMap,
        reg: &StateVarsRegistry,
        tableau: &mut TableauBuilder,
        fsm: &dyn Fsm,
        root: &Rc<Formula>,
        current_k: u32,
    ) -> Vec<Lit> {
        let prev_k = self.prev_k;
        let mut clauses: Vec<Lit> = Vec::new();
        let order = tableau.order.clone();

        // 1. state vector extension
        let lo1 = (prev_k + 2).max(0) as u32;
        for i in lo1..=current_k + 1 {
            for f in &order {
                let pd = info.get(f).map(|x| x.past_depth).unwrap_or(0);
                for d in 0..=pd {
                    tableau.materialize(enc, info, reg, f, TimeIdx::real(i), d);
                }
            }
        }

        // 2. transition relation
        let lo2 = prev_k.max(0) as u32;
        for i in lo2..current_k {
            let t = fsm.transition(enc, TimeIdx::real(i), TimeIdx::real(i + 1));
            clauses.extend(enc.force_true(&t));
        }

        let lo3 = (prev_k + 1).max(0) as u32;

        // 3. loop-selector semantics
        for i in lo3..=current_k {
            if i == 0 {
                let l0 = enc.var_at(reg.l_var(), TimeIdx::real(0));
                let falsity = enc.falsity();
                let eq = enc.iff(&l0, &falsity);
                clauses.extend(enc.force_true(&eq));
            } else {
                let l_i = enc.var_at(reg.l_var(), TimeIdx::real(i));
                let equal_states = Self::states_equal(
                    enc,
                    reg,
                    TimeIdx::real(i - 1),
                    TimeIdx::Closing,
                );
                let imp = enc.implies(&l_i, &equal_states);
                clauses.extend(enc.force_true(&imp));
            }
        }

        // 4. LastState timeline: real states before current_k are not last
        let lo4 = prev_k.max(0) as u32;
        if current_k >= 1 {
            for i in lo4..current_k {
                let ls = enc.var_at(reg.last_state_var(), TimeIdx::real(i));
                let falsity = enc.falsity();
                let eq = enc.iff(&ls, &falsity);
                clauses.extend(enc.force_true(&eq));
            }
        }

        // 5. InLoop recursion + anti-reflexivity
        for i in lo3..=current_k {
            let in_loop_i = enc.var_at(Self::in_loop_name(), TimeIdx::real(i));
            let rhs = if i == 0 {
                enc.falsity()
            } else {
                let prev = enc.var_at(Self::in_loop_name(), TimeIdx::real(i - 1));
                let l_i = enc.var_at(reg.l_var(), TimeIdx::real(i));
                enc.or(&prev, &l_i)
            };
            let eq = enc.iff(&in_loop_i, &rhs);
            clauses.extend(enc.force_true(&eq));

            if i > 0 {
                let in_loop_prev = enc.var_at(Self::in_loop_name(), TimeIdx::real(i - 1));
                let l_i = enc.var_at(reg.l_var(), TimeIdx::real(i));
                let not_l_i = enc.not(&l_i);
                let imp = enc.implies(&in_loop_prev, &not_l_i);
                clauses.extend(enc.force_true(&imp));
            }
        }

        // 6. loop existence propagation
        for i in lo3..=current_k {
            let l_i = enc.var_at(reg.l_var(), TimeIdx::real(i));
            let loop_exists = enc.var_untimed(reg.loop_exists_var());
            let imp = enc.implies(&l_i, &loop_exists);
            clauses.extend(enc.force_true(&imp));
        }

        // 7. future & past invariants
        for i in lo3..=current_k {
            for f in &order {
                let has_vars = info.get(f).map(|x| x.has_trans_vars()).unwrap_or(false);
                if !has_vars {
                    continue;
                }
                let pd = info.get(f).map(|x| x.past_depth).unwrap_or(0);
                for d in 0..=pd {
                    let rhs = tableau.equation_at_real(enc, info, reg, f, i, d);
                    let name = TableauBuilder::trans_name(info, f, d);
                    let var = enc.var_at(&name, TimeIdx::real(i));
                    let eq = enc.iff(&var, &rhs);
                    clauses.extend(enc.force_true(&eq));
                }
            }
        }

        // 8. eventuality witnesses
        for f in &order {
            let pd = info.get(f).map(|x| x.past_depth).unwrap_or(0);
            if let Some(witness) = info.get(f).and_then(|x| x.aux_f_node.clone()) {
                for i in lo3..=current_k {
                    let w_i = enc.var_at(&witness, TimeIdx::real(i));
                    let rhs = if i == 0 {
                        enc.falsity()
                    } else {
                        let w_prev = enc.var_at(&witness, TimeIdx::real(i - 1));
                        let in_loop = enc.var_at(Self::in_loop_name(), TimeIdx::real(i));
                        let f_val = tableau.materialize(enc, info, reg, f, TimeIdx::real(i), pd);
                        let conj = enc.and(&in_loop, &f_val);
                        enc.or(&w_prev, &conj)
                    };
                    let eq = enc.iff(&w_i, &rhs);
                    clauses.extend(enc.force_true(&eq));
                }
            }
            if let Some(witness) = info.get(f).and_then(|x| x.aux_g_node.clone()) {
                for i in lo3..=current_k {
                    let w_i = enc.var_at(&witness, TimeIdx::real(i));
                    let rhs = if i == 0 {
                        enc.truth()
                    } else {
                        let w_prev = enc.var_at(&witness, TimeIdx::real(i - 1));
                        let in_loop = enc.var_at(Self::in_loop_name(), TimeIdx::real(i));
                        let not_in_loop = enc.not(&in_loop);
                        let f_val = tableau.materialize(enc, info, reg, f, TimeIdx::real(i), pd);
                        let disj = enc.or(&not_in_loop, &f_val);
                        enc.and(&w_prev, &disj)
                    };
                    let eq = enc.iff(&w_i, &rhs);
                    clauses.extend(enc.force_true(&eq));
                }
            }
        }

        // 9. formula root, exactly once
        if prev_k == SENTINEL {
            let root_val = tableau.materialize(enc, info, reg, root, TimeIdx::real(0), 0);
            let truth = enc.truth();
            let eq = enc.iff(&root_val, &truth);
            clauses.extend(enc.force_true(&eq));
        }

        self.prev_k = current_k as i64;
        clauses
    }

    /// Equality of `simple_path_system_vars` between two time indices,
    /// used by the loop-selector constraint (`s_{i-1} = s_E`) and reused
    /// directly by the closer for `s_E = s_k`.
    pub fn states_equal(enc: &mut Encoder, reg: &StateVarsRegistry, a: TimeIdx, b: TimeIdx) -> Be {
        let names: Vec<String> = reg
            .simple_path_system_vars()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut acc = enc.truth();
        for name in &names {
            let va = enc.var_at(name, a);
            let vb = enc.var_at(name, b);
            let eq = enc.iff(&va, &vb);
            acc = enc.and(&acc, &eq);
        }
        acc
    }
}

impl Default for Unroller {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::ExplicitFsm;

    #[test]
    fn first_unroll_pushes_formula_root_exactly_once() {
        let mut enc = Encoder::new();
        let mut reg = StateVarsRegistry::new();
        reg.allocate_singletons(&mut enc);
        let fsm = ExplicitFsm::toggling_counter();
        for name in fsm.state_var_names() {
            enc.declare_state_var(name);
            reg.assert_not_frozen(&enc, name);
            reg.transition_state_vars.push(name);
        }
        let mut info = FormulaInfoMap::new();
        let mut tableau = TableauBuilder::new(true, false);
        let phi = Formula::globally(Formula::or(Formula::atom("s"), Formula::not_atom("s")));
        tableau.prepare(&mut enc, &mut reg, &mut info, &phi);

        let mut unroller = Unroller::new();
        assert_eq!(unroller.prev_k(), -2);
        let clauses = unroller.unroll(&mut enc, &mut info, &reg, &mut tableau, &fsm, &phi, 0);
        assert!(!clauses.is_empty());
        assert_eq!(unroller.prev_k(), 0);
    }

    #[test]
    fn second_unroll_does_not_repeat_formula_root() {
        let mut enc = Encoder::new();
        let mut reg = StateVarsRegistry::new();
        reg.allocate_singletons(&mut enc);
        let fsm = ExplicitFsm::toggling_counter();
        for name in fsm.state_var_names() {
            enc.declare_state_var(name);
            reg.assert_not_frozen(&enc, name);
            reg.transition_state_vars.push(name);
        }
        let mut info = FormulaInfoMap::new();
        let mut tableau = TableauBuilder::new(true, false);
        let phi = Formula::globally(Formula::or(Formula::atom("s"), Formula::not_atom("s")));
        tableau.prepare(&mut enc, &mut reg, &mut info, &phi);

        let mut unroller = Unroller::new();
        unroller.unroll(&mut enc, &mut info, &reg, &mut tableau, &fsm, &phi, 0);
        let before = enc.drain_definitions().len();
        let _ = before;
        let clauses_k1 = unroller.unroll(&mut enc, &mut info, &reg, &mut tableau, &fsm, &phi, 1);
        assert!(!clauses_k1.is_empty());
        assert_eq!(unroller.prev_k(), 1);
    }
}
