//! k-Dependent Closer (C7): the volatile constraints that close the
//! translation at the current bound (spec §4.5), pushed fresh before every
//! solve and released afterward.

use crate::encoder::{Encoder, Lit};
use crate::formula_info::FormulaInfoMap;
use crate::registry::StateVarsRegistry;
use crate::tableau::TableauBuilder;
use crate::time_idx::TimeIdx;
use crate::unroller::Unroller;

pub struct Closer;

impl Closer {
    pub fn new() -> Self {
        Closer
    }

    pub fn close(
        &mut self,
        enc: &mut Encoder,
        info: &mut FormulaInfoMap,
        reg: &StateVarsRegistry,
        tableau: &TableauBuilder,
        current_k: u32,
    ) -> Vec<Lit> {
        let k = current_k;
        let mut out: Vec<Lit> = Vec::new();

        let last_state_k = enc.var_at(reg.last_state_var(), TimeIdx::real(k));
        let truth = enc.truth();
        let eq = enc.iff(&last_state_k, &truth);
        out.extend(enc.force_true(&eq));

        let l_next = enc.var_at(reg.l_var(), TimeIdx::real(k + 1));
        let falsity = enc.falsity();
        let eq = enc.iff(&l_next, &falsity);
        out.extend(enc.force_true(&eq));

        let states_equal = Unroller::states_equal(enc, reg, TimeIdx::Closing, TimeIdx::real(k));
        out.extend(enc.force_true(&states_equal));

        let loop_exists = enc.var_untimed(reg.loop_exists_var());
        let in_loop_k = Unroller::in_loop_at(enc, TimeIdx::real(k));
        let eq = enc.iff(&loop_exists, &in_loop_k);
        out.extend(enc.force_true(&eq));

        for f in &tableau.order {
            let has_vars = info.get(f).map(|x| x.has_trans_vars()).unwrap_or(false);
            let pd = info.get(f).map(|x| x.past_depth).unwrap_or(0);
            if has_vars {
                for d in 0..=pd {
                    let name = TableauBuilder::trans_name(info, f, d);
                    let e_val = enc.var_at(&name, TimeIdx::Closing);
                    let k_val = enc.var_at(&name, TimeIdx::real(k));
                    let eq = enc.iff(&e_val, &k_val);
                    out.extend(enc.force_true(&eq));

                    let dshift = (d + 1).min(pd);
                    let name_shift = TableauBuilder::trans_name(info, f, dshift);
                    let l_val = enc.var_at(&name_shift, TimeIdx::Loop);
                    let next_val = enc.var_at(&name, TimeIdx::real(k + 1));
                    let eq2 = enc.iff(&next_val, &l_val);
                    out.extend(enc.force_true(&eq2));
                }
            }

            // Witnesses live on the F/G child or U/R right operand (see
            // `TableauBuilder::allocate_node`), which may itself be purely
            // definitional (`has_vars == false`) — this must not be folded
            // into the `has_vars` guard above.
            if let Some(witness) = info.get(f).and_then(|x| x.aux_f_node.clone()) {
                let w_e = enc.var_at(&witness, TimeIdx::Closing);
                let w_k = enc.var_at(&witness, TimeIdx::real(k));
                let eq = enc.iff(&w_e, &w_k);
                out.extend(enc.force_true(&eq));
            }
            if let Some(witness) = info.get(f).and_then(|x| x.aux_g_node.clone()) {
                let w_e = enc.var_at(&witness, TimeIdx::Closing);
                let w_k = enc.var_at(&witness, TimeIdx::real(k));
                let eq = enc.iff(&w_e, &w_k);
                out.extend(enc.force_true(&eq));
            }
        }

        out
    }
}

impl Default for Closer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::{ExplicitFsm, Fsm};
    use crate::pltl::Formula;

    #[test]
    fn close_emits_last_state_and_loop_closure_constraints() {
        let mut enc = Encoder::new();
        let mut reg = StateVarsRegistry::new();
        reg.allocate_singletons(&mut enc);
        let fsm = ExplicitFsm::toggling_counter();
        for name in fsm.state_var_names() {
            enc.declare_state_var(name);
            reg.transition_state_vars.push(name);
        }
        let mut info = FormulaInfoMap::new();
        let mut tableau = TableauBuilder::new(true, false);
        let phi = Formula::globally(Formula::atom("s"));
        tableau.prepare(&mut enc, &mut reg, &mut info, &phi);

        let mut closer = Closer::new();
        let clauses = closer.close(&mut enc, &mut info, &reg, &tableau, 0);
        assert!(!clauses.is_empty());
    }
}
