//! Simple-Path Engine (C6): the optional `ass_SimplePath`-guarded
//! pairwise-distinguishability constraints (spec §4.4), pushed only when
//! completeness checking is enabled.

use crate::encoder::{Be, Encoder, Lit};
use crate::registry::{NameSeq, StateVarsRegistry};
use crate::time_idx::TimeIdx;
use crate::unroller::Unroller;

pub struct SimplePathEngine {
    completeness: bool,
    ass_simple_path: Option<String>,
}

impl SimplePathEngine {
    pub fn new(completeness: bool) -> Self {
        SimplePathEngine {
            completeness,
            ass_simple_path: None,
        }
    }

    pub fn completeness(&self) -> bool {
        self.completeness
    }

    /// The assumption literal guarding every pair constraint, allocated
    /// lazily the first time it is needed.
    pub fn assumption_var(&mut self, enc: &mut Encoder) -> Option<Be> {
        if !self.completeness {
            return None;
        }
        if self.ass_simple_path.is_none() {
            self.ass_simple_path = Some("ass_SimplePath".to_string());
        }
        Some(enc.var_untimed(self.ass_simple_path.as_ref().unwrap()))
    }

    fn vars_differ(enc: &mut Encoder, names: &NameSeq, a: u32, b: u32) -> Be {
        let mut acc = enc.falsity();
        for name in names.iter() {
            let va = enc.var_at(name, TimeIdx::real(a));
            let vb = enc.var_at(name, TimeIdx::real(b));
            let diff = enc.xor(&va, &vb);
            acc = enc.or(&acc, &diff);
        }
        acc
    }

    fn pair_distinguishable(enc: &mut Encoder, reg: &StateVarsRegistry, j: u32, k: u32) -> Be {
        let equal = Unroller::states_equal(enc, reg, TimeIdx::real(j), TimeIdx::real(k));
        let s_diff = enc.not(&equal);

        let in_loop_j = Unroller::in_loop_at(enc, TimeIdx::real(j));
        let in_loop_k = Unroller::in_loop_at(enc, TimeIdx::real(k));
        let il_diff = enc.xor(&in_loop_j, &in_loop_k);

        let pd0_diff = Self::vars_differ(enc, &reg.translation_vars_pd0, j, k);
        let pdx_diff = Self::vars_differ(enc, &reg.translation_vars_pdx, j, k);
        let aux_diff = Self::vars_differ(enc, &reg.translation_vars_aux, j, k);

        let both_in_loop = enc.and(&in_loop_j, &in_loop_k);
        let deep_diff = enc.or(&pdx_diff, &aux_diff);
        let deep_term = enc.and(&both_in_loop, &deep_diff);

        let mut acc = enc.or(&s_diff, &il_diff);
        acc = enc.or(&acc, &pd0_diff);
        acc = enc.or(&acc, &deep_term);
        acc
    }

    /// Push, for the new bound `current_k`, the distinguishability
    /// constraint for every pair `(j, current_k)` with `j < current_k` that
    /// was not already pushed against a smaller bound.
    pub fn push_for_bound(
        &mut self,
        enc: &mut Encoder,
        reg: &StateVarsRegistry,
        current_k: u32,
    ) -> Vec<Lit> {
        if !self.completeness || current_k == 0 {
            return Vec::new();
        }
        let ass = self.assumption_var(enc);
        let mut clauses: Vec<Lit> = Vec::new();
        for j in 0..current_k {
            let disj = Self::pair_distinguishable(enc, reg, j, current_k);
            let target = match &ass {
                Some(a) => enc.implies(a, &disj),
                None => disj,
            };
            clauses.extend(enc.force_true(&target));
        }
        clauses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::{ExplicitFsm, Fsm};

    fn setup() -> (Encoder, StateVarsRegistry) {
        let mut enc = Encoder::new();
        let mut reg = StateVarsRegistry::new();
        reg.allocate_singletons(&mut enc);
        let fsm = ExplicitFsm::toggling_counter();
        for name in fsm.state_var_names() {
            enc.declare_state_var(name);
            reg.transition_state_vars.push(name);
        }
        reg.rebuild_simple_path_vars();
        (enc, reg)
    }

    #[test]
    fn disabled_completeness_pushes_nothing() {
        let (mut enc, reg) = setup();
        let mut engine = SimplePathEngine::new(false);
        let clauses = engine.push_for_bound(&mut enc, &reg, 1);
        assert!(clauses.is_empty());
    }

    #[test]
    fn enabled_completeness_pushes_one_pair_at_k_equals_one() {
        let (mut enc, reg) = setup();
        let mut engine = SimplePathEngine::new(true);
        let clauses = engine.push_for_bound(&mut enc, &reg, 1);
        assert!(!clauses.is_empty());
    }

    #[test]
    fn zero_bound_has_no_pairs() {
        let (mut enc, reg) = setup();
        let mut engine = SimplePathEngine::new(true);
        let clauses = engine.push_for_bound(&mut enc, &reg, 0);
        assert!(clauses.is_empty());
    }
}
