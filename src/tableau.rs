//! Tableau Builder (C4): past-depth computation, translation/auxiliary
//! variable allocation, state-vector materialisation, and the k-invariant
//! base constraints on the pseudo-states `L`/`E` (spec §4.2).

use std::collections::HashSet;
use std::rc::Rc;

use crate::encoder::{Be, Encoder};
use crate::formula_info::FormulaInfoMap;
use crate::pltl::Formula;
use crate::registry::StateVarsRegistry;
use crate::time_idx::TimeIdx;

/// Bottom-up, duplicate-free traversal order (explicit worklist, spec
/// §4.2.1: "no recursion on deep formulas").
pub fn postorder(root: &Rc<Formula>) -> Vec<Rc<Formula>> {
    let mut out = Vec::new();
    let mut done: HashSet<Formula> = HashSet::new();
    let mut stack = vec![(root.clone(), false)];
    while let Some((node, expanded)) = stack.pop() {
        if done.contains(&*node) {
            continue;
        }
        if expanded {
            done.insert((*node).clone());
            out.push(node);
        } else {
            stack.push((node.clone(), true));
            for c in node.children() {
                if !done.contains(&**c) {
                    stack.push((c.clone(), false));
                }
            }
        }
    }
    out
}

fn named_by_default(f: &Formula) -> bool {
    matches!(
        f,
        Formula::Eventually(_)
            | Formula::Globally(_)
            | Formula::Until(..)
            | Formula::Release(..)
            | Formula::Previously(_)
            | Formula::NotPrevNotPrev(_)
            | Formula::Once(_)
            | Formula::Historically(_)
            | Formula::Since(..)
            | Formula::Triggered(..)
    )
}

fn name_prefix(f: &Formula) -> &'static str {
    match f {
        Formula::Eventually(_) => "tv_F",
        Formula::Globally(_) => "tv_G",
        Formula::Until(..) => "tv_U",
        Formula::Release(..) => "tv_R",
        Formula::Previously(_) => "tv_Y",
        Formula::NotPrevNotPrev(_) => "tv_Z",
        Formula::Once(_) => "tv_O",
        Formula::Historically(_) => "tv_H",
        Formula::Since(..) => "tv_S",
        Formula::Triggered(..) => "tv_T",
        Formula::Next(_) => "tv_X",
        Formula::And(..) => "tv_And",
        Formula::Or(..) => "tv_Or",
        Formula::Atom { .. } => "tv_p",
        Formula::True | Formula::False => "tv_const",
    }
}

pub struct TableauBuilder {
    virtual_unrolling: bool,
    force_state_vars: bool,
    next_name_id: u64,
    pub order: Vec<Rc<Formula>>,
}

impl TableauBuilder {
    pub fn new(virtual_unrolling: bool, force_state_vars: bool) -> Self {
        TableauBuilder {
            virtual_unrolling,
            force_state_vars,
            next_name_id: 0,
            order: Vec::new(),
        }
    }

    fn fresh_name(&mut self, prefix: &str) -> String {
        let id = self.next_name_id;
        self.next_name_id += 1;
        format!("{prefix}_{id}")
    }

    /// Pass 1 + 2: compute past depths and allocate translation/auxiliary
    /// variables for every subformula of `root` (spec §4.2.1).
    pub fn prepare(
        &mut self,
        enc: &mut Encoder,
        reg: &mut StateVarsRegistry,
        info: &mut FormulaInfoMap,
        root: &Rc<Formula>,
    ) {
        let order = postorder(root);

        for f in &order {
            let pd = self.compute_past_depth(info, f);
            info.entry(f).past_depth = pd;
        }

        for f in &order {
            self.allocate_node(enc, reg, info, f);
        }

        self.order = order;
        reg.rebuild_simple_path_vars();
    }

    fn compute_past_depth(&self, info: &FormulaInfoMap, f: &Rc<Formula>) -> u32 {
        let pd_of = |c: &Rc<Formula>| info.get(c).map(|i| i.past_depth).unwrap_or(0);
        match &**f {
            Formula::True | Formula::False | Formula::Atom { .. } => 0,
            Formula::And(a, b) | Formula::Or(a, b) => {
                if self.virtual_unrolling {
                    pd_of(a).max(pd_of(b))
                } else {
                    0
                }
            }
            Formula::Next(a) | Formula::Eventually(a) | Formula::Globally(a) => {
                if self.virtual_unrolling {
                    pd_of(a)
                } else {
                    0
                }
            }
            Formula::Until(a, b) | Formula::Release(a, b) => {
                if self.virtual_unrolling {
                    pd_of(a).max(pd_of(b))
                } else {
                    0
                }
            }
            Formula::Previously(a)
            | Formula::NotPrevNotPrev(a)
            | Formula::Once(a)
            | Formula::Historically(a) => pd_of(a) + 1,
            Formula::Since(a, b) | Formula::Triggered(a, b) => pd_of(a).max(pd_of(b)) + 1,
        }
    }

    fn allocate_names(
        &mut self,
        enc: &mut Encoder,
        reg: &mut StateVarsRegistry,
        info: &mut FormulaInfoMap,
        f: &Rc<Formula>,
    ) {
        if info.get(f).map(|i| i.has_trans_vars()).unwrap_or(false) {
            return;
        }
        let pd = info.get(f).map(|i| i.past_depth).unwrap_or(0);
        let base = self.fresh_name(name_prefix(f));
        let names: Vec<String> = (0..=pd)
            .map(|d| {
                if d == 0 {
                    base.clone()
                } else {
                    format!("{base}_d{d}")
                }
            })
            .collect();
        for name in &names {
            enc.declare_state_var(name);
            reg.assert_not_frozen(enc, name);
            if pd == 0 {
                reg.translation_vars_pd0.push(name);
            } else {
                reg.translation_vars_pdx.push(name);
            }
        }
        info.entry(f).trans_vars = Some(names);
    }

    fn allocate_aux_f(
        &mut self,
        enc: &mut Encoder,
        reg: &mut StateVarsRegistry,
        info: &mut FormulaInfoMap,
        owner: &Rc<Formula>,
    ) {
        if info.get(owner).and_then(|i| i.aux_f_node.clone()).is_some() {
            return;
        }
        let name = self.fresh_name("auxF");
        enc.declare_state_var(&name);
        reg.assert_not_frozen(enc, &name);
        reg.translation_vars_aux.push(&name);
        info.entry(owner).aux_f_node = Some(name);
    }

    fn allocate_aux_g(
        &mut self,
        enc: &mut Encoder,
        reg: &mut StateVarsRegistry,
        info: &mut FormulaInfoMap,
        owner: &Rc<Formula>,
    ) {
        if info.get(owner).and_then(|i| i.aux_g_node.clone()).is_some() {
            return;
        }
        let name = self.fresh_name("auxG");
        enc.declare_state_var(&name);
        reg.assert_not_frozen(enc, &name);
        reg.translation_vars_aux.push(&name);
        info.entry(owner).aux_g_node = Some(name);
    }

    fn allocate_node(
        &mut self,
        enc: &mut Encoder,
        reg: &mut StateVarsRegistry,
        info: &mut FormulaInfoMap,
        f: &Rc<Formula>,
    ) {
        let needs_vars = named_by_default(f) || self.force_state_vars;
        if needs_vars {
            self.allocate_names(enc, reg, info, f);
        }
        match &**f {
            Formula::Next(child) | Formula::Previously(child) | Formula::NotPrevNotPrev(child) => {
                self.allocate_names(enc, reg, info, child);
            }
            // NuSMV's sbmcTableauIncLTLformula.c stores the eventuality
            // witness on the immediate subformula (`lsf_info`) for F, or the
            // right operand (`rsf_info`) for U — never on the F/U node's
            // own info — so the witness actually tracks the child holding,
            // not the parent's own (possibly vacuous) fixpoint value.
            Formula::Eventually(child) => self.allocate_aux_f(enc, reg, info, child),
            Formula::Until(_, right) => self.allocate_aux_f(enc, reg, info, right),
            Formula::Globally(child) => self.allocate_aux_g(enc, reg, info, child),
            Formula::Release(_, right) => self.allocate_aux_g(enc, reg, info, right),
            Formula::Atom { name, .. } => {
                reg.assert_not_frozen(enc, name);
                if enc.is_input_var(name) {
                    reg.formula_input_vars.push(name);
                } else {
                    reg.formula_state_vars.push(name);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn trans_name(info: &FormulaInfoMap, f: &Formula, d: u32) -> String {
        info.get(f)
            .and_then(|i| i.trans_var_name(d))
            .unwrap_or_else(|| panic!("missing translation variable for depth {d}"))
            .to_string()
    }

    /// `[[f]]_time^depth`, lazily computed and cached. Named nodes resolve
    /// to a direct variable lookup; the definitional ones (plain atoms,
    /// `∧`/`∨`, un-forced `X`) recurse into their children.
    pub fn materialize(
        &mut self,
        enc: &mut Encoder,
        info: &mut FormulaInfoMap,
        reg: &StateVarsRegistry,
        f: &Rc<Formula>,
        time: TimeIdx,
        depth: u32,
    ) -> Be {
        let pd = info.get(f).map(|i| i.past_depth).unwrap_or(0);
        let d = depth.min(pd);
        if let Some(cached) = info.get(f).and_then(|i| i.get_past(time, d)) {
            return cached;
        }
        let has_vars = info.get(f).map(|i| i.has_trans_vars()).unwrap_or(false);
        let be = if has_vars {
            let name = Self::trans_name(info, f, d);
            enc.var_at(&name, time)
        } else {
            self.materialize_definitional(enc, info, reg, f, time, d)
        };
        info.entry(f).set_past(time, d, be.clone());
        be
    }

    fn materialize_definitional(
        &mut self,
        enc: &mut Encoder,
        info: &mut FormulaInfoMap,
        reg: &StateVarsRegistry,
        f: &Rc<Formula>,
        time: TimeIdx,
        d: u32,
    ) -> Be {
        match &**f {
            Formula::True => enc.truth(),
            Formula::False => enc.falsity(),
            Formula::Atom { name, negated } => {
                let v = enc.var_at(name, time);
                let guarded = if enc.is_input_var(name) && matches!(time, TimeIdx::Real(_)) {
                    let last = enc.var_at(reg.last_state_var(), time);
                    let not_last = enc.not(&last);
                    let loop_exists = enc.var_untimed(reg.loop_exists_var());
                    let guard = enc.or(&not_last, &loop_exists);
                    enc.and(&v, &guard)
                } else {
                    v
                };
                if *negated {
                    enc.not(&guarded)
                } else {
                    guarded
                }
            }
            Formula::And(a, b) => {
                let da = d.min(info.get(a).map(|i| i.past_depth).unwrap_or(0));
                let db = d.min(info.get(b).map(|i| i.past_depth).unwrap_or(0));
                let va = self.materialize(enc, info, reg, a, time, da);
                let vb = self.materialize(enc, info, reg, b, time, db);
                enc.and(&va, &vb)
            }
            Formula::Or(a, b) => {
                let da = d.min(info.get(a).map(|i| i.past_depth).unwrap_or(0));
                let db = d.min(info.get(b).map(|i| i.past_depth).unwrap_or(0));
                let va = self.materialize(enc, info, reg, a, time, da);
                let vb = self.materialize(enc, info, reg, b, time, db);
                enc.or(&va, &vb)
            }
            Formula::Next(child) => {
                let child_pd = info.get(child).map(|i| i.past_depth).unwrap_or(0);
                match time {
                    TimeIdx::Loop => {
                        let cd = (d + 1).min(child_pd);
                        self.materialize(enc, info, reg, child, TimeIdx::Loop, cd)
                    }
                    TimeIdx::Closing => self.materialize(enc, info, reg, child, TimeIdx::Loop, d),
                    TimeIdx::Real(i) => {
                        self.materialize(enc, info, reg, child, TimeIdx::real(i + 1), d)
                    }
                }
            }
            _ => unreachable!("materialize_definitional called on a node allocated trans_vars"),
        }
    }

    /// The defining RHS for a named node at a real time `i` (spec §4.3 step
    /// 7); only ever called by the unroller, never at `L`/`E`.
    pub fn equation_at_real(
        &mut self,
        enc: &mut Encoder,
        info: &mut FormulaInfoMap,
        reg: &StateVarsRegistry,
        f: &Rc<Formula>,
        i: u32,
        depth: u32,
    ) -> Be {
        let pd = info.get(f).map(|i| i.past_depth).unwrap_or(0);
        let d = depth.min(pd);
        let time = TimeIdx::real(i);
        match &**f {
            Formula::Eventually(child) => self.future_eq(enc, info, reg, f, child, None, time, i, d, true, false),
            Formula::Globally(child) => self.future_eq(enc, info, reg, f, child, None, time, i, d, false, false),
            Formula::Until(a, b) => self.future_eq(enc, info, reg, f, a, Some(b), time, i, d, true, true),
            Formula::Release(a, b) => self.future_eq(enc, info, reg, f, a, Some(b), time, i, d, false, true),
            Formula::Previously(child) => {
                let base = enc.falsity();
                self.strict_prev_eq(enc, info, reg, child, i, d, base)
            }
            Formula::NotPrevNotPrev(child) => {
                let base = enc.truth();
                self.strict_prev_eq(enc, info, reg, child, i, d, base)
            }
            Formula::Once(child) => self.fixpoint_prev_eq(enc, info, reg, f, child, i, d, pd, true),
            Formula::Historically(child) => self.fixpoint_prev_eq(enc, info, reg, f, child, i, d, pd, false),
            Formula::Since(a, b) => self.fixpoint_binary_prev_eq(enc, info, reg, f, a, b, i, d, pd, true),
            Formula::Triggered(a, b) => self.fixpoint_binary_prev_eq(enc, info, reg, f, a, b, i, d, pd, false),
            _ => unreachable!("equation_at_real called on a non-named or unsupported node kind"),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn future_eq(
        &mut self,
        enc: &mut Encoder,
        info: &mut FormulaInfoMap,
        reg: &StateVarsRegistry,
        f: &Rc<Formula>,
        left: &Rc<Formula>,
        right: Option<&Rc<Formula>>,
        time: TimeIdx,
        i: u32,
        d: u32,
        union: bool,
        binary: bool,
    ) -> Be {
        let pd = info.get(f).map(|i| i.past_depth).unwrap_or(0);
        let dl = d.min(info.get(left).map(|i| i.past_depth).unwrap_or(0));
        let left_val = self.materialize(enc, info, reg, left, time, dl);
        let now_val = if let Some(right) = right {
            let dr = d.min(info.get(right).map(|i| i.past_depth).unwrap_or(0));
            let right_val = self.materialize(enc, info, reg, right, time, dr);
            if binary {
                if union {
                    // a U b at i: b_i or (a_i and self_{i+1})
                    right_val
                } else {
                    // a R b at i: b_i and (a_i or self_{i+1})
                    right_val
                }
            } else {
                left_val.clone()
            }
        } else {
            left_val.clone()
        };
        let dshift = (d + 1).min(pd);
        let name = Self::trans_name(info, f, dshift);
        let self_next = enc.var_at(&name, TimeIdx::real(i + 1));
        if binary {
            if union {
                let branch = enc.and(&left_val, &self_next);
                enc.or(&now_val, &branch)
            } else {
                let branch = enc.or(&left_val, &self_next);
                enc.and(&now_val, &branch)
            }
        } else if union {
            enc.or(&now_val, &self_next)
        } else {
            enc.and(&now_val, &self_next)
        }
    }

    fn strict_prev_eq(
        &mut self,
        enc: &mut Encoder,
        info: &mut FormulaInfoMap,
        reg: &StateVarsRegistry,
        child: &Rc<Formula>,
        i: u32,
        d: u32,
        base: Be,
    ) -> Be {
        if i == 0 {
            return base;
        }
        let dc = d.min(info.get(child).map(|i| i.past_depth).unwrap_or(0));
        let l_i = enc.var_at(reg.l_var(), TimeIdx::real(i));
        let e_val = self.materialize(enc, info, reg, child, TimeIdx::Closing, dc);
        let prev_val = self.materialize(enc, info, reg, child, TimeIdx::real(i - 1), dc);
        enc.ite(&l_i, &e_val, &prev_val)
    }

    #[allow(clippy::too_many_arguments)]
    fn fixpoint_prev_eq(
        &mut self,
        enc: &mut Encoder,
        info: &mut FormulaInfoMap,
        reg: &StateVarsRegistry,
        owner: &Rc<Formula>,
        child: &Rc<Formula>,
        i: u32,
        d: u32,
        pd: u32,
        union: bool,
    ) -> Be {
        let dc = d.min(info.get(child).map(|i| i.past_depth).unwrap_or(0));
        let now_val = self.materialize(enc, info, reg, child, TimeIdx::real(i), dc);
        if i == 0 {
            return now_val;
        }
        let l_i = enc.var_at(reg.l_var(), TimeIdx::real(i));
        let d_minus = d.saturating_sub(1);
        let name_d = Self::trans_name(info, owner, d);
        let name_dminus = Self::trans_name(info, owner, d_minus);
        let self_prev = enc.var_at(&name_d, TimeIdx::real(i - 1));
        let self_e_shift = enc.var_at(&name_dminus, TimeIdx::Closing);
        let ite1 = enc.ite(&l_i, &self_e_shift, &self_prev);
        let eq1 = if union {
            enc.or(&now_val, &ite1)
        } else {
            enc.and(&now_val, &ite1)
        };
        if d == pd {
            let self_e_stable = enc.var_at(&name_d, TimeIdx::Closing);
            let ite2 = enc.ite(&l_i, &self_e_stable, &self_prev);
            let eq2 = if union {
                enc.or(&now_val, &ite2)
            } else {
                enc.and(&now_val, &ite2)
            };
            enc.and(&eq1, &eq2)
        } else {
            eq1
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn fixpoint_binary_prev_eq(
        &mut self,
        enc: &mut Encoder,
        info: &mut FormulaInfoMap,
        reg: &StateVarsRegistry,
        owner: &Rc<Formula>,
        a: &Rc<Formula>,
        b: &Rc<Formula>,
        i: u32,
        d: u32,
        pd: u32,
        union: bool,
    ) -> Be {
        let da = d.min(info.get(a).map(|i| i.past_depth).unwrap_or(0));
        let db = d.min(info.get(b).map(|i| i.past_depth).unwrap_or(0));
        let a_val = self.materialize(enc, info, reg, a, TimeIdx::real(i), da);
        let b_val = self.materialize(enc, info, reg, b, TimeIdx::real(i), db);
        if i == 0 {
            return b_val;
        }
        let l_i = enc.var_at(reg.l_var(), TimeIdx::real(i));
        let d_minus = d.saturating_sub(1);
        let name_d = Self::trans_name(info, owner, d);
        let name_dminus = Self::trans_name(info, owner, d_minus);
        let self_prev = enc.var_at(&name_d, TimeIdx::real(i - 1));
        let self_e_shift = enc.var_at(&name_dminus, TimeIdx::Closing);
        let ite1 = enc.ite(&l_i, &self_e_shift, &self_prev);
        let branch1 = if union {
            enc.and(&a_val, &ite1)
        } else {
            enc.or(&a_val, &ite1)
        };
        let eq1 = if union {
            enc.or(&b_val, &branch1)
        } else {
            enc.and(&b_val, &branch1)
        };
        if d == pd {
            let self_e_stable = enc.var_at(&name_d, TimeIdx::Closing);
            let ite2 = enc.ite(&l_i, &self_e_stable, &self_prev);
            let branch2 = if union {
                enc.and(&a_val, &ite2)
            } else {
                enc.or(&a_val, &ite2)
            };
            let eq2 = if union {
                enc.or(&b_val, &branch2)
            } else {
                enc.and(&b_val, &branch2)
            };
            enc.and(&eq1, &eq2)
        } else {
            eq1
        }
    }

    /// k-invariant base constraints on `L`/`E` (spec §4.2.3), pushed once
    /// at run start.
    pub fn base_constraints(
        &mut self,
        enc: &mut Encoder,
        info: &mut FormulaInfoMap,
        reg: &StateVarsRegistry,
    ) -> Vec<Be> {
        let mut out = Vec::new();
        let loop_exists = enc.var_untimed(reg.loop_exists_var());
        let not_loop_exists = enc.not(&loop_exists);

        let order = self.order.clone();
        for f in &order {
            let pd = info.get(f).map(|i| i.past_depth).unwrap_or(0);
            let has_vars = info.get(f).map(|i| i.has_trans_vars()).unwrap_or(false);
            if has_vars {
                for d in 0..=pd {
                    let name = Self::trans_name(info, f, d);
                    let l_val = enc.var_at(&name, TimeIdx::Loop);
                    let falsity = enc.falsity();
                    let must_be_false = enc.iff(&l_val, &falsity);
                    out.push(enc.implies(&not_loop_exists, &must_be_false));
                }
            }

            // Witness ownership (see `allocate_node`) lives on whichever
            // node actually carries `aux_f_node`/`aux_g_node` — the F/G
            // child or the U/R right operand, not `f` itself whenever `f`
            // happens to be the F/U/G/R node — so this is checked by field
            // presence alone, independent of `f`'s own shape or `has_vars`.
            if let Some(witness) = info.get(f).and_then(|i| i.aux_f_node.clone()) {
                let w = enc.var_untimed(&witness);
                let e_val = self.materialize(enc, info, reg, f, TimeIdx::Closing, pd);
                let implication = enc.implies(&e_val, &w);
                out.push(enc.implies(&loop_exists, &implication));
            }
            if let Some(witness) = info.get(f).and_then(|i| i.aux_g_node.clone()) {
                let w = enc.var_untimed(&witness);
                let e_val = self.materialize(enc, info, reg, f, TimeIdx::Closing, pd);
                let implication = enc.implies(&e_val, &w);
                out.push(enc.implies(&loop_exists, &implication));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn past_depth_of_once_is_child_plus_one() {
        let mut enc = Encoder::new();
        let mut reg = StateVarsRegistry::new();
        reg.allocate_singletons(&mut enc);
        let mut info = FormulaInfoMap::new();
        let mut builder = TableauBuilder::new(true, false);
        let phi = Formula::once(Formula::atom("p"));
        builder.prepare(&mut enc, &mut reg, &mut info, &phi);
        assert_eq!(info.get(&phi).unwrap().past_depth, 1);
    }

    #[test]
    fn propositional_past_depth_is_zero_without_virtual_unrolling() {
        let mut enc = Encoder::new();
        let mut reg = StateVarsRegistry::new();
        reg.allocate_singletons(&mut enc);
        let mut info = FormulaInfoMap::new();
        let mut builder = TableauBuilder::new(false, false);
        let phi = Formula::and(Formula::once(Formula::atom("p")), Formula::atom("q"));
        builder.prepare(&mut enc, &mut reg, &mut info, &phi);
        assert_eq!(info.get(&phi).unwrap().past_depth, 0);
    }

    #[test]
    fn eventually_gets_an_aux_f_witness() {
        let mut enc = Encoder::new();
        let mut reg = StateVarsRegistry::new();
        reg.allocate_singletons(&mut enc);
        let mut info = FormulaInfoMap::new();
        let mut builder = TableauBuilder::new(true, false);
        let phi = Formula::eventually(Formula::atom("p"));
        builder.prepare(&mut enc, &mut reg, &mut info, &phi);
        assert!(info.get(&phi).unwrap().aux_f_node.is_some());
    }
}
