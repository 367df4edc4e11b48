//! Zigzag Driver (C9): the incremental main loop (spec §4.7).
//!
//! `check_ltl` negates the caller's property once up front — C4 only ever
//! builds a tableau for an already-negated formula — then for each bound:
//! extends the permanent frame (C5, C6), optionally checks completeness on
//! the permanent frame alone, pushes the volatile closing constraints (C7)
//! and solves for a counterexample, and moves on to `k + 1` if neither
//! settled the question.

use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::closer::Closer;
use crate::encoder::{Encoder, Lit};
use crate::error::{EngineError, EngineResult};
use crate::formula_info::FormulaInfoMap;
use crate::fsm::Fsm;
use crate::pltl::{negate, Formula};
use crate::registry::StateVarsRegistry;
use crate::simple_path::SimplePathEngine;
use crate::solver::Solver;
use crate::tableau::TableauBuilder;
use crate::time_idx::TimeIdx;
use crate::trace::Trace;
use crate::unroller::Unroller;

#[derive(Clone, Copy, Debug)]
pub struct RunConfig {
    pub virtual_unrolling: bool,
    pub force_state_vars: bool,
    /// Push the `ass_SimplePath`-guarded distinguishability constraints and
    /// attempt a completeness verdict on the permanent frame each bound.
    pub completeness: bool,
    /// Give up with `Unknown` once this bound is reached without a verdict.
    /// `None` unrolls forever (bounded only by the caller's patience).
    pub max_bound: Option<u32>,
    /// Abort each `solve` that runs longer than this. `varisat`'s stable
    /// API has no per-call deadline, so this is currently only honored by
    /// future solver backends; set to `None` here rather than silently
    /// ignored by a backend that can't enforce it.
    pub solver_timeout: Option<Duration>,
    /// Fail fast with `PreconditionViolated` if the configured solver
    /// backend can't do assumption-based incremental solving (spec §7 item
    /// 1). `varisat` always can, so this never trips through this crate's
    /// own `Solver`; kept for alternative `Solver` implementers.
    pub require_assumption_capable: bool,
    /// Soft cap on the number of translation variables the tableau may
    /// allocate; exceeding it only logs a warning, it never aborts the run.
    pub max_translation_vars: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            virtual_unrolling: true,
            force_state_vars: false,
            completeness: false,
            max_bound: None,
            solver_timeout: None,
            require_assumption_capable: true,
            max_translation_vars: None,
        }
    }
}

#[derive(Debug)]
pub enum Verdict {
    /// Completeness closed the search at this bound: the property holds on
    /// every execution of the FSM, independent of `k`.
    Holds { diameter: u32 },
    /// A lasso witnessing `¬property` was found at this bound.
    Violated { bound: u32, trace: Trace },
    /// `max_bound` was exhausted without a verdict either way.
    Unknown { reached_bound: u32 },
}

pub struct Driver {
    enc: Encoder,
    reg: StateVarsRegistry,
    info: FormulaInfoMap,
    tableau: TableauBuilder,
    unroller: Unroller,
    closer: Closer,
    simple_path: SimplePathEngine,
    solver: Solver,
}

impl Driver {
    pub fn new(config: &RunConfig) -> Self {
        Driver {
            enc: Encoder::new(),
            reg: StateVarsRegistry::new(),
            info: FormulaInfoMap::new(),
            tableau: TableauBuilder::new(config.virtual_unrolling, config.force_state_vars),
            unroller: Unroller::new(),
            closer: Closer::new(),
            simple_path: SimplePathEngine::new(config.completeness),
            solver: Solver::new(),
        }
    }

    fn drain_defs_into_permanent(&mut self) {
        let defs = self.enc.drain_definitions();
        self.solver.add_permanent(defs);
    }

    fn push_be_permanent(&mut self, be: &crate::encoder::Be) {
        let units = self.enc.force_true(be);
        self.solver.add_permanent(units.into_iter().map(|l| vec![l]));
        self.drain_defs_into_permanent();
    }

    fn setup(&mut self, fsm: &dyn Fsm, neg_root: &Rc<Formula>, config: &RunConfig) {
        for name in fsm.state_var_names() {
            self.enc.declare_state_var(name);
            self.reg.assert_not_frozen(&self.enc, name);
            self.reg.transition_state_vars.push(name);
        }
        for name in fsm.input_var_names() {
            self.enc.declare_input_var(name);
        }
        self.reg.allocate_singletons(&mut self.enc);
        self.tableau
            .prepare(&mut self.enc, &mut self.reg, &mut self.info, neg_root);

        let base = self
            .tableau
            .base_constraints(&mut self.enc, &mut self.info, &self.reg);
        for b in &base {
            self.push_be_permanent(b);
        }

        let init0 = fsm.init_predicate(&mut self.enc, TimeIdx::real(0));
        self.push_be_permanent(&init0);

        if let Some(cap) = config.max_translation_vars {
            let used = self.reg.translation_vars_pd0.len()
                + self.reg.translation_vars_pdx.len()
                + self.reg.translation_vars_aux.len();
            if used > cap {
                warn!(used, cap, "translation variable count exceeds max_translation_vars");
            }
        }
    }

    /// Precondition checks that must hold before a run starts (spec §7
    /// item 1).
    fn check_preconditions(&self, config: &RunConfig) -> EngineResult<()> {
        if config.require_assumption_capable && !Solver::is_assumption_capable() {
            return Err(EngineError::precondition(
                "configured SAT backend does not support assumption-based incremental solving",
            ));
        }
        Ok(())
    }

    /// `check_ltl(property, K_max, virtual_unrolling, completeness)` (spec
    /// §6.4), decided for `fsm`.
    #[instrument(skip_all)]
    pub fn check_ltl(
        &mut self,
        fsm: &dyn Fsm,
        property: &Rc<Formula>,
        config: &RunConfig,
    ) -> EngineResult<Verdict> {
        let (verdict, _conflict) = self.run(fsm, property, config, &[])?;
        Ok(verdict)
    }

    /// `check_ltl_assume` (spec §6.4/§4.7.2): as [`Driver::check_ltl`], but
    /// every solve additionally assumes the caller's atoms at `R(0)`; on a
    /// `Holds` verdict the returned list is the subset of those atoms (plus,
    /// conceptually, `ass_SimplePath`) the unsat core blamed.
    pub fn check_ltl_assume(
        &mut self,
        fsm: &dyn Fsm,
        property: &Rc<Formula>,
        config: &RunConfig,
        assumptions: &[(String, bool)],
    ) -> EngineResult<(Verdict, Vec<(String, bool)>)> {
        self.run(fsm, property, config, assumptions)
    }

    fn run(
        &mut self,
        fsm: &dyn Fsm,
        property: &Rc<Formula>,
        config: &RunConfig,
        caller_assumptions: &[(String, bool)],
    ) -> EngineResult<(Verdict, Vec<(String, bool)>)> {
        self.check_preconditions(config)?;
        let neg_root = negate(property);
        self.setup(fsm, &neg_root, config);

        let assume_lits: Vec<Lit> = caller_assumptions
            .iter()
            .map(|(name, value)| {
                let v = self.enc.var_at(name, TimeIdx::real(0));
                let target = if *value { v } else { self.enc.not(&v) };
                self.enc.cnf_literal(&target)
            })
            .collect();

        let mut k = 0u32;
        loop {
            debug!(bound = k, "unrolling bound");
            let unroll_lits =
                self.unroller
                    .unroll(&mut self.enc, &mut self.info, &self.reg, &mut self.tableau, fsm, &neg_root, k);
            self.solver
                .add_permanent(unroll_lits.into_iter().map(|l| vec![l]));
            self.drain_defs_into_permanent();

            let sp_lits = self.simple_path.push_for_bound(&mut self.enc, &self.reg, k);
            self.solver.add_permanent(sp_lits.into_iter().map(|l| vec![l]));
            self.drain_defs_into_permanent();

            if config.completeness {
                let mut assumptions = assume_lits.clone();
                if let Some(ass) = self.simple_path.assumption_var(&mut self.enc) {
                    assumptions.push(self.enc.cnf_literal(&ass));
                }
                if self.solver.solve(&assumptions)?.is_none() {
                    info!(bound = k, "completeness reached on the permanent frame");
                    let conflict = self.resolve_conflict(caller_assumptions);
                    return Ok((Verdict::Holds { diameter: k }, conflict));
                }
            }

            let close_lits = self
                .closer
                .close(&mut self.enc, &mut self.info, &self.reg, &self.tableau, k);
            let sel_be = self.enc.var_untimed(&format!("sel_bound_{k}"));
            let sel_id = self
                .enc
                .var_to_index(&sel_be)
                .expect("selector variable just declared");
            self.solver
                .add_volatile(close_lits.into_iter().map(|l| vec![l]), sel_id);
            self.drain_defs_into_permanent();

            let mut assumptions = assume_lits.clone();
            assumptions.push(Lit::pos(sel_id));
            if let Some(ass) = self.simple_path.assumption_var(&mut self.enc) {
                assumptions.push(self.enc.cnf_literal(&ass));
            }

            match self.solver.solve(&assumptions)? {
                Some(model) => {
                    info!(bound = k, "counterexample found");
                    let trace = Trace::extract(&mut self.enc, &self.reg, &model, k);
                    return Ok((Verdict::Violated { bound: k, trace }, Vec::new()));
                }
                None => {
                    debug!(bound = k, "unsatisfiable at this bound");
                }
            }

            if let Some(max) = config.max_bound {
                if k >= max {
                    return Ok((Verdict::Unknown { reached_bound: k }, Vec::new()));
                }
            }
            k += 1;
        }
    }

    /// Walk the last UNSAT call's conflict literals, matching them back to
    /// the caller's own assumption names (spec §4.7.2).
    fn resolve_conflict(&mut self, caller_assumptions: &[(String, bool)]) -> Vec<(String, bool)> {
        let core = self.solver.failed_core();
        caller_assumptions
            .iter()
            .filter(|(name, value)| {
                let v = self.enc.var_at(name, TimeIdx::real(0));
                let expected_var = self.enc.var_to_index(&v);
                core.iter()
                    .any(|lit| expected_var == Some(lit.var()) && lit.is_negated() == !*value)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::ExplicitFsm;

    #[test]
    fn toggling_counter_confirms_globally_tautology() {
        let fsm = ExplicitFsm::toggling_counter();
        let phi = Formula::globally(Formula::or(Formula::atom("s"), Formula::not_atom("s")));
        let config = RunConfig {
            completeness: true,
            max_bound: Some(4),
            ..RunConfig::default()
        };
        let mut driver = Driver::new(&config);
        let verdict = driver.check_ltl(&fsm, &phi, &config).unwrap();
        match verdict {
            Verdict::Holds { .. } | Verdict::Unknown { .. } => {}
            Verdict::Violated { .. } => panic!("tautology must not be violated"),
        }
    }

    #[test]
    fn toggling_counter_rejects_globally_s() {
        let fsm = ExplicitFsm::toggling_counter();
        let phi = Formula::globally(Formula::atom("s"));
        let config = RunConfig {
            max_bound: Some(3),
            ..RunConfig::default()
        };
        let mut driver = Driver::new(&config);
        let verdict = driver.check_ltl(&fsm, &phi, &config).unwrap();
        assert!(matches!(verdict, Verdict::Violated { .. }));
    }
}
