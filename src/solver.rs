//! Solver façade (C8): wraps an incremental, assumption-capable SAT backend
//! and emulates the permanent/volatile clause-group split (spec §4.6)
//! without ever deleting a clause — `varisat` has no clause-retraction API,
//! so each bound's volatile clauses are guarded by a fresh selector literal
//! that is assumed true only while that bound is the active one.

use std::collections::HashMap;

use varisat::{ExtendFormula, Lit as VLit, Solver as VarisatSolver};

use crate::encoder::{Clause, Lit, VarId};
use crate::error::{EngineError, EngineResult};

fn to_varisat(lit: Lit) -> VLit {
    VLit::from_dimacs(lit.to_dimacs() as isize)
}

fn from_varisat(lit: VLit) -> Lit {
    let dimacs = lit.to_dimacs();
    let var = dimacs.unsigned_abs() as VarId;
    if dimacs > 0 {
        Lit::pos(var)
    } else {
        Lit::neg(var)
    }
}

/// A satisfying assignment, keyed by the encoder's own `VarId`.
pub struct Model {
    assignment: HashMap<VarId, bool>,
}

impl Model {
    pub fn value(&self, var: VarId) -> Option<bool> {
        self.assignment.get(&var).copied()
    }
}

pub struct Solver {
    inner: VarisatSolver<'static>,
}

impl Solver {
    pub fn new() -> Self {
        Solver {
            inner: VarisatSolver::new(),
        }
    }

    /// `varisat` always supports assumption-based incremental solving;
    /// spec §7 item 1's precondition check is against this.
    pub fn is_assumption_capable() -> bool {
        true
    }

    /// Add clauses that must hold forever (permanent group): definitional
    /// clauses from CNF conversion, and any constraint proven k-invariant.
    pub fn add_permanent(&mut self, clauses: impl IntoIterator<Item = Clause>) {
        for clause in clauses {
            let lits: Vec<VLit> = clause.into_iter().map(to_varisat).collect();
            self.inner.add_clause(&lits);
        }
    }

    /// Add clauses valid only for the bound currently being closed
    /// (volatile group), guarded by `selector` — the caller must pass
    /// `selector` as an assumption on the next `solve` for these to bite.
    pub fn add_volatile(&mut self, clauses: impl IntoIterator<Item = Clause>, selector: VarId) {
        let sel_lit = VLit::from_dimacs(selector as isize);
        for clause in clauses {
            let mut lits: Vec<VLit> = clause.into_iter().map(to_varisat).collect();
            lits.push(!sel_lit);
            self.inner.add_clause(&lits);
        }
    }

    /// Solve under exactly the given assumption literals. The caller is
    /// responsible for including the current bound's selector literal when
    /// the volatile (closing) constraints should take part — omitting it
    /// leaves those clauses vacuously satisfied (spec §4.6's group split).
    pub fn solve(&mut self, assumptions: &[Lit]) -> EngineResult<Option<Model>> {
        let lits: Vec<VLit> = assumptions.iter().map(|l| to_varisat(*l)).collect();
        self.inner.assume(&lits);
        let sat = self
            .inner
            .solve()
            .map_err(|_| EngineError::SolverInternal)?;
        if !sat {
            return Ok(None);
        }
        let model = self.inner.model().ok_or(EngineError::SolverInternal)?;
        let mut assignment = HashMap::new();
        for lit in model {
            let dimacs = lit.to_dimacs();
            let var = dimacs.unsigned_abs() as VarId;
            assignment.insert(var, dimacs > 0);
        }
        Ok(Some(Model { assignment }))
    }

    /// The literals of the last UNSAT call's conflict clause (unsat core),
    /// mapped back to this crate's `Lit` type. Used by the assumption
    /// variant to report which caller atoms (and, when present,
    /// `ass_SimplePath`) were responsible for the contradiction.
    pub fn failed_core(&self) -> Vec<Lit> {
        self.inner
            .failed_core()
            .iter()
            .map(|l| from_varisat(*l))
            .collect()
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}
