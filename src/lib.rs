//! Incremental zigzag Simple Bounded Model Checker for full past-time LTL.
//!
//! Given a finite-state transition system and a PLTL property, this crate
//! decides, for increasing bounds `k = 0, 1, 2, …`, whether a counterexample
//! of length `k` exists, and (when enabled) whether the property's negation
//! is unsatisfiable over all executions up to `k` — completeness.
//!
//! The top-level entry point is [`driver::Driver::check_ltl`].

pub mod closer;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod formula_info;
pub mod fsm;
pub mod pltl;
pub mod registry;
pub mod simple_path;
pub mod solver;
pub mod tableau;
pub mod time_idx;
pub mod trace;
pub mod unroller;

pub use driver::{Driver, RunConfig, Verdict};
pub use error::{Diagnostic, EngineError, EngineResult, Severity};
pub use fsm::{ExplicitFsm, Fsm};
pub use pltl::Formula;
pub use time_idx::TimeIdx;
pub use trace::Trace;
