//! Error and diagnostic types for the zigzag engine.

use thiserror::Error;

/// Fatal errors that abort the current verification run.
///
/// Structural-invariant violations (spec-internal assertion failures, such
/// as an operator arm the tableau builder forgot to handle) are kept out of
/// this enum on purpose: they are programmer errors and surface as panics
/// (`debug_assert!`/`unreachable!`) in the hot encoding paths, not as
/// recoverable results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("precondition violated: {reason}")]
    PreconditionViolated { reason: String },

    #[error("SAT solver reported an internal error")]
    SolverInternal,

    #[error("SAT solver timed out")]
    SolverTimeout,

    #[error("SAT solver exhausted its memory budget")]
    SolverMemOut,

    /// An assertion-style internal invariant (missing `past_array` depth,
    /// missing `InLoop` index, unreachable operator arm) that a call site
    /// chose to surface as a result rather than panic.
    #[error("internal invariant violated: {detail}")]
    StructuralInvariant { detail: String },
}

impl EngineError {
    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::PreconditionViolated {
            reason: reason.into(),
        }
    }

    /// Whether the caller could plausibly retry after adjusting inputs.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PreconditionViolated { .. })
    }
}

/// Result type for all fallible engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Non-fatal observation surfaced alongside a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
}

impl Diagnostic {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Info,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.severity, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_errors_are_recoverable() {
        let err = EngineError::precondition("assumption solver required");
        assert!(err.is_recoverable());
        assert!(!EngineError::SolverTimeout.is_recoverable());
    }

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic::warning("large state space");
        assert!(d.to_string().contains("large state space"));
    }
}
