//! Time index algebra (C1).
//!
//! The tableau and the unroller never touch raw integers when naming a
//! timed variable: they go through [`TimeIdx`], which gives the two
//! pseudo-states `L` (loop head) and `E` (closing successor) the same type
//! as a real step, while keeping them distinguishable from every real index
//! and from each other. The only property the rest of the engine relies on
//! is the total order `R(i) > E > L` and strict monotonicity in `i`.

use std::fmt;

/// A model time index: a real unrolling step, or one of the two pseudo-states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeIdx {
    /// The loop head, semantically the first state inside the lasso.
    Loop,
    /// The closing successor of the last real state.
    Closing,
    /// A real unrolling step `R(i)`.
    Real(u32),
}

/// Timing tag for a named variable: either pinned to a [`TimeIdx`], or
/// frozen (untimed). Frozen variables never alias a timed one, even when
/// `TimeIdx::Loop`/`Closing` happen to flatten to small indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Timing {
    At(TimeIdx),
    Untimed,
}

impl TimeIdx {
    pub fn real(i: u32) -> Self {
        TimeIdx::Real(i)
    }

    /// The flat, injective, order-preserving index the encoder sees.
    /// `Loop = 0`, `Closing = 1`, `Real(i) = i + 2`; fixed for the run.
    pub fn flat_index(self) -> u64 {
        match self {
            TimeIdx::Loop => 0,
            TimeIdx::Closing => 1,
            TimeIdx::Real(i) => i as u64 + 2,
        }
    }

    /// `Some(k)` for a real step, `None` for the pseudo-states.
    pub fn time_of(self) -> Option<u32> {
        match self {
            TimeIdx::Real(i) => Some(i),
            _ => None,
        }
    }

    pub fn is_pseudo(self) -> bool {
        matches!(self, TimeIdx::Loop | TimeIdx::Closing)
    }
}

impl fmt::Display for TimeIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeIdx::Loop => write!(f, "L"),
            TimeIdx::Closing => write!(f, "E"),
            TimeIdx::Real(i) => write!(f, "{}", i),
        }
    }
}

impl Timing {
    pub fn time_of(self) -> Option<u32> {
        match self {
            Timing::At(t) => t.time_of(),
            Timing::Untimed => None,
        }
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timing::At(t) => write!(f, "{}", t),
            Timing::Untimed => write!(f, "UNTIMED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_spec() {
        assert!(TimeIdx::real(0) > TimeIdx::Closing);
        assert!(TimeIdx::Closing > TimeIdx::Loop);
        assert!(TimeIdx::real(5) > TimeIdx::real(4));
    }

    #[test]
    fn flat_index_is_dense_and_monotone() {
        assert_eq!(TimeIdx::Loop.flat_index(), 0);
        assert_eq!(TimeIdx::Closing.flat_index(), 1);
        for i in 0..10u32 {
            assert_eq!(TimeIdx::real(i).flat_index(), i as u64 + 2);
        }
    }

    #[test]
    fn pseudo_states_have_no_model_time() {
        assert_eq!(TimeIdx::Loop.time_of(), None);
        assert_eq!(TimeIdx::Closing.time_of(), None);
        assert_eq!(TimeIdx::real(3).time_of(), Some(3));
        assert_eq!(Timing::Untimed.time_of(), None);
    }
}
