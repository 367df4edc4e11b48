//! State-Vars Registry (C2): tracks which variables participate in
//! equality-of-states constraints, and owns the single-valued auxiliary
//! handles (`l_var`, `LoopExists_var`, `LastState_var`). One instance per
//! verification run; created empty, destroyed at the end of the run (spec
//! §3).

use crate::encoder::{Be, Encoder};

/// A deduplicated, insertion-ordered sequence of names. Spec §3 invariant
/// (i): lists never contain duplicates.
#[derive(Debug, Default, Clone)]
pub struct NameSeq {
    order: Vec<String>,
    seen: std::collections::HashSet<String>,
}

impl NameSeq {
    pub fn push(&mut self, name: &str) {
        if self.seen.insert(name.to_string()) {
            self.order.push(name.to_string());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

pub struct StateVarsRegistry {
    pub transition_state_vars: NameSeq,
    pub formula_state_vars: NameSeq,
    pub formula_input_vars: NameSeq,
    simple_path_system_vars: NameSeq,
    pub translation_vars_pd0: NameSeq,
    pub translation_vars_pdx: NameSeq,
    pub translation_vars_aux: NameSeq,
    l_var: Option<String>,
    loop_exists_var: Option<String>,
    last_state_var: Option<String>,
}

impl StateVarsRegistry {
    pub fn new() -> Self {
        StateVarsRegistry {
            transition_state_vars: NameSeq::default(),
            formula_state_vars: NameSeq::default(),
            formula_input_vars: NameSeq::default(),
            simple_path_system_vars: NameSeq::default(),
            translation_vars_pd0: NameSeq::default(),
            translation_vars_pdx: NameSeq::default(),
            translation_vars_aux: NameSeq::default(),
            l_var: None,
            loop_exists_var: None,
            last_state_var: None,
        }
    }

    /// Recompute `simple_path_system_vars` as the deduplicated union of
    /// `transition_state_vars`, `formula_state_vars` and
    /// `formula_input_vars` (spec §3). Call after all three are populated.
    pub fn rebuild_simple_path_vars(&mut self) {
        self.simple_path_system_vars = NameSeq::default();
        for name in self.transition_state_vars.iter() {
            self.simple_path_system_vars.push(name);
        }
        let formula_state: Vec<String> =
            self.formula_state_vars.iter().map(|s| s.to_string()).collect();
        for name in &formula_state {
            self.simple_path_system_vars.push(name);
        }
        let formula_input: Vec<String> =
            self.formula_input_vars.iter().map(|s| s.to_string()).collect();
        for name in &formula_input {
            self.simple_path_system_vars.push(name);
        }
    }

    pub fn simple_path_system_vars(&self) -> &NameSeq {
        &self.simple_path_system_vars
    }

    pub fn l_var(&self) -> &str {
        self.l_var.as_deref().expect("l_var not yet allocated")
    }

    pub fn loop_exists_var(&self) -> &str {
        self.loop_exists_var
            .as_deref()
            .expect("LoopExists_var not yet allocated")
    }

    pub fn last_state_var(&self) -> &str {
        self.last_state_var
            .as_deref()
            .expect("LastState_var not yet allocated")
    }

    /// Allocate the three single-valued handles exactly once; declares them
    /// as state variables (they are part of the equality-of-states
    /// relation only insofar as `simple_path_system_vars` excludes them —
    /// they are compared separately by C6).
    pub fn allocate_singletons(&mut self, enc: &mut Encoder) {
        if self.l_var.is_none() {
            self.l_var = Some("l".to_string());
        }
        if self.loop_exists_var.is_none() {
            self.loop_exists_var = Some("LoopExists".to_string());
            enc.declare_state_var(self.loop_exists_var.as_ref().unwrap());
        }
        if self.last_state_var.is_none() {
            self.last_state_var = Some("LastState".to_string());
        }
    }

    /// Frozen (untimed) variables never appear in the registry's timed
    /// sequences (spec §3 invariant ii); this is the guard implementers are
    /// told to make explicit (SPEC_FULL "Untimed/frozen variable guard").
    pub fn assert_not_frozen(&self, enc: &Encoder, name: &str) {
        debug_assert!(
            !enc.is_frozen_var(name),
            "frozen variable {name} must never enter the state-vars registry"
        );
    }

    pub fn loop_exists_be(&self, enc: &mut Encoder) -> Be {
        enc.var_untimed(self.loop_exists_var())
    }
}

impl Default for StateVarsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_seq_dedups_on_insert() {
        let mut seq = NameSeq::default();
        seq.push("a");
        seq.push("b");
        seq.push("a");
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn simple_path_vars_is_union_of_three_sources() {
        let mut reg = StateVarsRegistry::new();
        reg.transition_state_vars.push("s");
        reg.formula_state_vars.push("s");
        reg.formula_state_vars.push("p");
        reg.formula_input_vars.push("in0");
        reg.rebuild_simple_path_vars();
        let vars: Vec<_> = reg.simple_path_system_vars().iter().collect();
        assert_eq!(vars, vec!["s", "p", "in0"]);
    }
}
