//! Counterexample reconstruction: turns a satisfying [`Model`] into a
//! readable lasso-shaped trace (prefix states, optional loop-back index).

use std::collections::HashMap;
use std::fmt;

use crate::encoder::Encoder;
use crate::registry::StateVarsRegistry;
use crate::solver::Model;
use crate::time_idx::TimeIdx;

#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub index: u32,
    pub values: HashMap<String, bool>,
}

impl fmt::Display for StateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state {}: {{", self.index)?;
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={}", self.values[*name])?;
        }
        write!(f, "}}")
    }
}

/// A lasso: a finite prefix of states, with `loop_start` pointing back into
/// it when the run closes into a cycle (spec's `L`/`E` pseudo-states).
#[derive(Debug, Clone)]
pub struct Trace {
    pub prefix: Vec<StateSnapshot>,
    pub loop_start: Option<u32>,
}

impl Trace {
    pub fn extract(
        enc: &mut Encoder,
        reg: &StateVarsRegistry,
        model: &Model,
        bound: u32,
    ) -> Trace {
        let mut prefix = Vec::with_capacity(bound as usize + 1);
        let mut loop_start = None;

        for i in 0..=bound {
            let mut values = HashMap::new();
            for name in reg.simple_path_system_vars().iter() {
                let v = enc.var_at(name, TimeIdx::real(i));
                if let Some(id) = enc.var_to_index(&v) {
                    if let Some(val) = model.value(id) {
                        values.insert(name.to_string(), val);
                    }
                }
            }
            prefix.push(StateSnapshot { index: i, values });

            if i > 0 {
                let l_i = enc.var_at(reg.l_var(), TimeIdx::real(i));
                if let Some(id) = enc.var_to_index(&l_i) {
                    if model.value(id) == Some(true) {
                        loop_start = Some(i - 1);
                    }
                }
            }
        }

        Trace { prefix, loop_start }
    }

    pub fn is_lasso(&self) -> bool {
        self.loop_start.is_some()
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for state in &self.prefix {
            writeln!(f, "{state}")?;
        }
        if let Some(ls) = self.loop_start {
            writeln!(f, "(loops back to state {ls})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_display_is_sorted_and_stable() {
        let mut values = HashMap::new();
        values.insert("b".to_string(), true);
        values.insert("a".to_string(), false);
        let snap = StateSnapshot { index: 0, values };
        assert_eq!(snap.to_string(), "state 0: {a=false, b=true}");
    }
}
