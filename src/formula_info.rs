//! Formula Info map (C3): per-subformula past depth, translation variable
//! names, lazily-filled per-time/per-depth BE handles, and the eventuality
//! witnesses for `F`/`G`/`U`/`R` occurrences (spec §3).
//!
//! Keyed by structural hash of the [`Formula`] value itself (design notes:
//! "an explicit `FormulaId → FormulaInfo` table keyed by structural hash,
//! avoiding pointer aliasing games") rather than by `Rc` pointer identity,
//! so two independently-built but structurally-identical subformulas share
//! one entry.

use std::collections::HashMap;

use crate::encoder::Be;
use crate::pltl::Formula;
use crate::time_idx::TimeIdx;

#[derive(Default, Debug)]
pub struct FormulaInfo {
    pub past_depth: u32,
    /// Present iff the subformula is encoded via fresh variables rather
    /// than purely definitionally; length `past_depth + 1` when `Some`.
    pub trans_vars: Option<Vec<String>>,
    /// Sparse per-time, per-depth BE handles; filled lazily by the tableau
    /// builder's materialisation pass (spec §4.2.2).
    trans_bes: HashMap<TimeIdx, Vec<Option<Be>>>,
    pub aux_f_node: Option<String>,
    pub aux_g_node: Option<String>,
}

impl FormulaInfo {
    pub fn new(past_depth: u32) -> Self {
        FormulaInfo {
            past_depth,
            ..Default::default()
        }
    }

    pub fn has_trans_vars(&self) -> bool {
        self.trans_vars.is_some()
    }

    pub fn trans_var_name(&self, depth: u32) -> Option<&str> {
        self.trans_vars
            .as_ref()
            .and_then(|v| v.get(depth as usize))
            .map(|s| s.as_str())
    }

    pub fn get_past(&self, time: TimeIdx, depth: u32) -> Option<Be> {
        self.trans_bes
            .get(&time)
            .and_then(|row| row.get(depth as usize))
            .and_then(|cell| cell.clone())
    }

    /// Fill `[[f]]_time^depth`; panics (a structural-invariant violation,
    /// spec §7 item 4) if `depth` exceeds `past_depth`.
    pub fn set_past(&mut self, time: TimeIdx, depth: u32, be: Be) {
        debug_assert!(
            depth <= self.past_depth,
            "depth {depth} exceeds past_depth {}",
            self.past_depth
        );
        let row = self
            .trans_bes
            .entry(time)
            .or_insert_with(|| vec![None; self.past_depth as usize + 1]);
        if row.len() <= depth as usize {
            row.resize(depth as usize + 1, None);
        }
        row[depth as usize] = Some(be);
    }
}

/// The `FormulaId -> FormulaInfo` table for one verification run.
#[derive(Default)]
pub struct FormulaInfoMap {
    table: HashMap<Formula, FormulaInfo>,
}

impl FormulaInfoMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&mut self, f: &Formula) -> &mut FormulaInfo {
        self.table.entry(f.clone()).or_default()
    }

    pub fn get(&self, f: &Formula) -> Option<&FormulaInfo> {
        self.table.get(f)
    }

    pub fn get_mut(&mut self, f: &Formula) -> Option<&mut FormulaInfo> {
        self.table.get_mut(f)
    }

    pub fn contains(&self, f: &Formula) -> bool {
        self.table.contains_key(f)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structurally_identical_subformulas_share_one_entry() {
        let mut map = FormulaInfoMap::new();
        let a = Formula::globally(Formula::atom("p"));
        let b = Formula::globally(Formula::atom("p"));
        map.entry(&a).past_depth = 3;
        assert_eq!(map.get(&b).unwrap().past_depth, 3);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn past_slot_round_trips_through_encoder() {
        use crate::encoder::Encoder;
        let mut enc = Encoder::new();
        let mut info = FormulaInfo::new(1);
        let be = enc.var_at("aux0", TimeIdx::real(0));
        info.set_past(TimeIdx::real(0), 1, be.clone());
        assert_eq!(info.get_past(TimeIdx::real(0), 1), Some(be));
        assert_eq!(info.get_past(TimeIdx::real(0), 0), None);
    }
}
