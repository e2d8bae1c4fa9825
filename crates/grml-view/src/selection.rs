//! Function selection shared by both editors.

use grml_core::id::FunctionId;
use serde::{Deserialize, Serialize};

/// How a click modifies the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionMode {
    /// Replace the selection with the target.
    #[default]
    Switch,
    /// Append the target.
    Add,
    /// Toggle the target off when it is selected (ctrl-click).
    CtrlTrue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    None,
    One,
    Many,
}

/// Outcome of [`Selection::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Unchanged,
    /// The selection was emptied.
    Cleared,
    /// The target was added; the property panel follows it.
    Selected(FunctionId),
    /// The target was removed; the property panel is cleared.
    Deselected(FunctionId),
}

impl SelectionChange {
    pub fn changed(&self) -> bool {
        !matches!(self, SelectionChange::Unchanged)
    }
}

/// Ordered set of selected functions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<FunctionId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        match self.ids.len() {
            0 => SelectionState::None,
            1 => SelectionState::One,
            _ => SelectionState::Many,
        }
    }

    pub fn ids(&self) -> &[FunctionId] {
        &self.ids
    }

    pub fn contains(&self, id: FunctionId) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The most recently selected function.
    pub fn last(&self) -> Option<FunctionId> {
        self.ids.last().copied()
    }

    /// Applies a click on `target`, or on the background when `None`.
    pub fn apply(&mut self, target: Option<FunctionId>, mode: SelectionMode) -> SelectionChange {
        let Some(target) = target else {
            self.ids.clear();
            return SelectionChange::Cleared;
        };

        if let Some(index) = self.ids.iter().position(|id| *id == target) {
            return match mode {
                SelectionMode::CtrlTrue => {
                    self.ids.remove(index);
                    SelectionChange::Deselected(target)
                }
                SelectionMode::Switch | SelectionMode::Add => SelectionChange::Unchanged,
            };
        }

        match mode {
            SelectionMode::Switch => self.ids = vec![target],
            SelectionMode::Add => self.ids.push(target),
            SelectionMode::CtrlTrue => return SelectionChange::Unchanged,
        }
        SelectionChange::Selected(target)
    }

    /// Replaces the selection, dropping repeated ids.
    pub fn set(&mut self, ids: impl IntoIterator<Item = FunctionId>) {
        self.ids.clear();
        for id in ids {
            if !self.ids.contains(&id) {
                self.ids.push(id);
            }
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Keeps only ids accepted by `keep`, e.g. functions that still exist.
    pub fn retain(&mut self, keep: impl FnMut(&FunctionId) -> bool) {
        self.ids.retain(keep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_target_clears() {
        let mut s = Selection::new();
        let a = FunctionId::new();
        s.apply(Some(a), SelectionMode::Switch);
        assert_eq!(s.apply(None, SelectionMode::Add), SelectionChange::Cleared);
        assert_eq!(s.state(), SelectionState::None);
    }

    #[test]
    fn switch_replaces_and_add_appends() {
        let mut s = Selection::new();
        let (a, b, c) = (FunctionId::new(), FunctionId::new(), FunctionId::new());
        s.apply(Some(a), SelectionMode::Switch);
        s.apply(Some(b), SelectionMode::Add);
        assert_eq!(s.ids(), &[a, b]);
        assert_eq!(s.state(), SelectionState::Many);

        assert_eq!(s.apply(Some(c), SelectionMode::Switch), SelectionChange::Selected(c));
        assert_eq!(s.ids(), &[c]);
        assert_eq!(s.state(), SelectionState::One);
    }

    #[test]
    fn reselecting_is_a_no_op_unless_ctrl() {
        let mut s = Selection::new();
        let (a, b) = (FunctionId::new(), FunctionId::new());
        s.apply(Some(a), SelectionMode::Switch);
        s.apply(Some(b), SelectionMode::Add);

        assert_eq!(s.apply(Some(a), SelectionMode::Switch), SelectionChange::Unchanged);
        assert_eq!(s.apply(Some(a), SelectionMode::Add), SelectionChange::Unchanged);
        assert_eq!(s.ids(), &[a, b]);

        assert_eq!(s.apply(Some(a), SelectionMode::CtrlTrue), SelectionChange::Deselected(a));
        assert_eq!(s.ids(), &[b]);
    }

    #[test]
    fn ctrl_on_unselected_does_nothing() {
        let mut s = Selection::new();
        let (a, b) = (FunctionId::new(), FunctionId::new());
        s.apply(Some(a), SelectionMode::Switch);
        assert!(!s.apply(Some(b), SelectionMode::CtrlTrue).changed());
        assert_eq!(s.ids(), &[a]);
    }

    #[test]
    fn mode_serializes_like_the_wire_format() {
        assert_eq!(
            serde_json::to_string(&SelectionMode::CtrlTrue).unwrap(),
            "\"CTRL_TRUE\""
        );
    }

    #[test]
    fn set_deduplicates() {
        let mut s = Selection::new();
        let a = FunctionId::new();
        s.set([a, a]);
        assert_eq!(s.ids(), &[a]);
    }

    proptest::proptest! {
        #[test]
        fn selection_never_repeats_ids(
            clicks in proptest::collection::vec((0usize..4, 0u8..4), 0..24)
        ) {
            let pool: Vec<FunctionId> = (0..4).map(|_| FunctionId::new()).collect();
            let mut s = Selection::new();
            for (target, mode) in clicks {
                let mode = match mode {
                    0 => SelectionMode::Switch,
                    1 => SelectionMode::Add,
                    2 => SelectionMode::CtrlTrue,
                    _ => {
                        s.apply(None, SelectionMode::Switch);
                        continue;
                    }
                };
                s.apply(Some(pool[target]), mode);
            }
            let mut seen = s.ids().to_vec();
            seen.sort();
            seen.dedup();
            proptest::prop_assert_eq!(seen.len(), s.ids().len());
        }
    }
}
