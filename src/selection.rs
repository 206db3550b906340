/// Selection mode of the debt list.
///
/// `Normal` until the first row is marked, `Selecting` while at least one row
/// is marked. Unmarking the last row, cancelling, or taking the selection for a
/// bulk action returns to `Normal`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SelectionMode {
    #[default]
    Normal,
    /// Marked debt ids in the order they were marked. Never empty.
    Selecting(Vec<i64>),
}

impl SelectionMode {
    pub fn is_selecting(&self) -> bool {
        matches!(self, SelectionMode::Selecting(_))
    }

    pub fn is_selected(&self, debt_id: i64) -> bool {
        self.selected().contains(&debt_id)
    }

    pub fn selected(&self) -> &[i64] {
        match self {
            SelectionMode::Normal => &[],
            SelectionMode::Selecting(ids) => ids,
        }
    }

    /// Mark or unmark a row.
    pub fn toggle(&mut self, debt_id: i64) {
        match self {
            SelectionMode::Normal => *self = SelectionMode::Selecting(vec![debt_id]),
            SelectionMode::Selecting(ids) => {
                if let Some(pos) = ids.iter().position(|id| *id == debt_id) {
                    ids.remove(pos);
                    if ids.is_empty() {
                        *self = SelectionMode::Normal;
                    }
                } else {
                    ids.push(debt_id);
                }
            }
        }
    }

    pub fn cancel(&mut self) {
        *self = SelectionMode::Normal;
    }

    /// Hand the marked ids to a bulk action and leave selection mode.
    pub fn take(&mut self) -> Vec<i64> {
        match std::mem::take(self) {
            SelectionMode::Normal => Vec::new(),
            SelectionMode::Selecting(ids) => ids,
        }
    }

    /// Drop ids that no longer exist, e.g. after the list was reloaded.
    pub fn retain_existing(&mut self, exists: impl Fn(i64) -> bool) {
        if let SelectionMode::Selecting(ids) = self {
            ids.retain(|id| exists(*id));
            if ids.is_empty() {
                *self = SelectionMode::Normal;
            }
        }
    }
}
