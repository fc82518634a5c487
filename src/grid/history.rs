use super::GridSnapshot;
use std::collections::VecDeque;

/// Bounded undo/redo stacks of whole snapshots.
#[derive(Debug, Clone)]
pub(super) struct History {
    undo: VecDeque<GridSnapshot>,
    redo: Vec<GridSnapshot>,
    limit: usize,
}

impl History {
    pub(super) fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit,
        }
    }

    /// Remembers the state an edit replaced. Any redo branch is discarded.
    pub(super) fn record(&mut self, previous: GridSnapshot) {
        self.redo.clear();
        if self.limit == 0 {
            return;
        }
        self.undo.push_back(previous);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    pub(super) fn undo(&mut self, current: &GridSnapshot) -> Option<GridSnapshot> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current.clone());
        Some(previous)
    }

    pub(super) fn redo(&mut self, current: &GridSnapshot) -> Option<GridSnapshot> {
        let next = self.redo.pop()?;
        self.undo.push_back(current.clone());
        Some(next)
    }

    pub(super) fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub(super) fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub(super) fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
