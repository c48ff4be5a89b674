// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Linear undo/redo history of full-state snapshots.

/// Snapshot history with a cursor.
///
/// `snapshots[cursor]` is always the current state. Recording after an undo
/// discards every snapshot beyond the cursor; there is no branching.
#[derive(Debug, Clone)]
pub struct EditHistory<T> {
    snapshots: Vec<T>,
    cursor: usize,
    /// Upper bound on stored snapshots; the oldest are dropped first.
    limit: usize,
}

impl<T: Clone> EditHistory<T> {
    /// Start a history whose only snapshot is `initial`.
    pub fn new(initial: T, limit: usize) -> Self {
        Self {
            snapshots: vec![initial],
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// The state at the cursor.
    pub fn current(&self) -> &T {
        &self.snapshots[self.cursor]
    }

    /// Append a snapshot, truncating any redo steps.
    pub fn record(&mut self, state: T) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(state);
        if self.snapshots.len() > self.limit {
            let excess = self.snapshots.len() - self.limit;
            self.snapshots.drain(..excess);
        }
        self.cursor = self.snapshots.len() - 1;
    }

    /// Step back one snapshot. `None` at the start of history.
    pub fn undo(&mut self) -> Option<&T> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(&self.snapshots[self.cursor])
    }

    /// Step forward one snapshot. `None` at the end of history.
    pub fn redo(&mut self) -> Option<&T> {
        if self.cursor + 1 >= self.snapshots.len() {
            return None;
        }
        self.cursor += 1;
        Some(&self.snapshots[self.cursor])
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Number of stored snapshots, current one included.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Apply `edit` to every stored snapshot, keeping the cursor. For changes
    /// that must hold across the whole history, not just the present.
    pub fn rewrite(&mut self, mut edit: impl FnMut(&mut T)) {
        for snapshot in &mut self.snapshots {
            edit(snapshot);
        }
    }

    /// Forget everything and restart from `state`.
    pub fn reset(&mut self, state: T) {
        self.snapshots.clear();
        self.snapshots.push(state);
        self.cursor = 0;
    }
}
