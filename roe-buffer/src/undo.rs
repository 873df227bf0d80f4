// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Undo/Redo log for piece-chain edits
//!
//! The log is a single stack of actions split by `head`: actions below `head`
//! are applied, actions at or above it are available to redo. Each text action
//! is a list of span-swap records, so undoing replays the swaps backwards with
//! the spans exchanged and redoing replays them forwards.
//!
//! # Grouping
//!
//! An action opens lazily with the first change after a boundary and stays
//! open until the next boundary. Opening an action while redo entries exist
//! truncates them: editing after undo commits to a new future.

use tracing::debug;

use crate::piece::Span;
use crate::position::Position;

/// One recorded span swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    /// Pieces taken out of the chain. Empty for a pure insertion.
    pub old: Span,
    /// Pieces put into the chain. Empty for a pure deletion.
    pub new: Span,
    /// Where the edit began.
    pub at: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Text changes, in the order they were made.
    Edit { changes: Vec<Change>, seq: u64 },
    /// A change of the buffer's backing name.
    Rename {
        previous: String,
        next: String,
        seq: u64,
    },
}

impl Action {
    pub fn seq(&self) -> u64 {
        match self {
            Action::Edit { seq, .. } | Action::Rename { seq, .. } => *seq,
        }
    }
}

/// What an undo or redo step did to the buffer, as observers should see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditEvent {
    Inserted { at: Position, text: Vec<u8> },
    Deleted { start: Position, end: Position },
    Renamed { name: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoResult {
    pub selection_start: Position,
    pub selection_end: Position,
    /// False when there was nothing to undo or redo.
    pub meaningful: bool,
    /// Sequence of the action the next call of the same kind would replay.
    pub next_seq: Option<u64>,
    /// Per-change effects in replay order.
    pub events: Vec<EditEvent>,
}

/// Actions the log let go of. Their pieces may be reclaimed.
#[derive(Debug, Default)]
pub struct Dropped {
    /// Truncated from the redo end; their `new` spans are unreachable.
    pub redo: Vec<Action>,
    /// Trimmed from the front; their `old` spans are unreachable.
    pub expired: Vec<Action>,
}

impl Dropped {
    pub fn is_empty(&self) -> bool {
        self.redo.is_empty() && self.expired.is_empty()
    }
}

#[derive(Debug)]
pub struct UndoLog {
    actions: Vec<Action>,
    /// Actions below this index are applied.
    head: usize,
    /// Whether `actions[head - 1]` still accepts changes.
    open: bool,
    /// `head` at the last clean mark, if that state is still reachable.
    clean: Option<usize>,
    /// Maximum number of actions kept (0 = unlimited).
    max_history: usize,
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new(0)
    }
}

impl UndoLog {
    pub fn new(max_history: usize) -> Self {
        Self {
            actions: Vec::new(),
            head: 0,
            open: false,
            clean: Some(0),
            max_history,
        }
    }

    /// Append a change to the open action, opening one if needed.
    ///
    /// A change carrying a different sequence than the open action starts a
    /// new action, since sequences group edits into one logical operation.
    pub fn record(&mut self, change: Change, seq: u64) -> Dropped {
        if self.open && self.actions[self.head - 1].seq() != seq {
            self.close();
        }
        let mut dropped = Dropped::default();
        if !self.open {
            dropped = self.push(Action::Edit {
                changes: Vec::new(),
                seq,
            });
            self.open = true;
            debug!(seq, head = self.head, "opened undo action");
        }
        if let Some(Action::Edit { changes, .. }) = self.actions.get_mut(self.head - 1) {
            changes.push(change);
        }
        dropped
    }

    /// Record a rename as its own closed action.
    pub fn record_rename(&mut self, previous: String, next: String, seq: u64) -> Dropped {
        self.close();
        self.push(Action::Rename {
            previous,
            next,
            seq,
        })
    }

    fn push(&mut self, action: Action) -> Dropped {
        let mut dropped = Dropped {
            redo: self.actions.split_off(self.head),
            expired: Vec::new(),
        };
        if !dropped.redo.is_empty() {
            debug!(count = dropped.redo.len(), "truncated redo history");
            if self.clean.is_some_and(|clean| clean > self.head) {
                self.clean = None;
            }
        }
        self.actions.push(action);
        self.head += 1;
        dropped.expired = self.trim_history();
        dropped
    }

    fn trim_history(&mut self) -> Vec<Action> {
        if self.max_history == 0 || self.actions.len() <= self.max_history {
            return Vec::new();
        }
        let excess = self.actions.len() - self.max_history;
        debug!(excess, "trimming undo history");
        self.head -= excess;
        self.clean = self.clean.and_then(|clean| clean.checked_sub(excess));
        self.actions.drain(0..excess).collect()
    }

    /// The most recent change of the open action.
    pub fn last_change_mut(&mut self) -> Option<&mut Change> {
        if !self.open {
            return None;
        }
        match self.actions.get_mut(self.head - 1) {
            Some(Action::Edit { changes, .. }) => changes.last_mut(),
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn last_change(&self) -> Option<&Change> {
        match self.actions.get(self.head.checked_sub(1)?) {
            Some(Action::Edit { changes, .. }) => changes.last(),
            _ => None,
        }
    }

    /// Close the open action. Returns whether one was open.
    pub fn close(&mut self) -> bool {
        let was_open = self.open;
        if was_open {
            debug!(head = self.head, "closed undo action");
        }
        self.open = false;
        was_open
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Sequence of the open action, if any.
    pub fn open_seq(&self) -> Option<u64> {
        if self.open {
            self.undo_seq()
        } else {
            None
        }
    }

    /// Step back over the most recent applied action and return it.
    pub fn step_back(&mut self) -> Option<&Action> {
        self.close();
        if self.head == 0 {
            return None;
        }
        self.head -= 1;
        self.actions.get(self.head)
    }

    /// Step forward over the next redoable action and return it.
    pub fn step_forward(&mut self) -> Option<&Action> {
        self.close();
        let action = self.actions.get(self.head)?;
        self.head += 1;
        Some(action)
    }

    pub fn can_undo(&self) -> bool {
        self.head > 0
    }

    pub fn can_redo(&self) -> bool {
        self.head < self.actions.len()
    }

    pub fn undo_seq(&self) -> Option<u64> {
        self.actions.get(self.head.checked_sub(1)?).map(Action::seq)
    }

    pub fn redo_seq(&self) -> Option<u64> {
        self.actions.get(self.head).map(Action::seq)
    }

    pub fn undo_count(&self) -> usize {
        self.head
    }

    pub fn redo_count(&self) -> usize {
        self.actions.len() - self.head
    }

    pub fn mark_clean(&mut self) {
        self.close();
        self.clean = Some(self.head);
    }

    pub fn is_dirty(&self) -> bool {
        self.clean != Some(self.head)
    }

    /// Forget every action. Applied actions come back as `expired`, the rest
    /// as `redo`, matching which of their spans left the chain for good.
    pub fn clear(&mut self) -> Dropped {
        let dirty = self.is_dirty();
        self.open = false;
        let redo = self.actions.split_off(self.head);
        let expired = std::mem::take(&mut self.actions);
        self.head = 0;
        self.clean = if dirty { None } else { Some(0) };
        Dropped { redo, expired }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(at: usize) -> Change {
        Change {
            old: Span::empty(),
            new: Span::empty(),
            at: Position::new(at, at),
        }
    }

    #[test]
    fn test_basic_undo_redo() {
        let mut log = UndoLog::new(0);
        log.record(change(0), 1);
        assert!(log.can_undo());
        assert!(!log.can_redo());
        assert!(log.is_open());

        assert!(log.step_back().is_some());
        assert!(!log.is_open());
        assert!(!log.can_undo());
        assert!(log.can_redo());

        assert!(log.step_forward().is_some());
        assert!(log.can_undo());
        assert!(!log.can_redo());
    }

    #[test]
    fn test_changes_group_until_boundary() {
        let mut log = UndoLog::new(0);
        log.record(change(0), 1);
        log.record(change(1), 1);
        log.record(change(2), 1);
        log.close();
        log.record(change(3), 1);

        assert_eq!(log.undo_count(), 2);
        match log.step_back() {
            Some(Action::Edit { changes, .. }) => assert_eq!(changes.len(), 1),
            other => panic!("expected edit action, got {other:?}"),
        }
        match log.step_back() {
            Some(Action::Edit { changes, .. }) => assert_eq!(changes.len(), 3),
            other => panic!("expected edit action, got {other:?}"),
        }
    }

    #[test]
    fn test_double_boundary_is_idempotent() {
        let mut log = UndoLog::new(0);
        log.record(change(0), 1);
        assert!(log.close());
        assert!(!log.close());
        assert_eq!(log.undo_count(), 1);
        assert_eq!(log.redo_count(), 0);
    }

    #[test]
    fn test_new_sequence_starts_new_action() {
        let mut log = UndoLog::new(0);
        log.record(change(0), 1);
        log.record(change(1), 2);
        assert_eq!(log.undo_count(), 2);
        assert_eq!(log.undo_seq(), Some(2));
    }

    #[test]
    fn test_new_edit_truncates_redo() {
        let mut log = UndoLog::new(0);
        log.record(change(0), 1);
        log.close();
        log.record(change(1), 2);
        log.close();
        log.step_back();
        log.step_back();
        assert_eq!(log.redo_count(), 2);

        let dropped = log.record(change(5), 3);
        assert_eq!(dropped.redo.len(), 2);
        assert!(dropped.expired.is_empty());
        assert!(!log.can_redo());
        assert_eq!(log.undo_count(), 1);
    }

    #[test]
    fn test_history_limit_expires_oldest() {
        let mut log = UndoLog::new(2);
        for seq in 1..=3 {
            let dropped = log.record(change(0), seq);
            log.close();
            if seq == 3 {
                assert_eq!(dropped.expired.len(), 1);
                assert_eq!(dropped.expired[0].seq(), 1);
            }
        }
        assert_eq!(log.undo_count(), 2);
        assert_eq!(log.undo_seq(), Some(3));
    }

    #[test]
    fn test_clean_tracking() {
        let mut log = UndoLog::new(0);
        assert!(!log.is_dirty());
        log.record(change(0), 1);
        assert!(log.is_dirty());
        log.mark_clean();
        assert!(!log.is_dirty());
        log.step_back();
        assert!(log.is_dirty());
        log.step_forward();
        assert!(!log.is_dirty());

        // Truncating past the clean state makes it unreachable
        log.step_back();
        log.record(change(1), 2);
        log.close();
        log.step_back();
        assert!(log.is_dirty());
    }

    #[test]
    fn test_trim_drops_clean_mark() {
        let mut log = UndoLog::new(1);
        log.mark_clean();
        log.record(change(0), 1);
        log.close();
        log.record(change(0), 2);
        log.close();
        log.step_back();
        assert!(log.is_dirty());
    }

    #[test]
    fn test_rename_is_its_own_action() {
        let mut log = UndoLog::new(0);
        log.record(change(0), 1);
        log.record_rename("a.txt".into(), "b.txt".into(), 1);
        assert!(!log.is_open());
        assert_eq!(log.undo_count(), 2);
        match log.step_back() {
            Some(Action::Rename { previous, next, .. }) => {
                assert_eq!(previous, "a.txt");
                assert_eq!(next, "b.txt");
            }
            other => panic!("expected rename, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_history() {
        let mut log = UndoLog::new(0);
        assert!(log.step_back().is_none());
        assert!(log.step_forward().is_none());
        assert_eq!(log.undo_seq(), None);
        assert_eq!(log.redo_seq(), None);
    }
}
