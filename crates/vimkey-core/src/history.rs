//! History tracker — undo steps correlated with the host's undo stack.
//!
//! The host owns the text and its native undo stack. What Vim adds on top
//! is *where the cursor goes*: after `u` the cursor returns to where it was
//! before the change, not wherever the host's undo left it. Each engine
//! command that changes text is one [`HistoryStep`]:
//!
//! ```text
//! tracker.begin(cursor);
//! host.apply_edit(..);  tracker.record(range);   // once per host edit
//! tracker.commit(cursor);                         // insert: at <Esc>
//! ```
//!
//! A step remembers how many host edits it spans, so undoing it rewinds the
//! host exactly that far. When the host undoes on its own (a menu item, a
//! toolbar), the tracker follows along with [`HistoryTracker::follow_undo`]
//! and only restores the cursor.
//!
//! The tracker also holds the per-editor jump list and marks.

use std::collections::HashMap;

use log::debug;

use crate::error::UserError;
use crate::host::EditorHost;
use crate::jumplist::JumpList;
use crate::position::{Position, Range};

/// One undoable engine command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStep {
    pub cursor_before: Position,
    pub cursor_after: Position,
    /// Ranges handed to the host, in order.
    pub changes: Vec<Range>,
    /// Host undo entries this step spans.
    pub host_edits: usize,
}

impl HistoryStep {
    const fn open(cursor: Position) -> Self {
        Self {
            cursor_before: cursor,
            cursor_after: cursor,
            changes: Vec::new(),
            host_edits: 0,
        }
    }
}

/// Undo steps, jump list, and marks for one editor.
#[derive(Debug, Default)]
pub struct HistoryTracker {
    undo: Vec<HistoryStep>,
    redo: Vec<HistoryStep>,
    pending: Option<HistoryStep>,
    jumps: JumpList,
    marks: HashMap<char, Position>,
}

impl HistoryTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Recording ───────────────────────────────────────────────────

    /// Open a step. A step already open stays open, so `cw` and the text
    /// typed afterwards undo together.
    pub fn begin(&mut self, cursor: Position) {
        if self.pending.is_none() {
            self.pending = Some(HistoryStep::open(cursor));
        }
    }

    /// Note one host edit covering `range`.
    pub fn record(&mut self, range: Range) {
        let step = self
            .pending
            .get_or_insert_with(|| HistoryStep::open(range.start));
        step.changes.push(range);
        step.host_edits += 1;
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    /// Close the open step. Returns where the change happened (for the
    /// changelist), or `None` if nothing was edited.
    pub fn commit(&mut self, cursor: Position) -> Option<Position> {
        let mut step = self.pending.take()?;
        if step.host_edits == 0 {
            return None;
        }
        step.cursor_after = cursor;
        let at = step.changes.last().map_or(cursor, |r| r.start);
        self.redo.clear();
        self.undo.push(step);
        Some(at)
    }

    // ── Traversal ───────────────────────────────────────────────────

    /// Undo one step through the host. Returns the cursor to restore.
    ///
    /// # Errors
    ///
    /// [`UserError::AlreadyOldest`] with nothing to undo.
    pub fn undo(&mut self, host: &mut dyn EditorHost) -> Result<Position, UserError> {
        if let Some(cursor) = self.pending.as_ref().map(|s| s.cursor_after) {
            self.commit(cursor);
        }
        let step = self.undo.pop().ok_or(UserError::AlreadyOldest)?;
        for _ in 0..step.host_edits {
            if !host.undo() {
                break;
            }
        }
        debug!("undo step ({} host edits)", step.host_edits);
        let cursor = step.cursor_before;
        self.redo.push(step);
        Ok(cursor)
    }

    /// Redo one step through the host.
    ///
    /// # Errors
    ///
    /// [`UserError::AlreadyNewest`] with nothing to redo.
    pub fn redo(&mut self, host: &mut dyn EditorHost) -> Result<Position, UserError> {
        let step = self.redo.pop().ok_or(UserError::AlreadyNewest)?;
        for _ in 0..step.host_edits {
            if !host.redo() {
                break;
            }
        }
        debug!("redo step ({} host edits)", step.host_edits);
        let cursor = step.cursor_after;
        self.undo.push(step);
        Ok(cursor)
    }

    /// The host undid one step by itself; move along without touching it.
    pub fn follow_undo(&mut self) -> Option<Position> {
        let step = self.undo.pop()?;
        let cursor = step.cursor_before;
        self.redo.push(step);
        Some(cursor)
    }

    /// The host redid one step by itself.
    pub fn follow_redo(&mut self) -> Option<Position> {
        let step = self.redo.pop()?;
        let cursor = step.cursor_after;
        self.undo.push(step);
        Some(cursor)
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// The most recent committed step.
    #[must_use]
    pub fn last_step(&self) -> Option<&HistoryStep> {
        self.undo.last()
    }

    // ── Jumps and marks ─────────────────────────────────────────────

    pub fn push_jump(&mut self, from: Position) {
        self.jumps.push(from);
    }

    /// `Ctrl-O`.
    ///
    /// # Errors
    ///
    /// [`UserError::JumplistStart`] at the oldest entry.
    pub fn jump_older(&mut self, current: Position) -> Result<Position, UserError> {
        self.jumps.older(current).ok_or(UserError::JumplistStart)
    }

    /// `Ctrl-I`.
    ///
    /// # Errors
    ///
    /// [`UserError::JumplistEnd`] at the newest entry.
    pub fn jump_newer(&mut self) -> Result<Position, UserError> {
        self.jumps.newer().ok_or(UserError::JumplistEnd)
    }

    pub fn set_mark(&mut self, name: char, pos: Position) {
        self.marks.insert(name, pos);
    }

    /// # Errors
    ///
    /// [`UserError::MarkNotSet`] for an unset mark.
    pub fn mark(&self, name: char) -> Result<Position, UserError> {
        self.marks
            .get(&name)
            .copied()
            .ok_or(UserError::MarkNotSet(name))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
