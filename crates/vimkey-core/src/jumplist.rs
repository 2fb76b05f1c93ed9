//! Jump list and changelist.
//!
//! **Jump list** (`Ctrl-O` / `Ctrl-I`): the positions the cursor leapt
//! from on `G`, `gg`, `{`, `}`, searches, and mark jumps. Per editor.
//!
//! **Changelist** (`g;` / `g,`): where text was changed, recorded when an
//! undo step commits. Per document, kept in the shared state.
//!
//! Both are bounded; the oldest entries fall off the front. Walking past
//! either end is not an error — it yields `None`, and the caller decides
//! what message to show.

use std::collections::VecDeque;

use crate::position::Position;

/// Entries kept in either list.
pub const LIST_MAX: usize = 100;

// ---------------------------------------------------------------------------
// JumpList
// ---------------------------------------------------------------------------

/// Positions jumped away from, with a cursor for `Ctrl-O` / `Ctrl-I`.
///
/// `index == entries.len()` means "at the live position" — not walking the
/// list.
#[derive(Debug, Default, Clone)]
pub struct JumpList {
    entries: VecDeque<Position>,
    index: usize,
}

impl JumpList {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            index: 0,
        }
    }

    /// Remember `from` before a jump.
    ///
    /// A new jump forgets anything newer than the walk position. Jumping
    /// from the same line twice keeps one entry.
    pub fn push(&mut self, from: Position) {
        self.entries.truncate(self.index);
        if self.entries.back().is_some_and(|last| last.line == from.line) {
            self.entries.pop_back();
        }
        self.entries.push_back(from);
        while self.entries.len() > LIST_MAX {
            self.entries.pop_front();
        }
        self.index = self.entries.len();
    }

    /// `Ctrl-O`: step back. Leaving the live position records it first so
    /// `Ctrl-I` can return.
    pub fn older(&mut self, current: Position) -> Option<Position> {
        if self.entries.is_empty() || self.index == 0 {
            return None;
        }
        if self.index == self.entries.len() {
            if self.entries.back().is_some_and(|last| last.line == current.line) {
                self.index -= 1;
                if self.index == 0 {
                    return None;
                }
            } else {
                self.entries.push_back(current);
                if self.entries.len() > LIST_MAX + 1 {
                    self.entries.pop_front();
                    self.index -= 1;
                }
            }
        }
        self.index -= 1;
        self.entries.get(self.index).copied()
    }

    /// `Ctrl-I`: step forward again.
    pub fn newer(&mut self) -> Option<Position> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ChangeList
// ---------------------------------------------------------------------------

/// Positions of recent changes. The walk index moves independently of the
/// undo position.
#[derive(Debug, Default, Clone)]
pub struct ChangeList {
    entries: VecDeque<Position>,
    index: usize,
}

impl ChangeList {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            index: 0,
        }
    }

    /// Record a change at `pos`. Consecutive changes on the same line
    /// collapse into one entry. Resets the walk to the newest end.
    pub fn push(&mut self, pos: Position) {
        if self.entries.back().is_some_and(|last| last.line == pos.line) {
            self.entries.pop_back();
        }
        self.entries.push_back(pos);
        while self.entries.len() > LIST_MAX {
            self.entries.pop_front();
        }
        self.index = self.entries.len();
    }

    /// `g;`
    pub fn older(&mut self) -> Option<Position> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index).copied()
    }

    /// `g,`
    pub fn newer(&mut self) -> Option<Position> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
