//! Search state.
//!
//! The engine doesn't match patterns itself — a confirmed `/` or `?` line
//! goes to the command executor like any Ex command. What lives here is the
//! bookkeeping Vim keeps around a search: its direction, where it started,
//! the pattern, and the mode it was typed from, so `n` / `N` can re-issue
//! it and the search history can be browsed.

use crate::mode::Mode;
use crate::position::Position;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Search direction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SearchDirection {
    Forward,
    Backward,
}

impl SearchDirection {
    /// The opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

// ---------------------------------------------------------------------------
// SearchState
// ---------------------------------------------------------------------------

/// A confirmed search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchState {
    pub direction: SearchDirection,
    /// Cursor position when the search was started.
    pub anchor: Position,
    pub pattern: String,
    /// The mode `/` or `?` was pressed in.
    pub origin: Mode,
}

impl SearchState {
    /// The same search pointed the other way (for `N`).
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            direction: self.direction.opposite(),
            ..self.clone()
        }
    }
}
