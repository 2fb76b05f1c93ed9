//! Vim-style modes.
//!
//! The engine is always in exactly one [`Mode`]. Modes that carry context
//! hold it as payload: operator-pending knows which operator (and count and
//! register) is waiting for a target, search knows its direction. The
//! transition logic itself lives in [`crate::machine`]; this module is the
//! pure data.
//!
//! | Mode             | Keys are...                           |
//! |------------------|---------------------------------------|
//! | Normal           | commands                              |
//! | Insert           | text                                  |
//! | Visual (3 kinds) | motions extending a selection         |
//! | Replace          | text overwriting the buffer           |
//! | OperatorPending  | the motion / text object for `d`, `c` |
//! | SearchInProgress | a `/` or `?` pattern                  |
//! | CommandLine      | an `:` Ex command                     |
//! | Disabled         | passed straight through to the host   |

use std::fmt;

use bitflags::bitflags;

use crate::action::Operator;
use crate::search::SearchDirection;

// ---------------------------------------------------------------------------
// VisualKind
// ---------------------------------------------------------------------------

/// The sub-mode of visual selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualKind {
    /// `v` — character-wise selection.
    Char,
    /// `V` — line-wise selection.
    Line,
    /// `Ctrl-V` — block (column) selection.
    Block,
}

// ---------------------------------------------------------------------------
// PendingOperator
// ---------------------------------------------------------------------------

/// What operator-pending mode is waiting to complete.
///
/// `count` is the count typed before the operator (`2` in `2d3w`); a count
/// typed after it multiplies in when the motion resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingOperator {
    pub operator: Operator,
    pub count: Option<usize>,
    pub register: Option<char>,
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// The current editing mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    Normal,
    Insert,
    Visual(VisualKind),
    /// `R` — continuous overwrite until Esc.
    Replace,
    OperatorPending(PendingOperator),
    SearchInProgress(SearchDirection),
    CommandLine,
    /// Suspended: every key except the toggle goes to the host untouched.
    Disabled,
}

bitflags! {
    /// A set of modes. Grammar entries and remaps are scoped by one of these.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModeSet: u16 {
        const NORMAL           = 1 << 0;
        const INSERT           = 1 << 1;
        const VISUAL           = 1 << 2;
        const VISUAL_LINE      = 1 << 3;
        const VISUAL_BLOCK     = 1 << 4;
        const REPLACE          = 1 << 5;
        const OPERATOR_PENDING = 1 << 6;
        const SEARCH           = 1 << 7;
        const COMMAND_LINE     = 1 << 8;
        const DISABLED         = 1 << 9;

        const ANY_VISUAL = Self::VISUAL.bits() | Self::VISUAL_LINE.bits() | Self::VISUAL_BLOCK.bits();
        /// Where motions apply: normal, visual, and as operator targets.
        const MOTION = Self::NORMAL.bits() | Self::ANY_VISUAL.bits() | Self::OPERATOR_PENDING.bits();
        const TYPING = Self::INSERT.bits() | Self::REPLACE.bits();
        const PROMPT = Self::SEARCH.bits() | Self::COMMAND_LINE.bits();
    }
}

impl Mode {
    /// Human-readable name for the status line.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Insert => "INSERT",
            Self::Visual(kind) => match kind {
                VisualKind::Char => "VISUAL",
                VisualKind::Line => "VISUAL LINE",
                VisualKind::Block => "VISUAL BLOCK",
            },
            Self::Replace => "REPLACE",
            Self::OperatorPending(_) => "OPERATOR PENDING",
            Self::SearchInProgress(_) => "SEARCH",
            Self::CommandLine => "COMMAND",
            Self::Disabled => "DISABLED",
        }
    }

    /// The single [`ModeSet`] flag for this mode.
    #[must_use]
    pub const fn flag(self) -> ModeSet {
        match self {
            Self::Normal => ModeSet::NORMAL,
            Self::Insert => ModeSet::INSERT,
            Self::Visual(VisualKind::Char) => ModeSet::VISUAL,
            Self::Visual(VisualKind::Line) => ModeSet::VISUAL_LINE,
            Self::Visual(VisualKind::Block) => ModeSet::VISUAL_BLOCK,
            Self::Replace => ModeSet::REPLACE,
            Self::OperatorPending(_) => ModeSet::OPERATOR_PENDING,
            Self::SearchInProgress(_) => ModeSet::SEARCH,
            Self::CommandLine => ModeSet::COMMAND_LINE,
            Self::Disabled => ModeSet::DISABLED,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_visual(self) -> bool {
        matches!(self, Self::Visual(_))
    }

    /// True if keys typed here become text (insert, replace).
    #[inline]
    #[must_use]
    pub const fn is_typing(self) -> bool {
        matches!(self, Self::Insert | Self::Replace)
    }

    /// True for the `:` / `/` / `?` prompts.
    #[inline]
    #[must_use]
    pub const fn is_prompt(self) -> bool {
        matches!(self, Self::CommandLine | Self::SearchInProgress(_))
    }

    /// Whether leading digits build a count here.
    #[inline]
    #[must_use]
    pub const fn accepts_count(self) -> bool {
        matches!(self, Self::Normal | Self::Visual(_) | Self::OperatorPending(_))
    }

    /// Whether a `"x` register prefix is allowed here.
    #[inline]
    #[must_use]
    pub const fn accepts_register(self) -> bool {
        matches!(self, Self::Normal | Self::Visual(_))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Mode {
        Mode::OperatorPending(PendingOperator {
            operator: Operator::Delete,
            count: None,
            register: None,
        })
    }

    // -- Display names ------------------------------------------------------

    #[test]
    fn mode_display_names() {
        assert_eq!(Mode::Normal.display_name(), "NORMAL");
        assert_eq!(Mode::Visual(VisualKind::Line).to_string(), "VISUAL LINE");
        assert_eq!(pending().to_string(), "OPERATOR PENDING");
        assert_eq!(
            Mode::SearchInProgress(SearchDirection::Backward).to_string(),
            "SEARCH"
        );
    }

    // -- Flags --------------------------------------------------------------

    #[test]
    fn every_mode_has_one_flag() {
        let modes = [
            Mode::Normal,
            Mode::Insert,
            Mode::Visual(VisualKind::Char),
            Mode::Visual(VisualKind::Line),
            Mode::Visual(VisualKind::Block),
            Mode::Replace,
            pending(),
            Mode::SearchInProgress(SearchDirection::Forward),
            Mode::CommandLine,
            Mode::Disabled,
        ];
        let mut seen = ModeSet::empty();
        for m in modes {
            assert_eq!(m.flag().bits().count_ones(), 1, "{m:?}");
            assert!(!seen.intersects(m.flag()), "{m:?} shares a flag");
            seen |= m.flag();
        }
        assert_eq!(seen, ModeSet::all());
    }

    #[test]
    fn group_flags() {
        assert!(ModeSet::MOTION.contains(pending().flag()));
        assert!(ModeSet::ANY_VISUAL.contains(Mode::Visual(VisualKind::Block).flag()));
        assert!(!ModeSet::MOTION.contains(ModeSet::INSERT));
    }

    // -- Predicates ---------------------------------------------------------

    #[test]
    fn count_and_register_acceptance() {
        assert!(Mode::Normal.accepts_count());
        assert!(pending().accepts_count());
        assert!(!pending().accepts_register());
        assert!(!Mode::Insert.accepts_count());
        assert!(Mode::Visual(VisualKind::Char).accepts_register());
    }

    #[test]
    fn typing_and_prompt() {
        assert!(Mode::Replace.is_typing());
        assert!(Mode::CommandLine.is_prompt());
        assert!(!Mode::Normal.is_prompt());
    }

    #[test]
    fn default_is_normal() {
        assert_eq!(Mode::default(), Mode::Normal);
    }
}
