//! Semantic action identifiers.
//!
//! The grammar maps key patterns to an [`ActionId`]; the state machine turns
//! a matched id plus its count, register, and captured operands into a
//! [`ResolvedAction`]. Nothing here says what an action does to text — that
//! is [`crate::exec`]'s business.

use vimkey_input::KeyToken;

use crate::mode::VisualKind;
use crate::search::SearchDirection;

// ---------------------------------------------------------------------------
// Motions
// ---------------------------------------------------------------------------

/// Direction and landing rule for `f`/`F`/`t`/`T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindKind {
    /// `f` — find char forward, land on it.
    Forward,
    /// `F` — find char backward, land on it.
    Backward,
    /// `t` — find char forward, land one before it.
    TillForward,
    /// `T` — find char backward, land one after it.
    TillBackward,
}

impl FindKind {
    /// The opposite direction (for `,`).
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
            Self::TillForward => Self::TillBackward,
            Self::TillBackward => Self::TillForward,
        }
    }
}

/// A cursor motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Motion {
    Left,
    Right,
    Up,
    Down,
    WordForward,
    WordBackward,
    WordEnd,
    BigWordForward,
    BigWordBackward,
    BigWordEnd,
    /// `0`
    LineStart,
    /// `^`
    FirstNonBlank,
    /// `$`
    LineEnd,
    /// `gg` (count = line number)
    FirstLine,
    /// `G` (count = line number)
    LastLine,
    ParagraphForward,
    ParagraphBackward,
    /// `f`/`F`/`t`/`T` + one captured character.
    FindChar(FindKind),
    /// `;`
    RepeatFind,
    /// `,`
    RepeatFindReverse,
    /// `n`
    SearchNext,
    /// `N`
    SearchPrev,
    /// `'x` (line) or `` `x `` (exact) + captured mark name.
    GotoMark { exact: bool },
    /// The current line(s). Never typed directly: produced by the
    /// doubled-operator rule (`dd`, `yy`, `>>`).
    Lines,
}

impl Motion {
    /// Jumps are recorded in the jump list before they move the cursor.
    #[must_use]
    pub const fn is_jump(self) -> bool {
        matches!(
            self,
            Self::FirstLine
                | Self::LastLine
                | Self::ParagraphForward
                | Self::ParagraphBackward
                | Self::SearchNext
                | Self::SearchPrev
                | Self::GotoMark { .. }
        )
    }

    /// Linewise motions make operators act on whole lines.
    #[must_use]
    pub const fn is_linewise(self) -> bool {
        matches!(
            self,
            Self::Up
                | Self::Down
                | Self::FirstLine
                | Self::LastLine
                | Self::Lines
                | Self::GotoMark { exact: false }
        )
    }

    /// Inclusive motions cover the character they land on (`e`, `f`, `$`).
    #[must_use]
    pub const fn is_inclusive(self) -> bool {
        matches!(
            self,
            Self::WordEnd
                | Self::BigWordEnd
                | Self::LineEnd
                | Self::FindChar(FindKind::Forward | FindKind::TillForward)
                | Self::RepeatFind
                | Self::RepeatFindReverse
        )
    }
}

// ---------------------------------------------------------------------------
// Operators and text objects
// ---------------------------------------------------------------------------

/// An operator waiting for (or applied to) a target range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Delete,
    Change,
    Yank,
    Indent,
    Outdent,
    Lowercase,
    Uppercase,
    ToggleCase,
}

impl Operator {
    /// Everything except yank modifies the buffer.
    #[must_use]
    pub const fn is_change(self) -> bool {
        !matches!(self, Self::Yank)
    }
}

/// The structural unit a text object selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Word,
    BigWord,
    Paren,
    Square,
    Curly,
    Angle,
    DoubleQuote,
    SingleQuote,
    Backtick,
}

/// `i<kind>` (inner) or `a<kind>` (around).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextObject {
    pub inner: bool,
    pub kind: ObjectKind,
}

// ---------------------------------------------------------------------------
// Mode entries
// ---------------------------------------------------------------------------

/// Where insert mode starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsertEntry {
    /// `i`
    Before,
    /// `a`
    After,
    /// `I`
    FirstNonBlank,
    /// `A`
    LineEnd,
    /// `o`
    OpenBelow,
    /// `O`
    OpenAbove,
}

/// Which prompt a command line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    /// `:` — an Ex command.
    Ex,
    /// `/` or `?` — a search pattern.
    Search(SearchDirection),
}

impl PromptKind {
    /// The character that opened the prompt.
    #[must_use]
    pub const fn leader(self) -> char {
        match self {
            Self::Ex => ':',
            Self::Search(SearchDirection::Forward) => '/',
            Self::Search(SearchDirection::Backward) => '?',
        }
    }
}

// ---------------------------------------------------------------------------
// ActionId
// ---------------------------------------------------------------------------

/// What a grammar entry means. Captured wildcard keys travel separately as
/// operands, so ids stay `Copy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionId {
    Motion(Motion),
    Operator(Operator),
    TextObject(TextObject),
    /// Single-key shorthands: `x` = `dl`, `D` = `d$`, `Y` = `yy`, ...
    OperatorMotion(Operator, Motion),
    Insert(InsertEntry),
    Visual(VisualKind),
    /// `R`
    ReplaceMode,
    /// `r` + captured character.
    ReplaceChar,
    Prompt(PromptKind),
    /// `<Esc>` in modes where it is a plain action (leave insert, leave
    /// visual). The force-stop path handles it everywhere else.
    Escape,
    Undo,
    Redo,
    Paste { before: bool },
    /// `.`
    RepeatChange,
    /// `m` + captured mark name.
    SetMark,
    /// `q` + captured register, or a bare `q` while recording.
    RecordMacro,
    /// `@` + captured register (`@@` = last played).
    PlayMacro,
    /// `g;`
    ChangeOlder,
    /// `g,`
    ChangeNewer,
    /// `<C-o>`
    JumpOlder,
    /// `<C-i>` / `<Tab>`
    JumpNewer,
    /// A printable key typed in insert, replace, or a prompt.
    TypeText,
    /// `<CR>` in insert mode.
    Newline,
    /// `<BS>` in insert, replace, or a prompt.
    Backspace,
    /// `<CR>` in a prompt.
    Submit,
    /// `<Up>` in a prompt.
    HistoryPrev,
    /// `<Down>` in a prompt.
    HistoryNext,
}

impl ActionId {
    /// Actions that modify the buffer and so are what `.` repeats.
    #[must_use]
    pub const fn is_change(self) -> bool {
        match self {
            Self::Operator(op) | Self::OperatorMotion(op, _) => op.is_change(),
            Self::Insert(_) | Self::ReplaceMode | Self::ReplaceChar | Self::Paste { .. } => true,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// ResolvedAction
// ---------------------------------------------------------------------------

/// One fully resolved, executable action — the engine's output stream.
///
/// `2dw` resolves to a single `ResolvedAction` with
/// `action = Motion(WordForward)`, `operator = Some(Delete)`, `count = Some(2)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAction {
    pub action: ActionId,
    /// Set when this action completes an operator.
    pub operator: Option<Operator>,
    /// `None` when no count was typed; effective counts multiply
    /// (`2d3w` → 6).
    pub count: Option<usize>,
    pub register: Option<char>,
    /// Keys captured by wildcard slots (`a` in `fa`).
    pub operands: Vec<KeyToken>,
    /// The keys that produced this action, as the matcher saw them.
    pub keys: Vec<KeyToken>,
}

impl ResolvedAction {
    /// Count with the vi default of 1.
    #[inline]
    #[must_use]
    pub fn count_or_one(&self) -> usize {
        self.count.unwrap_or(1)
    }

    /// The first captured operand as a character.
    #[must_use]
    pub fn operand_char(&self) -> Option<char> {
        self.operands.first().and_then(KeyToken::as_char)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
