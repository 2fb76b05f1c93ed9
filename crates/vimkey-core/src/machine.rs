//! Mode state machine — one exhaustive match over `(mode, action)`.
//!
//! [`transition`] is pure: it decides the next mode and names the
//! [`Effect`] the engine has to carry out, without touching the host. The
//! engine applies the effect and may override `next` when the outcome is
//! only known afterwards (a command line that asks to stay open, a prompt
//! backspaced past its start).
//!
//! ```text
//!  Normal ──i a I A o O──▶ Insert ──<Esc>──▶ Normal
//!  Normal ──v V <C-v>────▶ Visual ──same key / <Esc>──▶ Normal
//!  Normal ──d c y …──────▶ OperatorPending ──motion / object──▶ Normal
//!  Normal ──R────────────▶ Replace ──<Esc>──▶ Normal
//!  Normal / Visual ──: / ?──▶ CommandLine / Search ──<CR> / <Esc>──▶ origin
//! ```
//!
//! Operators pressed in Visual apply to the selection at once; Visual never
//! enters OperatorPending. `c` ends in Insert wherever it is applied.

use crate::action::{
    ActionId, InsertEntry, Motion, Operator, PromptKind, ResolvedAction, TextObject,
};
use crate::mode::{Mode, PendingOperator, VisualKind};

/// What an operator acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Motion(Motion),
    Object(TextObject),
    /// The current visual selection.
    Selection(VisualKind),
}

/// The work a transition asks the engine to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Nothing,
    Move {
        motion: Motion,
        count: Option<usize>,
        operand: Option<char>,
    },
    Operate {
        operator: Operator,
        target: Target,
        count: Option<usize>,
        register: Option<char>,
        operand: Option<char>,
    },
    /// A text object typed in Visual: select it.
    SelectObject(TextObject),
    BeginInsert {
        entry: InsertEntry,
        count: usize,
    },
    BeginReplace {
        count: usize,
    },
    /// Leave Insert or Replace.
    EndInsert,
    BeginVisual(VisualKind),
    SwitchVisual(VisualKind),
    EndVisual,
    ReplaceChar {
        ch: Option<char>,
        count: usize,
    },
    Type(char),
    Newline,
    Backspace,
    OpenPrompt(PromptKind),
    PromptType(char),
    PromptBackspace,
    PromptHistory {
        older: bool,
    },
    SubmitPrompt,
    CancelPrompt,
    Undo(usize),
    Redo(usize),
    Paste {
        before: bool,
        count: usize,
        register: Option<char>,
        /// Replace this selection with the register.
        over: Option<VisualKind>,
    },
    RepeatChange(Option<usize>),
    SetMark(Option<char>),
    /// `q{reg}`. `None` when the key after `q` names nothing.
    StartRecording(Option<char>),
    StopRecording,
    PlayMacro {
        register: Option<char>,
        count: usize,
    },
    Changelist {
        older: bool,
        count: usize,
    },
    Jumplist {
        older: bool,
        count: usize,
    },
}

impl Effect {
    /// Effects that start a change `.` can repeat.
    #[must_use]
    pub const fn starts_change(&self) -> bool {
        match self {
            Self::Operate { operator, .. } => operator.is_change(),
            Self::BeginInsert { .. }
            | Self::BeginReplace { .. }
            | Self::ReplaceChar { .. }
            | Self::Paste { .. } => true,
            _ => false,
        }
    }
}

/// Engine facts the match needs besides the mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    /// The mode an open prompt returns to.
    pub prompt_origin: Option<Mode>,
    pub recording: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: Mode,
    pub effect: Effect,
}

impl Transition {
    const fn to(next: Mode, effect: Effect) -> Self {
        Self { next, effect }
    }

    const fn stay(mode: Mode) -> Self {
        Self::to(mode, Effect::Nothing)
    }
}

/// Apply `action` in `mode`.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn transition(mode: Mode, action: &ResolvedAction, ctx: Context) -> Transition {
    use ActionId as A;

    let count = action.count;
    let n = action.count_or_one();
    let operand = action.operand_char();
    let origin = ctx.prompt_origin.unwrap_or(Mode::Normal);
    let after_operator = |op: Operator| {
        if op == Operator::Change {
            Mode::Insert
        } else {
            Mode::Normal
        }
    };

    match (mode, action.action) {
        (Mode::Disabled, _) => Transition::stay(mode),

        // ── Motions ─────────────────────────────────────────────
        (Mode::OperatorPending(p), A::Motion(motion)) => Transition::to(
            after_operator(p.operator),
            Effect::Operate {
                operator: p.operator,
                target: Target::Motion(motion),
                count,
                register: p.register,
                operand,
            },
        ),
        (Mode::OperatorPending(p), A::TextObject(object)) => Transition::to(
            after_operator(p.operator),
            Effect::Operate {
                operator: p.operator,
                target: Target::Object(object),
                count,
                register: p.register,
                operand: None,
            },
        ),
        (_, A::Motion(motion)) if !mode.is_prompt() => Transition::to(
            mode,
            Effect::Move {
                motion,
                count,
                operand,
            },
        ),
        (Mode::Visual(_), A::TextObject(object)) => {
            Transition::to(mode, Effect::SelectObject(object))
        }

        // ── Operators ───────────────────────────────────────────
        (Mode::Normal, A::Operator(operator)) => Transition::stay(Mode::OperatorPending(
            PendingOperator {
                operator,
                count,
                register: action.register,
            },
        )),
        (Mode::Visual(kind), A::Operator(operator)) => Transition::to(
            after_operator(operator),
            Effect::Operate {
                operator,
                target: Target::Selection(kind),
                count: None,
                register: action.register,
                operand: None,
            },
        ),
        (Mode::Normal, A::OperatorMotion(operator, motion)) => Transition::to(
            after_operator(operator),
            Effect::Operate {
                operator,
                target: Target::Motion(motion),
                count,
                register: action.register,
                operand: None,
            },
        ),

        // ── Mode entry ──────────────────────────────────────────
        (Mode::Normal, A::Insert(entry)) => {
            Transition::to(Mode::Insert, Effect::BeginInsert { entry, count: n })
        }
        (Mode::Normal, A::ReplaceMode) => {
            Transition::to(Mode::Replace, Effect::BeginReplace { count: n })
        }
        (Mode::Normal, A::Visual(kind)) => {
            Transition::to(Mode::Visual(kind), Effect::BeginVisual(kind))
        }
        (Mode::Visual(current), A::Visual(kind)) if current == kind => {
            Transition::to(Mode::Normal, Effect::EndVisual)
        }
        (Mode::Visual(_), A::Visual(kind)) => {
            Transition::to(Mode::Visual(kind), Effect::SwitchVisual(kind))
        }
        (Mode::Normal | Mode::Visual(_), A::Prompt(kind)) => {
            let next = match kind {
                PromptKind::Ex => Mode::CommandLine,
                PromptKind::Search(dir) => Mode::SearchInProgress(dir),
            };
            Transition::to(next, Effect::OpenPrompt(kind))
        }

        // ── Escape ──────────────────────────────────────────────
        (Mode::Insert | Mode::Replace, A::Escape) => {
            Transition::to(Mode::Normal, Effect::EndInsert)
        }
        (Mode::Visual(_), A::Escape) => Transition::to(Mode::Normal, Effect::EndVisual),
        (Mode::CommandLine | Mode::SearchInProgress(_), A::Escape) => {
            Transition::to(origin, Effect::CancelPrompt)
        }
        (Mode::Normal | Mode::OperatorPending(_), A::Escape) => Transition::stay(Mode::Normal),

        // ── Typing ──────────────────────────────────────────────
        (Mode::Insert | Mode::Replace, A::TypeText) => match operand_text(action) {
            Some(ch) => Transition::to(mode, Effect::Type(ch)),
            None => Transition::stay(mode),
        },
        (Mode::Insert | Mode::Replace, A::Newline) => Transition::to(mode, Effect::Newline),
        (Mode::Insert | Mode::Replace, A::Backspace) => Transition::to(mode, Effect::Backspace),

        // ── Prompts ─────────────────────────────────────────────
        (Mode::CommandLine | Mode::SearchInProgress(_), A::TypeText) => {
            match operand_text(action) {
                Some(ch) => Transition::to(mode, Effect::PromptType(ch)),
                None => Transition::stay(mode),
            }
        }
        (Mode::CommandLine | Mode::SearchInProgress(_), A::Backspace) => {
            Transition::to(mode, Effect::PromptBackspace)
        }
        (Mode::CommandLine | Mode::SearchInProgress(_), A::HistoryPrev) => {
            Transition::to(mode, Effect::PromptHistory { older: true })
        }
        (Mode::CommandLine | Mode::SearchInProgress(_), A::HistoryNext) => {
            Transition::to(mode, Effect::PromptHistory { older: false })
        }
        (Mode::CommandLine | Mode::SearchInProgress(_), A::Submit) => {
            Transition::to(origin, Effect::SubmitPrompt)
        }

        // ── Normal-mode commands ────────────────────────────────
        (Mode::Normal, A::ReplaceChar) => Transition::to(
            Mode::Normal,
            Effect::ReplaceChar {
                ch: operand,
                count: n,
            },
        ),
        (Mode::Normal, A::Undo) => Transition::to(Mode::Normal, Effect::Undo(n)),
        (Mode::Normal, A::Redo) => Transition::to(Mode::Normal, Effect::Redo(n)),
        (Mode::Normal, A::Paste { before }) => Transition::to(
            Mode::Normal,
            Effect::Paste {
                before,
                count: n,
                register: action.register,
                over: None,
            },
        ),
        (Mode::Visual(kind), A::Paste { .. }) => Transition::to(
            Mode::Normal,
            Effect::Paste {
                before: true,
                count: n,
                register: action.register,
                over: Some(kind),
            },
        ),
        (Mode::Normal, A::RepeatChange) => {
            Transition::to(Mode::Normal, Effect::RepeatChange(count))
        }
        (Mode::Normal, A::SetMark) => Transition::to(Mode::Normal, Effect::SetMark(operand)),
        (Mode::Normal | Mode::Visual(_), A::RecordMacro) => {
            let effect = if ctx.recording {
                Effect::StopRecording
            } else {
                Effect::StartRecording(operand)
            };
            Transition::to(mode, effect)
        }
        (Mode::Normal, A::PlayMacro) => Transition::to(
            Mode::Normal,
            Effect::PlayMacro {
                register: operand,
                count: n,
            },
        ),
        (Mode::Normal, A::ChangeOlder | A::ChangeNewer) => Transition::to(
            Mode::Normal,
            Effect::Changelist {
                older: action.action == A::ChangeOlder,
                count: n,
            },
        ),
        (Mode::Normal, A::JumpOlder | A::JumpNewer) => Transition::to(
            Mode::Normal,
            Effect::Jumplist {
                older: action.action == A::JumpOlder,
                count: n,
            },
        ),

        // Anything else is meaningless here: an operator typed while one is
        // pending cancels it, everything else is ignored.
        (Mode::OperatorPending(_), _) => Transition::stay(Mode::Normal),
        _ => Transition::stay(mode),
    }
}

/// The text a typed key inserts.
fn operand_text(action: &ResolvedAction) -> Option<char> {
    action.operands.first().and_then(|k| k.typed_text())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vimkey_input::KeyToken;

    use crate::action::{FindKind, ObjectKind};
    use crate::search::SearchDirection;

    fn act(action: ActionId) -> ResolvedAction {
        ResolvedAction {
            action,
            operator: None,
            count: None,
            register: None,
            operands: Vec::new(),
            keys: Vec::new(),
        }
    }

    fn with_count(action: ActionId, count: usize) -> ResolvedAction {
        ResolvedAction {
            count: Some(count),
            ..act(action)
        }
    }

    fn go(mode: Mode, action: &ResolvedAction) -> Transition {
        transition(mode, action, Context::default())
    }

    fn pending(operator: Operator) -> Mode {
        Mode::OperatorPending(PendingOperator {
            operator,
            count: None,
            register: None,
        })
    }

    // -- Operators -----------------------------------------------------------

    #[test]
    fn operator_enters_pending_with_count() {
        let t = go(Mode::Normal, &with_count(ActionId::Operator(Operator::Delete), 2));
        assert_eq!(
            t.next,
            Mode::OperatorPending(PendingOperator {
                operator: Operator::Delete,
                count: Some(2),
                register: None,
            })
        );
        assert_eq!(t.effect, Effect::Nothing);
    }

    #[test]
    fn motion_completes_pending_operator() {
        let t = go(
            pending(Operator::Delete),
            &with_count(ActionId::Motion(Motion::WordForward), 2),
        );
        assert_eq!(t.next, Mode::Normal);
        assert_eq!(
            t.effect,
            Effect::Operate {
                operator: Operator::Delete,
                target: Target::Motion(Motion::WordForward),
                count: Some(2),
                register: None,
                operand: None,
            }
        );
    }

    #[test]
    fn change_ends_in_insert() {
        let object = TextObject {
            inner: true,
            kind: ObjectKind::Word,
        };
        let t = go(pending(Operator::Change), &act(ActionId::TextObject(object)));
        assert_eq!(t.next, Mode::Insert);
        let t = go(
            Mode::Normal,
            &act(ActionId::OperatorMotion(Operator::Change, Motion::LineEnd)),
        );
        assert_eq!(t.next, Mode::Insert);
    }

    #[test]
    fn visual_operator_applies_at_once() {
        let t = go(
            Mode::Visual(VisualKind::Line),
            &act(ActionId::Operator(Operator::Yank)),
        );
        assert_eq!(t.next, Mode::Normal);
        assert!(matches!(
            t.effect,
            Effect::Operate {
                target: Target::Selection(VisualKind::Line),
                ..
            }
        ));
    }

    #[test]
    fn stray_key_cancels_pending_operator() {
        let t = go(pending(Operator::Yank), &act(ActionId::Undo));
        assert_eq!(t, Transition::stay(Mode::Normal));
    }

    // -- Visual --------------------------------------------------------------

    #[test]
    fn visual_toggle_and_switch() {
        let v = ActionId::Visual(VisualKind::Char);
        let line = ActionId::Visual(VisualKind::Line);
        assert_eq!(go(Mode::Normal, &act(v)).next, Mode::Visual(VisualKind::Char));
        assert_eq!(go(Mode::Visual(VisualKind::Char), &act(v)).next, Mode::Normal);
        let t = go(Mode::Visual(VisualKind::Char), &act(line));
        assert_eq!(t.next, Mode::Visual(VisualKind::Line));
        assert_eq!(t.effect, Effect::SwitchVisual(VisualKind::Line));
    }

    // -- Escape --------------------------------------------------------------

    #[test]
    fn escape_from_every_mode() {
        let esc = act(ActionId::Escape);
        let origin = Context {
            prompt_origin: Some(Mode::Visual(VisualKind::Char)),
            recording: false,
        };
        assert_eq!(go(Mode::Insert, &esc).effect, Effect::EndInsert);
        assert_eq!(go(Mode::Replace, &esc).next, Mode::Normal);
        assert_eq!(go(Mode::Visual(VisualKind::Block), &esc).next, Mode::Normal);
        assert_eq!(go(pending(Operator::Delete), &esc).next, Mode::Normal);
        assert_eq!(go(Mode::Normal, &esc).next, Mode::Normal);
        let t = transition(Mode::CommandLine, &esc, origin);
        assert_eq!(t.next, Mode::Visual(VisualKind::Char));
        assert_eq!(t.effect, Effect::CancelPrompt);
    }

    // -- Typing and prompts --------------------------------------------------

    #[test]
    fn typed_text_in_insert_and_prompt() {
        let typed = ResolvedAction {
            operands: vec![KeyToken::from_char('x')],
            ..act(ActionId::TypeText)
        };
        assert_eq!(go(Mode::Insert, &typed).effect, Effect::Type('x'));
        assert_eq!(go(Mode::CommandLine, &typed).effect, Effect::PromptType('x'));
    }

    #[test]
    fn prompt_entry_and_submit() {
        let search = act(ActionId::Prompt(PromptKind::Search(SearchDirection::Backward)));
        let t = go(Mode::Normal, &search);
        assert_eq!(t.next, Mode::SearchInProgress(SearchDirection::Backward));
        let t = go(t.next, &act(ActionId::Submit));
        assert_eq!(t.next, Mode::Normal);
        assert_eq!(t.effect, Effect::SubmitPrompt);
    }

    // -- Misc ----------------------------------------------------------------

    #[test]
    fn record_toggles() {
        let q = ResolvedAction {
            operands: vec![KeyToken::from_char('a')],
            ..act(ActionId::RecordMacro)
        };
        assert_eq!(go(Mode::Normal, &q).effect, Effect::StartRecording(Some('a')));
        let ctx = Context {
            prompt_origin: None,
            recording: true,
        };
        assert_eq!(
            transition(Mode::Normal, &act(ActionId::RecordMacro), ctx).effect,
            Effect::StopRecording
        );
    }

    #[test]
    fn motions_move_in_insert() {
        let t = go(Mode::Insert, &act(ActionId::Motion(Motion::Left)));
        assert_eq!(t.next, Mode::Insert);
        assert!(matches!(t.effect, Effect::Move { motion: Motion::Left, .. }));
    }

    #[test]
    fn starts_change() {
        let find = Effect::Move {
            motion: Motion::FindChar(FindKind::Forward),
            count: None,
            operand: Some('x'),
        };
        assert!(!find.starts_change());
        assert!(Effect::BeginInsert { entry: InsertEntry::Before, count: 1 }.starts_change());
        assert!(
            !Effect::Operate {
                operator: Operator::Yank,
                target: Target::Motion(Motion::Lines),
                count: None,
                register: None,
                operand: None,
            }
            .starts_change()
        );
    }

    #[test]
    fn disabled_ignores_everything() {
        assert_eq!(go(Mode::Disabled, &act(ActionId::Escape)), Transition::stay(Mode::Disabled));
    }
}
