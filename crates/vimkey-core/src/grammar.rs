//! The action grammar — which key patterns mean what, in which modes.
//!
//! Definitions live in a trie keyed by [`KeyToken`]. Every node remembers
//! the set of modes that can reach an action at or below it, so one walk
//! answers "complete", "prefix of something longer", or "nothing" for the
//! active mode. A pattern may end in one wildcard slot (`f{char}`,
//! `m{char}`) that captures whatever key comes next.
//!
//! Counts and register prefixes never reach the trie; [`crate::recorded`]
//! peels them off first.
//!
//! A few rules sit in front of the trie walk ([`Grammar::resolve`]):
//!
//! 1. In operator-pending mode, repeating the operator (`dd`, `>>`, `gUU`,
//!    `gUgU`) selects whole lines. This is checked before motions so `cc`
//!    doesn't fall into `c` + something.
//! 2. While a macro is recording, a lone `q` stops it.
//! 3. In insert, replace, and the prompts, a single unmatched key that
//!    produces text is typed.

use std::collections::HashMap;

use vimkey_input::{KeyToken, format_keys, parse_keys};

use crate::action::{
    ActionId, FindKind, InsertEntry, Motion, ObjectKind, Operator, PromptKind, TextObject,
};
use crate::error::ConfigError;
use crate::mode::{Mode, ModeSet, VisualKind};
use crate::search::SearchDirection;

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// One element of a key pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    Key(KeyToken),
    /// Any single key, captured as an operand.
    Any,
}

/// A grammar entry: pattern, the modes it applies in, and what it means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDefinition {
    pub pattern: Vec<Slot>,
    pub modes: ModeSet,
    pub action: ActionId,
}

impl ActionDefinition {
    /// Build from notation. A trailing `{char}` is a wildcard slot.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Notation`] if the notation doesn't parse.
    pub fn parse(pattern: &str, modes: ModeSet, action: ActionId) -> Result<Self, ConfigError> {
        let (fixed, wildcard) = pattern
            .strip_suffix("{char}")
            .map_or((pattern, false), |p| (p, true));
        let mut slots: Vec<Slot> = parse_keys(fixed)
            .map_err(|source| ConfigError::Notation {
                field: format!("grammar pattern {pattern:?}"),
                source,
            })?
            .into_iter()
            .map(Slot::Key)
            .collect();
        if wildcard {
            slots.push(Slot::Any);
        }
        Ok(Self {
            pattern: slots,
            modes,
            action,
        })
    }
}

/// What a key sequence resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Complete {
        action: ActionId,
        operands: Vec<KeyToken>,
    },
    /// A strict prefix of at least one entry; wait for more keys.
    Prefix,
    NoMatch,
}

// ---------------------------------------------------------------------------
// Trie
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct Node {
    children: HashMap<KeyToken, Node>,
    wildcard: Option<Box<Node>>,
    actions: Vec<(ModeSet, ActionId)>,
    /// Modes with an action at or below this node.
    reachable: ModeSet,
}

impl Node {
    fn action_for(&self, flag: ModeSet) -> Option<ActionId> {
        self.actions
            .iter()
            .find(|(modes, _)| modes.contains(flag))
            .map(|&(_, action)| action)
    }

    fn child(&self, key: &KeyToken, flag: ModeSet) -> Option<&Self> {
        self.children.get(key).filter(|n| n.reachable.contains(flag))
    }

    fn wildcard_child(&self, flag: ModeSet) -> Option<&Self> {
        self.wildcard
            .as_deref()
            .filter(|n| n.reachable.contains(flag))
    }
}

/// The full set of action definitions.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    root: Node,
    /// Normal-mode key sequence of each operator, for the doubling rule.
    operator_keys: Vec<(Operator, Vec<KeyToken>)>,
    len: usize,
}

impl Grammar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in Vim grammar.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateBinding`] if the table contradicts itself.
    pub fn vim() -> Result<Self, ConfigError> {
        let mut grammar = Self::new();
        for &(pattern, modes, action) in DEFAULTS {
            grammar.define(ActionDefinition::parse(pattern, modes, action)?)?;
        }
        Ok(grammar)
    }

    /// Number of definitions.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Add a definition.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateBinding`] when an entry with the same pattern
    /// already covers one of `def.modes`.
    pub fn define(&mut self, def: ActionDefinition) -> Result<(), ConfigError> {
        let mut node = &mut self.root;
        node.reachable |= def.modes;
        for slot in &def.pattern {
            node = match slot {
                Slot::Key(key) => node.children.entry(key.clone()).or_default(),
                Slot::Any => &mut **node.wildcard.get_or_insert_with(Box::default),
            };
            node.reachable |= def.modes;
        }

        if let Some((modes, _)) = node.actions.iter().find(|(m, _)| m.intersects(def.modes)) {
            let overlap = *modes & def.modes;
            return Err(ConfigError::DuplicateBinding {
                mode: overlap
                    .iter_names()
                    .map(|(name, _)| name)
                    .collect::<Vec<_>>()
                    .join("|"),
                keys: pattern_text(&def.pattern),
            });
        }
        node.actions.push((def.modes, def.action));

        if let ActionId::Operator(op) = def.action {
            if def.modes.contains(ModeSet::NORMAL) {
                let keys = def
                    .pattern
                    .iter()
                    .filter_map(|slot| match slot {
                        Slot::Key(k) => Some(k.clone()),
                        Slot::Any => None,
                    })
                    .collect();
                self.operator_keys.push((op, keys));
            }
        }
        self.len += 1;
        Ok(())
    }

    /// Walk the trie for `command` in `mode`.
    #[must_use]
    pub fn lookup(&self, command: &[KeyToken], mode: Mode) -> Lookup {
        let flag = mode.flag();
        let mut node = &self.root;
        let mut operands = Vec::new();
        for (i, key) in command.iter().enumerate() {
            node = if let Some(next) = node.child(key, flag) {
                next
            } else if let Some(next) = node.wildcard_child(flag) {
                operands.push(key.clone());
                next
            } else {
                return Lookup::NoMatch;
            };
            if let Some(action) = node.action_for(flag) {
                // An exact match wins as soon as it is reached.
                return if i + 1 == command.len() {
                    Lookup::Complete { action, operands }
                } else {
                    Lookup::NoMatch
                };
            }
        }
        if command.is_empty() || !node.reachable.contains(flag) {
            Lookup::NoMatch
        } else {
            Lookup::Prefix
        }
    }

    /// The key sequence that invokes `op` in Normal mode.
    #[must_use]
    pub fn operator_keys(&self, op: Operator) -> Option<&[KeyToken]> {
        self.operator_keys
            .iter()
            .find(|(o, _)| *o == op)
            .map(|(_, keys)| keys.as_slice())
    }

    /// Resolve `command` (count and register already stripped) in `mode`.
    #[must_use]
    pub fn resolve(&self, command: &[KeyToken], mode: Mode, recording: bool) -> Lookup {
        let operator_keys = match mode {
            Mode::OperatorPending(pending) => self.operator_keys(pending.operator),
            _ => None,
        };
        if let Some(keys) = operator_keys {
            let doubled = command == keys
                || (keys.len() > 1 && command.len() == 1 && keys.last() == command.first());
            if doubled {
                return Lookup::Complete {
                    action: ActionId::Motion(Motion::Lines),
                    operands: Vec::new(),
                };
            }
        }

        if recording
            && matches!(mode, Mode::Normal | Mode::Visual(_))
            && command.len() == 1
            && command[0].as_char() == Some('q')
        {
            return Lookup::Complete {
                action: ActionId::RecordMacro,
                operands: Vec::new(),
            };
        }

        match self.lookup(command, mode) {
            Lookup::NoMatch
                if (mode.is_typing() || mode.is_prompt())
                    && command.len() == 1
                    && command[0].typed_text().is_some() =>
            {
                Lookup::Complete {
                    action: ActionId::TypeText,
                    operands: command.to_vec(),
                }
            }
            other => other,
        }
    }
}

fn pattern_text(pattern: &[Slot]) -> String {
    pattern
        .iter()
        .map(|slot| match slot {
            Slot::Key(k) => format_keys(std::slice::from_ref(k)),
            Slot::Any => "{char}".to_string(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Default table
// ---------------------------------------------------------------------------

const MOTION: ModeSet = ModeSet::MOTION;
/// Arrow-style keys also move the cursor while typing.
const MOTION_TYPING: ModeSet = ModeSet::MOTION.union(ModeSet::TYPING);
const NORMAL: ModeSet = ModeSet::NORMAL;
const VISUAL: ModeSet = ModeSet::ANY_VISUAL;
const NORMAL_VISUAL: ModeSet = ModeSet::NORMAL.union(ModeSet::ANY_VISUAL);
const OBJECT: ModeSet = ModeSet::OPERATOR_PENDING.union(ModeSet::ANY_VISUAL);
const TYPING: ModeSet = ModeSet::TYPING;
const PROMPT: ModeSet = ModeSet::PROMPT;
const ENABLED: ModeSet = ModeSet::all().difference(ModeSet::DISABLED);

const fn mv(m: Motion) -> ActionId {
    ActionId::Motion(m)
}

const fn op(o: Operator) -> ActionId {
    ActionId::Operator(o)
}

const fn obj(inner: bool, kind: ObjectKind) -> ActionId {
    ActionId::TextObject(TextObject { inner, kind })
}

const fn short(o: Operator, m: Motion) -> ActionId {
    ActionId::OperatorMotion(o, m)
}

#[rustfmt::skip]
const DEFAULTS: &[(&str, ModeSet, ActionId)] = &[
    // ── Motions ─────────────────────────────────────────────────
    ("h",       MOTION,        mv(Motion::Left)),
    ("<BS>",    MOTION,        mv(Motion::Left)),
    ("<Left>",  MOTION_TYPING, mv(Motion::Left)),
    ("l",       MOTION,        mv(Motion::Right)),
    ("<Space>", MOTION,        mv(Motion::Right)),
    ("<Right>", MOTION_TYPING, mv(Motion::Right)),
    ("j",       MOTION,        mv(Motion::Down)),
    ("<Down>",  MOTION_TYPING, mv(Motion::Down)),
    ("k",       MOTION,        mv(Motion::Up)),
    ("<Up>",    MOTION_TYPING, mv(Motion::Up)),
    ("w",       MOTION,        mv(Motion::WordForward)),
    ("b",       MOTION,        mv(Motion::WordBackward)),
    ("e",       MOTION,        mv(Motion::WordEnd)),
    ("W",       MOTION,        mv(Motion::BigWordForward)),
    ("B",       MOTION,        mv(Motion::BigWordBackward)),
    ("E",       MOTION,        mv(Motion::BigWordEnd)),
    ("0",       MOTION,        mv(Motion::LineStart)),
    ("<Home>",  MOTION_TYPING, mv(Motion::LineStart)),
    ("^",       MOTION,        mv(Motion::FirstNonBlank)),
    ("$",       MOTION,        mv(Motion::LineEnd)),
    ("<End>",   MOTION_TYPING, mv(Motion::LineEnd)),
    ("gg",      MOTION,        mv(Motion::FirstLine)),
    ("G",       MOTION,        mv(Motion::LastLine)),
    ("{",       MOTION,        mv(Motion::ParagraphBackward)),
    ("}",       MOTION,        mv(Motion::ParagraphForward)),
    ("f{char}", MOTION,        mv(Motion::FindChar(FindKind::Forward))),
    ("F{char}", MOTION,        mv(Motion::FindChar(FindKind::Backward))),
    ("t{char}", MOTION,        mv(Motion::FindChar(FindKind::TillForward))),
    ("T{char}", MOTION,        mv(Motion::FindChar(FindKind::TillBackward))),
    (";",       MOTION,        mv(Motion::RepeatFind)),
    (",",       MOTION,        mv(Motion::RepeatFindReverse)),
    ("n",       MOTION,        mv(Motion::SearchNext)),
    ("N",       MOTION,        mv(Motion::SearchPrev)),
    ("'{char}", MOTION,        mv(Motion::GotoMark { exact: false })),
    ("`{char}", MOTION,        mv(Motion::GotoMark { exact: true })),

    // ── Operators ───────────────────────────────────────────────
    ("d",  NORMAL_VISUAL, op(Operator::Delete)),
    ("c",  NORMAL_VISUAL, op(Operator::Change)),
    ("y",  NORMAL_VISUAL, op(Operator::Yank)),
    (">",  NORMAL_VISUAL, op(Operator::Indent)),
    ("<",  NORMAL_VISUAL, op(Operator::Outdent)),
    ("gu", NORMAL_VISUAL, op(Operator::Lowercase)),
    ("gU", NORMAL_VISUAL, op(Operator::Uppercase)),
    ("g~", NORMAL_VISUAL, op(Operator::ToggleCase)),
    ("u",  VISUAL,        op(Operator::Lowercase)),
    ("U",  VISUAL,        op(Operator::Uppercase)),
    ("~",  VISUAL,        op(Operator::ToggleCase)),
    ("x",  VISUAL,        op(Operator::Delete)),
    ("s",  VISUAL,        op(Operator::Change)),

    // ── Text objects ────────────────────────────────────────────
    ("iw", OBJECT, obj(true, ObjectKind::Word)),
    ("aw", OBJECT, obj(false, ObjectKind::Word)),
    ("iW", OBJECT, obj(true, ObjectKind::BigWord)),
    ("aW", OBJECT, obj(false, ObjectKind::BigWord)),
    ("i(", OBJECT, obj(true, ObjectKind::Paren)),
    ("a(", OBJECT, obj(false, ObjectKind::Paren)),
    ("i)", OBJECT, obj(true, ObjectKind::Paren)),
    ("a)", OBJECT, obj(false, ObjectKind::Paren)),
    ("ib", OBJECT, obj(true, ObjectKind::Paren)),
    ("ab", OBJECT, obj(false, ObjectKind::Paren)),
    ("i[", OBJECT, obj(true, ObjectKind::Square)),
    ("a[", OBJECT, obj(false, ObjectKind::Square)),
    ("i]", OBJECT, obj(true, ObjectKind::Square)),
    ("a]", OBJECT, obj(false, ObjectKind::Square)),
    ("i{", OBJECT, obj(true, ObjectKind::Curly)),
    ("a{", OBJECT, obj(false, ObjectKind::Curly)),
    ("i}", OBJECT, obj(true, ObjectKind::Curly)),
    ("a}", OBJECT, obj(false, ObjectKind::Curly)),
    ("iB", OBJECT, obj(true, ObjectKind::Curly)),
    ("aB", OBJECT, obj(false, ObjectKind::Curly)),
    ("i<lt>", OBJECT, obj(true, ObjectKind::Angle)),
    ("a<lt>", OBJECT, obj(false, ObjectKind::Angle)),
    ("i>", OBJECT, obj(true, ObjectKind::Angle)),
    ("a>", OBJECT, obj(false, ObjectKind::Angle)),
    ("i\"", OBJECT, obj(true, ObjectKind::DoubleQuote)),
    ("a\"", OBJECT, obj(false, ObjectKind::DoubleQuote)),
    ("i'", OBJECT, obj(true, ObjectKind::SingleQuote)),
    ("a'", OBJECT, obj(false, ObjectKind::SingleQuote)),
    ("i`", OBJECT, obj(true, ObjectKind::Backtick)),
    ("a`", OBJECT, obj(false, ObjectKind::Backtick)),

    // ── Shortcuts ───────────────────────────────────────────────
    ("x", NORMAL, short(Operator::Delete, Motion::Right)),
    ("X", NORMAL, short(Operator::Delete, Motion::Left)),
    ("D", NORMAL, short(Operator::Delete, Motion::LineEnd)),
    ("C", NORMAL, short(Operator::Change, Motion::LineEnd)),
    ("s", NORMAL, short(Operator::Change, Motion::Right)),
    ("S", NORMAL, short(Operator::Change, Motion::Lines)),
    ("Y", NORMAL, short(Operator::Yank, Motion::Lines)),
    ("~", NORMAL, short(Operator::ToggleCase, Motion::Right)),

    // ── Mode entry ──────────────────────────────────────────────
    ("i",     NORMAL,        ActionId::Insert(InsertEntry::Before)),
    ("a",     NORMAL,        ActionId::Insert(InsertEntry::After)),
    ("I",     NORMAL,        ActionId::Insert(InsertEntry::FirstNonBlank)),
    ("A",     NORMAL,        ActionId::Insert(InsertEntry::LineEnd)),
    ("o",     NORMAL,        ActionId::Insert(InsertEntry::OpenBelow)),
    ("O",     NORMAL,        ActionId::Insert(InsertEntry::OpenAbove)),
    ("v",     NORMAL_VISUAL, ActionId::Visual(VisualKind::Char)),
    ("V",     NORMAL_VISUAL, ActionId::Visual(VisualKind::Line)),
    ("<C-v>", NORMAL_VISUAL, ActionId::Visual(VisualKind::Block)),
    ("R",     NORMAL,        ActionId::ReplaceMode),
    (":",     NORMAL_VISUAL, ActionId::Prompt(PromptKind::Ex)),
    ("/",     NORMAL_VISUAL, ActionId::Prompt(PromptKind::Search(SearchDirection::Forward))),
    ("?",     NORMAL_VISUAL, ActionId::Prompt(PromptKind::Search(SearchDirection::Backward))),
    ("<Esc>", ENABLED,       ActionId::Escape),

    // ── Everything else ─────────────────────────────────────────
    ("r{char}", NORMAL,        ActionId::ReplaceChar),
    ("p",       NORMAL_VISUAL, ActionId::Paste { before: false }),
    ("P",       NORMAL_VISUAL, ActionId::Paste { before: true }),
    ("u",       NORMAL,        ActionId::Undo),
    ("<C-r>",   NORMAL,        ActionId::Redo),
    (".",       NORMAL,        ActionId::RepeatChange),
    ("m{char}", NORMAL,        ActionId::SetMark),
    ("q{char}", NORMAL,        ActionId::RecordMacro),
    ("@{char}", NORMAL,        ActionId::PlayMacro),
    ("g;",      NORMAL,        ActionId::ChangeOlder),
    ("g,",      NORMAL,        ActionId::ChangeNewer),
    ("<C-o>",   NORMAL,        ActionId::JumpOlder),
    ("<C-i>",   NORMAL,        ActionId::JumpNewer),
    ("<Tab>",   NORMAL,        ActionId::JumpNewer),

    // ── Typing and prompts ──────────────────────────────────────
    ("<CR>",   TYPING, ActionId::Newline),
    ("<BS>",   TYPING, ActionId::Backspace),
    ("<CR>",   PROMPT, ActionId::Submit),
    ("<BS>",   PROMPT, ActionId::Backspace),
    ("<Up>",   PROMPT, ActionId::HistoryPrev),
    ("<Down>", PROMPT, ActionId::HistoryNext),
];

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
