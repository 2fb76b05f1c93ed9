//! The recorded key buffer.
//!
//! Everything typed since the last resolved action, split into what the
//! grammar sees (`command`) and what it doesn't: the count digits and the
//! `"x` register prefix. Counts follow vi's rules: `1`-`9` start a count,
//! `0` only extends one that has started. A bare `0` is the line-start
//! motion. A count typed before the register multiplies the one typed
//! after it: `2"a3dw` deletes six words.

use std::fmt;

use vimkey_input::{KeyToken, format_keys};

use crate::mode::Mode;

/// Counts saturate here instead of overflowing.
const COUNT_MAX: usize = 999_999_999;

/// Where the command stands after the last key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandStatus {
    /// Nothing typed yet.
    #[default]
    Empty,
    /// A strict prefix of at least one grammar entry (or only a count /
    /// register so far).
    Ambiguous,
    /// Resolved to an action.
    Complete,
    /// Matches nothing; about to be discarded.
    Invalid,
}

/// What [`RecordedState::push`] did with a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pushed {
    /// Consumed as part of a count or register prefix.
    Prefix,
    /// Appended to the command; match it against the grammar.
    Command,
    /// `"` followed by a key that names no register.
    BadRegister(char),
}

/// Keys since the last resolved action, with their count and register.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RecordedState {
    keys: Vec<KeyToken>,
    command: Vec<KeyToken>,
    count: Option<usize>,
    /// The count typed before `"x`, once a register is named.
    outer_count: Option<usize>,
    register: Option<char>,
    awaiting_register: bool,
    status: CommandStatus,
}

impl RecordedState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one key typed in `mode`.
    pub fn push(&mut self, key: KeyToken, mode: Mode) -> Pushed {
        self.keys.push(key.clone());
        self.status = CommandStatus::Ambiguous;

        if !self.command.is_empty() || !mode.accepts_count() {
            self.command.push(key);
            return Pushed::Command;
        }

        if self.awaiting_register {
            self.awaiting_register = false;
            return match key.as_char() {
                Some(name) if crate::register::is_valid_name(name) => {
                    self.register = Some(name);
                    self.outer_count = self.count.take();
                    Pushed::Prefix
                }
                other => Pushed::BadRegister(other.unwrap_or('?')),
            };
        }

        if let Some(d) = key.digit() {
            if d != 0 || self.count.is_some() {
                let count = self.count.unwrap_or(0);
                self.count = Some(
                    count
                        .saturating_mul(10)
                        .saturating_add(d as usize)
                        .min(COUNT_MAX),
                );
                return Pushed::Prefix;
            }
        }

        if mode.accepts_register() && key.as_char() == Some('"') {
            self.awaiting_register = true;
            return Pushed::Prefix;
        }

        self.command.push(key);
        Pushed::Command
    }

    /// Every key since the last resolution, prefixes included.
    #[must_use]
    pub fn keys(&self) -> &[KeyToken] {
        &self.keys
    }

    /// The keys the grammar matches against.
    #[must_use]
    pub fn command(&self) -> &[KeyToken] {
        &self.command
    }

    /// The effective count: both sides of a `"x` prefix multiplied.
    #[must_use]
    pub fn count(&self) -> Option<usize> {
        match (self.outer_count, self.count) {
            (None, None) => None,
            (a, b) => Some(
                a.unwrap_or(1)
                    .saturating_mul(b.unwrap_or(1))
                    .min(COUNT_MAX),
            ),
        }
    }

    #[must_use]
    pub const fn register(&self) -> Option<char> {
        self.register
    }

    #[must_use]
    pub const fn status(&self) -> CommandStatus {
        self.status
    }

    pub const fn set_status(&mut self, status: CommandStatus) {
        self.status = status;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Forget everything; keeps the final status for inspection.
    pub fn clear(&mut self) {
        let status = self.status;
        *self = Self::default();
        self.status = status;
    }

    /// Forget everything, status included.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Debug for RecordedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordedState")
            .field("keys", &format_keys(&self.keys))
            .field("count", &self.count())
            .field("register", &self.register)
            .field("status", &self.status)
            .finish()
    }
}
