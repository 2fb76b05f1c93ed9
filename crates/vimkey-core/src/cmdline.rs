//! Command-line router — the `:` / `/` / `?` prompts.
//!
//! A prompt is a [`PromptSession`]: the line being typed (a
//! [`CommandLine`]), which prompt it is, the mode it was opened from, and a
//! cursor into the shared history for `<Up>` / `<Down>`. Browsing the
//! history never changes it; a line is appended only when it is submitted.
//!
//! What a submitted line *does* is the command executor's business.

use std::collections::VecDeque;

use crate::action::PromptKind;
use crate::mode::Mode;
use crate::position::Position;

// ---------------------------------------------------------------------------
// CommandLine
// ---------------------------------------------------------------------------

/// The text being typed after the leader, with a char-indexed cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    input: String,
    cursor: usize,
}

impl CommandLine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `text` already typed, cursor at the end.
    #[must_use]
    pub fn with_text(text: &str) -> Self {
        Self {
            input: text.to_string(),
            cursor: text.chars().count(),
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.input
    }

    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    pub fn insert_char(&mut self, ch: char) {
        let idx = self.char_to_byte(self.cursor);
        self.input.insert(idx, ch);
        self.cursor += 1;
    }

    /// Delete before the cursor. `false` if there was nothing to delete.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let idx = self.char_to_byte(self.cursor);
        self.input.remove(idx);
        true
    }

    /// Replace the whole line (history browsing).
    pub fn set(&mut self, text: &str) {
        self.input = text.to_string();
        self.cursor = text.chars().count();
    }

    fn char_to_byte(&self, char_idx: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_idx)
            .map_or(self.input.len(), |(i, _)| i)
    }
}

// ---------------------------------------------------------------------------
// BoundedHistory
// ---------------------------------------------------------------------------

/// A most-recent-last list that forgets its oldest entries past `cap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedHistory<T> {
    entries: VecDeque<T>,
    cap: usize,
}

impl<T: PartialEq> BoundedHistory<T> {
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cap: cap.max(1),
        }
    }

    /// Append `item`; an equal older entry moves to the end instead of
    /// being duplicated.
    pub fn push(&mut self, item: T) {
        if let Some(i) = self.entries.iter().position(|e| *e == item) {
            self.entries.remove(i);
        }
        self.entries.push_back(item);
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
    }

    /// Entry by age, 0 = oldest.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.entries.back()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ---------------------------------------------------------------------------
// PromptSession
// ---------------------------------------------------------------------------

/// An open prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSession {
    pub kind: PromptKind,
    /// The mode to return to.
    pub origin: Mode,
    /// Cursor position when the prompt opened.
    pub anchor: Position,
    pub line: CommandLine,
    /// History entry being shown, counted back from the newest. `None`
    /// while editing the live line.
    browsing: Option<usize>,
    /// The live line, kept while browsing.
    draft: String,
}

impl PromptSession {
    #[must_use]
    pub fn new(kind: PromptKind, origin: Mode, anchor: Position, prefill: &str) -> Self {
        Self {
            kind,
            origin,
            anchor,
            line: CommandLine::with_text(prefill),
            browsing: None,
            draft: String::new(),
        }
    }

    pub fn type_char(&mut self, ch: char) {
        self.browsing = None;
        self.line.insert_char(ch);
    }

    pub fn backspace(&mut self) -> bool {
        self.browsing = None;
        self.line.backspace()
    }

    /// `<Up>`: show the next older entry of `history`. `false` at the
    /// oldest.
    pub fn older(&mut self, history: &[String]) -> bool {
        let next = self.browsing.map_or(0, |i| i + 1);
        if next >= history.len() {
            return false;
        }
        if self.browsing.is_none() {
            self.draft = self.line.text().to_string();
        }
        self.browsing = Some(next);
        self.line.set(&history[history.len() - 1 - next]);
        true
    }

    /// `<Down>`: show the next newer entry, or the live line again.
    pub fn newer(&mut self, history: &[String]) -> bool {
        match self.browsing {
            None => false,
            Some(0) => {
                self.browsing = None;
                let draft = std::mem::take(&mut self.draft);
                self.line.set(&draft);
                true
            }
            Some(i) => {
                self.browsing = Some(i - 1);
                if let Some(entry) = history.get(history.len().saturating_sub(i)) {
                    self.line.set(entry);
                }
                true
            }
        }
    }

    /// What the prompt currently displays, leader included.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{}", self.kind.leader(), self.line.text())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
