//! `MemoryEditor` — an in-process [`EditorHost`] backed by a rope.
//!
//! Stands in for a real host editor in tests and the script driver. It keeps
//! its own native undo stack with one entry per `apply_edit`, the way a host
//! editor records each programmatic edit, so the engine's undo bookkeeping
//! is exercised against something that behaves like the real thing.
//!
//! Columns are char offsets. Line endings are `\n` only.
//!
//! [`MemoryCommands`] is the matching executor: literal-text search and
//! `:{line}`, enough to drive `/`, `?`, `n`, `N`, and `:` end to end.

use std::fmt;

use ropey::Rope;

use crate::action::PromptKind;
use crate::error::{CommandError, HostError};
use crate::host::{CommandExecutor, CommandOutcome, CommandRequest, EditorHost};
use crate::position::{Position, Range, Selection};
use crate::search::SearchDirection;

/// One reversible replacement: at char index `at`, `removed` became
/// `inserted`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edit {
    at: usize,
    removed: String,
    inserted: String,
}

/// A rope-backed host with selections and a native undo stack.
pub struct MemoryEditor {
    rope: Rope,
    selections: Vec<Selection>,
    undo_stack: Vec<Edit>,
    redo_stack: Vec<Edit>,
    /// When set, every edit is refused. Lets tests exercise failure paths.
    read_only: bool,
}

impl MemoryEditor {
    #[must_use]
    pub fn new() -> Self {
        Self::from_text("")
    }

    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            selections: vec![Selection::caret(Position::ZERO)],
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            read_only: false,
        }
    }

    /// The full buffer contents.
    #[must_use]
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub const fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Number of native undo entries (one per applied edit).
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of chars on `line`, excluding the line break.
    fn content_len(&self, line: usize) -> usize {
        let slice = self.rope.line(line);
        let len = slice.len_chars();
        if len > 0 && slice.char(len - 1) == '\n' {
            len - 1
        } else {
            len
        }
    }

    fn char_index(&self, pos: Position) -> Result<usize, HostError> {
        if pos.line >= self.rope.len_lines() || pos.col > self.content_len(pos.line) {
            return Err(HostError::OutOfBounds(pos));
        }
        Ok(self.rope.line_to_char(pos.line) + pos.col)
    }

    fn replace_chars(&mut self, at: usize, remove: usize, text: &str) {
        self.rope.remove(at..at + remove);
        self.rope.insert(at, text);
    }

    fn position_of(&self, char_idx: usize) -> Position {
        let line = self.rope.char_to_line(char_idx);
        Position::new(line, char_idx - self.rope.line_to_char(line))
    }
}

impl Default for MemoryEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryEditor")
            .field("text", &self.text())
            .field("selections", &self.selections)
            .finish_non_exhaustive()
    }
}

impl EditorHost for MemoryEditor {
    fn apply_edit(&mut self, range: Range, text: &str) -> Result<(), HostError> {
        if self.read_only {
            return Err(HostError::Rejected("buffer is read-only".to_string()));
        }
        let start = self.char_index(range.start)?;
        let end = self.char_index(range.end)?;
        let removed = self.rope.slice(start..end).to_string();
        self.replace_chars(start, end - start, text);
        self.undo_stack.push(Edit {
            at: start,
            removed,
            inserted: text.to_string(),
        });
        self.redo_stack.clear();
        Ok(())
    }

    fn selections(&self) -> Vec<Selection> {
        self.selections.clone()
    }

    fn set_selections(&mut self, selections: Vec<Selection>) {
        if selections.is_empty() {
            return;
        }
        self.selections = selections;
    }

    fn line(&self, n: usize) -> Option<String> {
        if n >= self.rope.len_lines() {
            return None;
        }
        let mut line = self.rope.line(n).to_string();
        if line.ends_with('\n') {
            line.pop();
        }
        Some(line)
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn undo(&mut self) -> bool {
        let Some(edit) = self.undo_stack.pop() else {
            return false;
        };
        self.replace_chars(edit.at, edit.inserted.chars().count(), &edit.removed);
        let caret = self.position_of(edit.at);
        self.selections = vec![Selection::caret(caret)];
        self.redo_stack.push(edit);
        true
    }

    fn redo(&mut self) -> bool {
        let Some(edit) = self.redo_stack.pop() else {
            return false;
        };
        self.replace_chars(edit.at, edit.removed.chars().count(), &edit.inserted);
        let caret = self.position_of(edit.at);
        self.selections = vec![Selection::caret(caret)];
        self.undo_stack.push(edit);
        true
    }
}

// ---------------------------------------------------------------------------
// MemoryCommands
// ---------------------------------------------------------------------------

/// A small executor: `/text` and `?text` find literal text (wrapping at the
/// ends), `:N` jumps to line N. Every request is kept in `requests`.
#[derive(Debug, Default)]
pub struct MemoryCommands {
    pub requests: Vec<CommandRequest>,
}

impl MemoryCommands {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandExecutor for MemoryCommands {
    fn run(
        &mut self,
        request: &CommandRequest,
        host: &mut dyn EditorHost,
    ) -> Result<CommandOutcome, CommandError> {
        self.requests.push(request.clone());
        match request.kind {
            PromptKind::Search(direction) => {
                let found = find_literal(host, &request.text, direction)
                    .ok_or_else(|| CommandError::PatternNotFound(request.text.clone()))?;
                host.set_cursor(found);
                Ok(CommandOutcome::Completed(None))
            }
            PromptKind::Ex => {
                let line: usize = request
                    .text
                    .trim()
                    .parse()
                    .map_err(|_| CommandError::NotACommand(request.text.clone()))?;
                let last = host.line_count().saturating_sub(1);
                host.set_cursor(Position::new(line.saturating_sub(1).min(last), 0));
                Ok(CommandOutcome::Completed(None))
            }
        }
    }
}

/// The next occurrence of `needle` after (or before) the cursor.
fn find_literal(host: &dyn EditorHost, needle: &str, direction: SearchDirection) -> Option<Position> {
    if needle.is_empty() {
        return None;
    }
    let lines: Vec<Vec<char>> = (0..host.line_count())
        .map(|n| host.line(n).unwrap_or_default().chars().collect())
        .collect();
    let needle: Vec<char> = needle.chars().collect();
    let mut hits = Vec::new();
    for (line, chars) in lines.iter().enumerate() {
        if chars.len() < needle.len() {
            continue;
        }
        for col in 0..=chars.len() - needle.len() {
            if chars[col..col + needle.len()] == needle[..] {
                hits.push(Position::new(line, col));
            }
        }
    }
    let cursor = host.cursor();
    match direction {
        SearchDirection::Forward => hits
            .iter()
            .find(|&&p| p > cursor)
            .or_else(|| hits.first())
            .copied(),
        SearchDirection::Backward => hits
            .iter()
            .rev()
            .find(|&&p| p < cursor)
            .or_else(|| hits.last())
            .copied(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
