//! `TextView` — a read-only snapshot of the host's text.
//!
//! Motions and text objects need to scan across line boundaries by char
//! index. The host only hands out lines, so the executor takes a snapshot
//! into a rope once per action and does its arithmetic there. Lines are
//! joined with `\n`; the snapshot has exactly as many lines as the host.

use ropey::Rope;

use crate::host::EditorHost;
use crate::position::{Position, Range};

#[derive(Debug, Clone)]
pub struct TextView {
    rope: Rope,
}

impl TextView {
    /// Snapshot every line of `host`.
    #[must_use]
    pub fn from_host(host: &dyn EditorHost) -> Self {
        let mut text = String::new();
        for n in 0..host.line_count() {
            if n > 0 {
                text.push('\n');
            }
            text.push_str(&host.line(n).unwrap_or_default());
        }
        Self::from_text(&text)
    }

    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    #[must_use]
    pub const fn rope(&self) -> &Rope {
        &self.rope
    }

    #[must_use]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Line length without its line break.
    #[must_use]
    pub fn line_content_len(&self, line: usize) -> Option<usize> {
        if line >= self.rope.len_lines() {
            return None;
        }
        let slice = self.rope.line(line);
        let total = slice.len_chars();
        if total > 0 && slice.char(total - 1) == '\n' {
            Some(total - 1)
        } else {
            Some(total)
        }
    }

    /// Line text without its line break.
    #[must_use]
    pub fn line(&self, line: usize) -> Option<String> {
        let len = self.line_content_len(line)?;
        Some(self.rope.line(line).chars().take(len).collect())
    }

    #[must_use]
    pub fn char_at(&self, pos: Position) -> Option<char> {
        let idx = self.pos_to_char_idx(pos)?;
        (idx < self.rope.len_chars()).then(|| self.rope.char(idx))
    }

    /// `(line, col)` to an absolute char index. `col` may equal the line's
    /// full length (a range end).
    #[must_use]
    pub fn pos_to_char_idx(&self, pos: Position) -> Option<usize> {
        if pos.line >= self.rope.len_lines() {
            return None;
        }
        let line_len = self.rope.line(pos.line).len_chars();
        if pos.col > line_len {
            return None;
        }
        Some(self.rope.line_to_char(pos.line) + pos.col)
    }

    /// Absolute char index to `(line, col)`. `len_chars()` maps to just past
    /// the last character.
    #[must_use]
    pub fn char_idx_to_pos(&self, idx: usize) -> Option<Position> {
        if idx > self.rope.len_chars() {
            return None;
        }
        let line = self.rope.char_to_line(idx);
        Some(Position::new(line, idx - self.rope.line_to_char(line)))
    }

    /// The text covered by `range`.
    #[must_use]
    pub fn slice(&self, range: Range) -> String {
        let start = self.pos_to_char_idx(range.start).unwrap_or(0);
        let end = self
            .pos_to_char_idx(range.end)
            .unwrap_or_else(|| self.rope.len_chars())
            .max(start);
        self.rope.slice(start..end).to_string()
    }

    /// Largest cursor column on `line`: on the last char, or after it when
    /// `past_end` (insert-like modes).
    #[must_use]
    pub fn max_col(&self, line: usize, past_end: bool) -> usize {
        let len = self.line_content_len(line).unwrap_or(0);
        if past_end { len } else { len.saturating_sub(1) }
    }

    #[must_use]
    pub fn clamp(&self, pos: Position, past_end: bool) -> Position {
        let line = pos.line.min(self.line_count().saturating_sub(1));
        Position::new(line, pos.col.min(self.max_col(line, past_end)))
    }

    /// Column of the first non-blank character on `line`.
    #[must_use]
    pub fn first_non_blank(&self, line: usize) -> usize {
        self.line(line).map_or(0, |text| {
            let blanks = text.chars().take_while(|c| c.is_whitespace()).count();
            blanks.min(text.chars().count().saturating_sub(1))
        })
    }

    #[must_use]
    pub fn is_blank_line(&self, line: usize) -> bool {
        self.line_content_len(line).unwrap_or(0) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::memory::MemoryEditor;

    #[test]
    fn snapshot_matches_host_lines() {
        let ed = MemoryEditor::from_text("one\ntwo\n");
        let view = TextView::from_host(&ed);
        assert_eq!(view.line_count(), 3);
        assert_eq!(view.line(1).as_deref(), Some("two"));
        assert_eq!(view.line_content_len(2), Some(0));
    }

    #[test]
    fn index_conversions() {
        let view = TextView::from_text("hello\nworld");
        assert_eq!(view.pos_to_char_idx(Position::new(1, 0)), Some(6));
        assert_eq!(view.pos_to_char_idx(Position::new(0, 7)), None);
        assert_eq!(view.char_idx_to_pos(11), Some(Position::new(1, 5)));
        assert_eq!(view.char_at(Position::new(0, 5)), Some('\n'));
    }

    #[test]
    fn slice_spans_lines() {
        let view = TextView::from_text("ab\ncd");
        let range = Range::ordered(Position::new(0, 1), Position::new(1, 1));
        assert_eq!(view.slice(range), "b\nc");
    }

    #[test]
    fn clamp_and_max_col() {
        let view = TextView::from_text("abc\n");
        assert_eq!(view.max_col(0, false), 2);
        assert_eq!(view.max_col(0, true), 3);
        assert_eq!(view.clamp(Position::new(9, 9), false), Position::new(1, 0));
    }

    #[test]
    fn first_non_blank() {
        let view = TextView::from_text("   x\n    \n");
        assert_eq!(view.first_non_blank(0), 3);
        // All blanks: last char.
        assert_eq!(view.first_non_blank(1), 3);
        assert_eq!(view.first_non_blank(2), 0);
    }
}
