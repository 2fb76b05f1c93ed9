//! Carrying out edits: operators, paste, `r`, and insert-mode typing.
//!
//! Everything here talks to the host through [`Exec::edit`], which forwards
//! one request and notes the range in the [`HistoryTracker`] so `u` knows
//! how many host edits the command spans. Ranges are worked out on a
//! [`TextView`] snapshot taken before the first edit; every multi-edit
//! operation edits bottom-up or line-locally so the snapshot stays valid.

use log::warn;

use crate::action::{Motion, Operator};
use crate::error::UserError;
use crate::history::HistoryTracker;
use crate::host::EditorHost;
use crate::mode::VisualKind;
use crate::position::{Position, Range, Selection};
use crate::register::RegisterKind;
use crate::shared::SharedState;
use crate::text::TextView;
use crate::word;

/// The text an operator acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    /// Half-open character range.
    Chars(Range),
    /// Whole lines, inclusive.
    Lines { first: usize, last: usize },
    /// A rectangle: lines `top..=bottom`, columns `left..right`.
    Block {
        top: usize,
        bottom: usize,
        left: usize,
        right: usize,
    },
}

impl Span {
    /// First and last line touched.
    #[must_use]
    pub const fn lines(self) -> (usize, usize) {
        match self {
            Self::Chars(r) => {
                let last = if r.end.col == 0 && r.end.line > r.start.line {
                    r.end.line - 1
                } else {
                    r.end.line
                };
                (r.start.line, last)
            }
            Self::Lines { first, last } => (first, last),
            Self::Block { top, bottom, .. } => (top, bottom),
        }
    }

    const fn start(self) -> Position {
        match self {
            Self::Chars(r) => r.start,
            Self::Lines { first, .. } => Position::new(first, 0),
            Self::Block { top, left, .. } => Position::new(top, left),
        }
    }
}

// ---------------------------------------------------------------------------
// Spans
// ---------------------------------------------------------------------------

/// One past `pos`, without crossing the end of its line.
fn after(view: &TextView, pos: Position) -> Position {
    let len = view.line_content_len(pos.line).unwrap_or(0);
    Position::new(pos.line, (pos.col + 1).min(len))
}

fn line_end(view: &TextView, line: usize) -> Position {
    Position::new(line, view.line_content_len(line).unwrap_or(0))
}

/// What a motion from `from` to `to` covers under an operator.
#[must_use]
pub fn motion_span(view: &TextView, from: Position, to: Position, motion: Motion) -> Span {
    if motion.is_linewise() {
        return Span::Lines {
            first: from.line.min(to.line),
            last: from.line.max(to.line),
        };
    }

    let Range { start, mut end } = Range::ordered(from, to);
    let word = matches!(motion, Motion::WordForward | Motion::BigWordForward);
    if motion.is_inclusive() {
        end = after(view, end);
    } else if word && to == from {
        // Nothing left to move to: the rest of the line.
        end = line_end(view, from.line);
    } else if word && to.line > from.line {
        // `dw` on the last word of a line stops at the line break.
        end = line_end(view, to.line - 1);
    } else if end.col == 0 && end.line > start.line {
        end = line_end(view, end.line - 1);
    }
    Span::Chars(Range { start, end })
}

/// What a visual selection covers.
#[must_use]
pub fn selection_span(view: &TextView, sel: Selection, kind: VisualKind) -> Span {
    let Range { start, end } = sel.range();
    match kind {
        VisualKind::Char => Span::Chars(Range {
            start,
            end: after(view, end),
        }),
        VisualKind::Line => Span::Lines {
            first: start.line,
            last: end.line,
        },
        VisualKind::Block => Span::Block {
            top: start.line,
            bottom: end.line,
            left: sel.anchor.col.min(sel.cursor.col),
            right: sel.anchor.col.max(sel.cursor.col) + 1,
        },
    }
}

/// Where `cw` ends: like `ce`, except that a cursor already on the last
/// character of a word changes just that character.
#[must_use]
pub fn change_word_target(view: &TextView, from: Position, count: usize, big: bool) -> Position {
    let end = if big { word::big_word_end } else { word::word_end };
    let mut pos = from;
    for i in 0..count.max(1) {
        if i == 0 && at_word_end(view, from, big) {
            continue;
        }
        pos = end(view, pos);
    }
    pos
}

fn at_word_end(view: &TextView, pos: Position, big: bool) -> bool {
    let class_of = if big { word::classify_big } else { word::classify };
    let Some(here) = view.char_at(pos) else {
        return true;
    };
    let next = view.char_at(Position::new(pos.line, pos.col + 1));
    next.is_none_or(|c| class_of(c) != class_of(here))
}

/// True when `cw` should act like `ce` here.
#[must_use]
pub fn on_word(view: &TextView, pos: Position) -> bool {
    view.char_at(pos).is_some_and(|c| !c.is_whitespace())
}

/// The text under `span`, as a register would store it.
#[must_use]
pub fn span_text(view: &TextView, span: Span) -> (String, RegisterKind) {
    match span {
        Span::Chars(range) => (view.slice(range), RegisterKind::Char),
        Span::Lines { first, last } => {
            let mut text = String::new();
            for line in first..=last {
                text.push_str(&view.line(line).unwrap_or_default());
                text.push('\n');
            }
            (text, RegisterKind::Line)
        }
        Span::Block { .. } => (block_rows(view, span).join("\n"), RegisterKind::Block),
    }
}

fn block_rows(view: &TextView, span: Span) -> Vec<String> {
    let Span::Block {
        top,
        bottom,
        left,
        right,
    } = span
    else {
        return Vec::new();
    };
    (top..=bottom)
        .map(|line| {
            view.line(line)
                .unwrap_or_default()
                .chars()
                .skip(left)
                .take(right - left)
                .collect()
        })
        .collect()
}

fn convert_case(operator: Operator, text: &str) -> String {
    match operator {
        Operator::Lowercase => text.to_lowercase(),
        Operator::Uppercase => text.to_uppercase(),
        _ => text
            .chars()
            .flat_map(|c| {
                if c.is_uppercase() {
                    c.to_lowercase().collect::<Vec<_>>()
                } else {
                    c.to_uppercase().collect()
                }
            })
            .collect(),
    }
}

/// Columns `<` removes from the front of `text`: up to `width` spaces, or
/// one tab.
fn outdent_width(text: &str, width: usize) -> usize {
    let mut cols = 0;
    let mut chars = 0;
    for c in text.chars() {
        if cols >= width {
            break;
        }
        match c {
            ' ' => cols += 1,
            '\t' => cols = width,
            _ => break,
        }
        chars += 1;
    }
    chars
}

// ---------------------------------------------------------------------------
// Host helpers
// ---------------------------------------------------------------------------

/// Keep `pos` inside the text. Normal mode sits on a character,
/// insert-like modes may sit after the last one.
#[must_use]
pub fn clamp(host: &dyn EditorHost, pos: Position, past_end: bool) -> Position {
    let line = pos.line.min(host.line_count().saturating_sub(1));
    let len = host.line_len(line);
    let max = if past_end { len } else { len.saturating_sub(1) };
    Position::new(line, pos.col.min(max))
}

#[must_use]
pub fn first_non_blank(host: &dyn EditorHost, line: usize) -> usize {
    host.line(line).map_or(0, |text| {
        text.chars().take_while(|c| c.is_whitespace()).count()
    })
}

// ---------------------------------------------------------------------------
// Exec
// ---------------------------------------------------------------------------

/// One action's view of the host, its history, and the registers.
pub struct Exec<'a> {
    host: &'a mut dyn EditorHost,
    history: &'a mut HistoryTracker,
    shared: &'a SharedState,
    shift_width: usize,
}

impl<'a> Exec<'a> {
    pub fn new(
        host: &'a mut dyn EditorHost,
        history: &'a mut HistoryTracker,
        shared: &'a SharedState,
        shift_width: usize,
    ) -> Self {
        Self {
            host,
            history,
            shared,
            shift_width,
        }
    }

    /// Ask the host to replace `range` with `text`.
    ///
    /// # Errors
    ///
    /// [`UserError::EditFailed`] when the host refuses.
    pub fn edit(&mut self, range: Range, text: &str) -> Result<(), UserError> {
        if let Err(err) = self.host.apply_edit(range, text) {
            warn!("host refused edit {range:?}: {err}");
            return Err(err.into());
        }
        self.history.record(range);
        Ok(())
    }

    // ── Operators ───────────────────────────────────────────────────

    /// Apply `operator` to `span`. Returns where the cursor goes.
    ///
    /// # Errors
    ///
    /// [`UserError::EditFailed`] when the host refuses an edit.
    pub fn operate(
        &mut self,
        view: &TextView,
        from: Position,
        operator: Operator,
        span: Span,
        register: Option<char>,
    ) -> Result<Position, UserError> {
        let (text, kind) = span_text(view, span);
        match operator {
            Operator::Yank => {
                self.shared.yank(register, text, kind);
                Ok(stay_near(from, span))
            }
            Operator::Delete => {
                if !text.is_empty() {
                    self.shared.yank(register, text, kind);
                }
                self.remove(view, span)?;
                Ok(match span {
                    Span::Lines { first, last } => {
                        let remaining = view.line_count().saturating_sub(last - first + 1).max(1);
                        let line = first.min(remaining - 1);
                        Position::new(line, first_non_blank(&*self.host, line))
                    }
                    other => other.start(),
                })
            }
            Operator::Change => {
                if !text.is_empty() {
                    self.shared.yank(register, text, kind);
                }
                match span {
                    Span::Lines { first, last } => {
                        let range = Range {
                            start: Position::new(first, 0),
                            end: line_end(view, last),
                        };
                        if !range.is_empty() {
                            self.edit(range, "")?;
                        }
                    }
                    other => self.remove(view, other)?,
                }
                Ok(span.start())
            }
            Operator::Indent | Operator::Outdent => {
                let (first, last) = span.lines();
                self.shift(view, first, last, operator == Operator::Indent)?;
                Ok(Position::new(first, first_non_blank(&*self.host, first)))
            }
            Operator::Lowercase | Operator::Uppercase | Operator::ToggleCase => {
                self.change_case(view, span, operator)?;
                Ok(stay_near(from, span))
            }
        }
    }

    fn remove(&mut self, view: &TextView, span: Span) -> Result<(), UserError> {
        match span {
            Span::Chars(range) => {
                if !range.is_empty() {
                    self.edit(range, "")?;
                }
            }
            Span::Lines { first, last } => self.edit(line_removal(view, first, last), "")?,
            Span::Block {
                top,
                bottom,
                left,
                right,
            } => {
                for line in (top..=bottom).rev() {
                    let len = view.line_content_len(line).unwrap_or(0);
                    if left < len {
                        let range = Range {
                            start: Position::new(line, left),
                            end: Position::new(line, right.min(len)),
                        };
                        self.edit(range, "")?;
                    }
                }
            }
        }
        Ok(())
    }

    fn shift(
        &mut self,
        view: &TextView,
        first: usize,
        last: usize,
        indent: bool,
    ) -> Result<(), UserError> {
        for line in first..=last {
            let Some(text) = view.line(line) else {
                continue;
            };
            if indent {
                if !text.is_empty() {
                    let pad = " ".repeat(self.shift_width);
                    self.edit(Range::point(Position::new(line, 0)), &pad)?;
                }
            } else {
                let n = outdent_width(&text, self.shift_width);
                if n > 0 {
                    let range = Range {
                        start: Position::new(line, 0),
                        end: Position::new(line, n),
                    };
                    self.edit(range, "")?;
                }
            }
        }
        Ok(())
    }

    fn change_case(
        &mut self,
        view: &TextView,
        span: Span,
        operator: Operator,
    ) -> Result<(), UserError> {
        let ranges: Vec<Range> = match span {
            Span::Chars(range) => vec![range],
            Span::Lines { first, last } => (first..=last)
                .map(|line| Range {
                    start: Position::new(line, 0),
                    end: line_end(view, line),
                })
                .collect(),
            Span::Block {
                top,
                bottom,
                left,
                right,
            } => (top..=bottom)
                .filter_map(|line| {
                    let len = view.line_content_len(line)?;
                    (left < len).then(|| Range {
                        start: Position::new(line, left),
                        end: Position::new(line, right.min(len)),
                    })
                })
                .collect(),
        };
        for range in ranges.into_iter().rev() {
            let old = view.slice(range);
            let new = convert_case(operator, &old);
            if new != old {
                self.edit(range, &new)?;
            }
        }
        Ok(())
    }

    // ── Paste ───────────────────────────────────────────────────────

    /// `p` / `P` from `register`.
    ///
    /// # Errors
    ///
    /// [`UserError::EmptyRegister`] or [`UserError::EditFailed`].
    pub fn paste(
        &mut self,
        cursor: Position,
        register: Option<char>,
        before: bool,
        count: usize,
    ) -> Result<Position, UserError> {
        let reg = self.shared.register(register);
        if reg.is_empty() {
            return Err(UserError::EmptyRegister(register.unwrap_or('"')));
        }
        let (text, kind) = reg.text();
        self.put(cursor, &text, kind, before, count)
    }

    /// Insert `text` the way a register of `kind` pastes.
    ///
    /// # Errors
    ///
    /// [`UserError::EditFailed`] when the host refuses.
    pub fn put(
        &mut self,
        cursor: Position,
        text: &str,
        kind: RegisterKind,
        before: bool,
        count: usize,
    ) -> Result<Position, UserError> {
        let count = count.max(1);
        match kind {
            RegisterKind::Char => {
                let len = self.host.line_len(cursor.line);
                let col = if before || len == 0 {
                    cursor.col.min(len)
                } else {
                    (cursor.col + 1).min(len)
                };
                let at = Position::new(cursor.line, col);
                let body = text.repeat(count);
                self.edit(Range::point(at), &body)?;
                if body.contains('\n') {
                    Ok(at)
                } else {
                    Ok(Position::new(at.line, at.col + body.chars().count().saturating_sub(1)))
                }
            }
            RegisterKind::Line => {
                let body = text.strip_suffix('\n').unwrap_or(text);
                let lines = vec![body; count].join("\n");
                let (at, insert, first) = if before {
                    (Position::new(cursor.line, 0), format!("{lines}\n"), cursor.line)
                } else if cursor.line + 1 < self.host.line_count() {
                    (Position::new(cursor.line + 1, 0), format!("{lines}\n"), cursor.line + 1)
                } else {
                    let len = self.host.line_len(cursor.line);
                    (Position::new(cursor.line, len), format!("\n{lines}"), cursor.line + 1)
                };
                self.edit(Range::point(at), &insert)?;
                Ok(Position::new(first, first_non_blank(&*self.host, first)))
            }
            RegisterKind::Block => {
                let len = self.host.line_len(cursor.line);
                let col = if before || len == 0 { cursor.col } else { cursor.col + 1 };
                for (i, row) in text.split('\n').enumerate() {
                    let line = cursor.line + i;
                    let lines = self.host.line_count();
                    if line >= lines {
                        let last = lines.saturating_sub(1);
                        let end = Position::new(last, self.host.line_len(last));
                        self.edit(Range::point(end), "\n")?;
                    }
                    let len = self.host.line_len(line);
                    let row = row.repeat(count);
                    if len < col {
                        let padded = format!("{}{row}", " ".repeat(col - len));
                        self.edit(Range::point(Position::new(line, len)), &padded)?;
                    } else {
                        self.edit(Range::point(Position::new(line, col)), &row)?;
                    }
                }
                Ok(Position::new(cursor.line, col))
            }
        }
    }

    // ── Single-character edits ──────────────────────────────────────

    /// `r{ch}` over `count` characters. `None` when the line is too short.
    ///
    /// # Errors
    ///
    /// [`UserError::EditFailed`] when the host refuses.
    pub fn replace_char(
        &mut self,
        cursor: Position,
        ch: char,
        count: usize,
    ) -> Result<Option<Position>, UserError> {
        let count = count.max(1);
        if cursor.col + count > self.host.line_len(cursor.line) {
            return Ok(None);
        }
        let range = Range {
            start: cursor,
            end: Position::new(cursor.line, cursor.col + count),
        };
        let text: String = std::iter::repeat_n(ch, count).collect();
        self.edit(range, &text)?;
        Ok(Some(Position::new(cursor.line, cursor.col + count - 1)))
    }

    /// Type `ch` at the cursor. With `overwrite` (Replace mode) the
    /// character under the cursor is replaced and returned.
    ///
    /// # Errors
    ///
    /// [`UserError::EditFailed`] when the host refuses.
    pub fn type_char(
        &mut self,
        cursor: Position,
        ch: char,
        overwrite: bool,
    ) -> Result<(Position, Option<char>), UserError> {
        let line = self.host.line(cursor.line).unwrap_or_default();
        let under = line.chars().nth(cursor.col);
        let mut buf = [0u8; 4];
        let text = ch.encode_utf8(&mut buf);
        let replaced = if overwrite { under } else { None };
        let end = if replaced.is_some() {
            Position::new(cursor.line, cursor.col + 1)
        } else {
            cursor
        };
        self.edit(Range { start: cursor, end }, text)?;
        Ok((Position::new(cursor.line, cursor.col + 1), replaced))
    }

    /// `<CR>` while typing.
    ///
    /// # Errors
    ///
    /// [`UserError::EditFailed`] when the host refuses.
    pub fn newline(&mut self, cursor: Position) -> Result<Position, UserError> {
        self.edit(Range::point(cursor), "\n")?;
        Ok(Position::new(cursor.line + 1, 0))
    }

    /// `<BS>` in insert mode. At the start of a line, joins it to the one
    /// above.
    ///
    /// # Errors
    ///
    /// [`UserError::EditFailed`] when the host refuses.
    pub fn backspace(&mut self, cursor: Position) -> Result<Position, UserError> {
        if cursor.col > 0 {
            let start = Position::new(cursor.line, cursor.col - 1);
            self.edit(Range { start, end: cursor }, "")?;
            Ok(start)
        } else if cursor.line > 0 {
            let start = Position::new(cursor.line - 1, self.host.line_len(cursor.line - 1));
            self.edit(Range { start, end: cursor }, "")?;
            Ok(start)
        } else {
            Ok(cursor)
        }
    }

    /// `<BS>` in Replace mode: put back what the last typed character
    /// overwrote. `restore` is `Some(None)` when it was appended instead,
    /// and `None` when nothing was typed.
    ///
    /// # Errors
    ///
    /// [`UserError::EditFailed`] when the host refuses.
    pub fn unreplace(
        &mut self,
        cursor: Position,
        restore: Option<Option<char>>,
    ) -> Result<Position, UserError> {
        if cursor.col == 0 {
            return Ok(cursor);
        }
        let start = Position::new(cursor.line, cursor.col - 1);
        match restore {
            None => {}
            Some(Some(ch)) => {
                let mut buf = [0u8; 4];
                self.edit(Range { start, end: cursor }, ch.encode_utf8(&mut buf))?;
            }
            Some(None) => self.edit(Range { start, end: cursor }, "")?,
        }
        Ok(start)
    }

    /// `o` / `O`: open an empty line and return its position.
    ///
    /// # Errors
    ///
    /// [`UserError::EditFailed`] when the host refuses.
    pub fn open_line(&mut self, cursor: Position, below: bool) -> Result<Position, UserError> {
        if below {
            let end = Position::new(cursor.line, self.host.line_len(cursor.line));
            self.edit(Range::point(end), "\n")?;
            Ok(Position::new(cursor.line + 1, 0))
        } else {
            self.edit(Range::point(Position::new(cursor.line, 0)), "\n")?;
            Ok(Position::new(cursor.line, 0))
        }
    }
}

/// Where the cursor goes after an operator that leaves the text in place.
fn stay_near(from: Position, span: Span) -> Position {
    match span {
        Span::Lines { first, .. } if from.line != first => Position::new(first, from.col),
        Span::Lines { .. } => from,
        other => other.start(),
    }
}

/// The range that removes lines `first..=last` with their line breaks.
fn line_removal(view: &TextView, first: usize, last: usize) -> Range {
    if last + 1 < view.line_count() {
        Range {
            start: Position::new(first, 0),
            end: Position::new(last + 1, 0),
        }
    } else if first > 0 {
        Range {
            start: line_end(view, first - 1),
            end: line_end(view, last),
        }
    } else {
        Range {
            start: Position::ZERO,
            end: line_end(view, last),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::memory::MemoryEditor;

    fn p(line: usize, col: usize) -> Position {
        Position::new(line, col)
    }

    struct Fixture {
        ed: MemoryEditor,
        history: HistoryTracker,
        shared: SharedState,
    }

    impl Fixture {
        fn new(text: &str) -> Self {
            Self {
                ed: MemoryEditor::from_text(text),
                history: HistoryTracker::new(),
                shared: SharedState::new(),
            }
        }

        fn exec(&mut self) -> Exec<'_> {
            Exec::new(&mut self.ed, &mut self.history, &self.shared, 4)
        }

        fn view(&self) -> TextView {
            TextView::from_host(&self.ed)
        }

        fn operate(&mut self, from: Position, op: Operator, span: Span) -> Position {
            let view = self.view();
            self.exec().operate(&view, from, op, span, None).unwrap()
        }

        fn unnamed(&self) -> (String, RegisterKind) {
            self.shared.register(None).text()
        }
    }

    // -- Spans ---------------------------------------------------------------

    #[test]
    fn inclusive_motion_takes_landing_char() {
        let view = TextView::from_text("hello world");
        let span = motion_span(&view, p(0, 0), p(0, 4), Motion::WordEnd);
        assert_eq!(span, Span::Chars(Range::ordered(p(0, 0), p(0, 5))));
    }

    #[test]
    fn dw_on_last_word_stops_at_line_end() {
        let view = TextView::from_text("foo bar\n  baz");
        let span = motion_span(&view, p(0, 4), p(1, 2), Motion::WordForward);
        assert_eq!(span, Span::Chars(Range::ordered(p(0, 4), p(0, 7))));
    }

    #[test]
    fn exclusive_end_at_col_zero_backs_up() {
        let view = TextView::from_text("a\nb\n\nc");
        let span = motion_span(&view, p(0, 0), p(2, 0), Motion::ParagraphForward);
        assert_eq!(span, Span::Chars(Range::ordered(p(0, 0), p(1, 1))));
    }

    #[test]
    fn linewise_motion_spans_lines() {
        let view = TextView::from_text("a\nb\nc");
        assert_eq!(
            motion_span(&view, p(2, 0), p(1, 0), Motion::Up),
            Span::Lines { first: 1, last: 2 }
        );
    }

    #[test]
    fn block_selection_span() {
        let view = TextView::from_text("abcd\nefgh");
        let sel = Selection::new(p(1, 2), p(0, 1));
        assert_eq!(
            selection_span(&view, sel, VisualKind::Block),
            Span::Block {
                top: 0,
                bottom: 1,
                left: 1,
                right: 3,
            }
        );
    }

    #[test]
    fn cw_on_last_char_of_word() {
        let view = TextView::from_text("foo bar");
        assert_eq!(change_word_target(&view, p(0, 2), 1, false), p(0, 2));
        assert_eq!(change_word_target(&view, p(0, 0), 1, false), p(0, 2));
        assert_eq!(change_word_target(&view, p(0, 0), 2, false), p(0, 6));
    }

    // -- Operators -----------------------------------------------------------

    #[test]
    fn delete_chars_fills_register() {
        let mut fx = Fixture::new("hello world");
        let span = Span::Chars(Range::ordered(p(0, 0), p(0, 6)));
        let cursor = fx.operate(p(0, 0), Operator::Delete, span);
        assert_eq!(fx.ed.text(), "world");
        assert_eq!(cursor, p(0, 0));
        assert_eq!(fx.unnamed(), ("hello ".to_string(), RegisterKind::Char));
        assert_eq!(fx.history.commit(cursor), Some(p(0, 0)));
    }

    #[test]
    fn delete_middle_and_last_lines() {
        let mut fx = Fixture::new("a\nb\nc");
        fx.operate(p(1, 0), Operator::Delete, Span::Lines { first: 1, last: 1 });
        assert_eq!(fx.ed.text(), "a\nc");
        assert_eq!(fx.unnamed(), ("b\n".to_string(), RegisterKind::Line));
        let cursor = fx.operate(p(1, 0), Operator::Delete, Span::Lines { first: 1, last: 1 });
        assert_eq!(fx.ed.text(), "a");
        assert_eq!(cursor, p(0, 0));
    }

    #[test]
    fn delete_only_line_leaves_empty_buffer() {
        let mut fx = Fixture::new("solo");
        fx.operate(p(0, 2), Operator::Delete, Span::Lines { first: 0, last: 0 });
        assert_eq!(fx.ed.text(), "");
    }

    #[test]
    fn change_lines_keeps_one_empty_line() {
        let mut fx = Fixture::new("a\nb\nc");
        let cursor = fx.operate(p(0, 0), Operator::Change, Span::Lines { first: 0, last: 1 });
        assert_eq!(fx.ed.text(), "\nc");
        assert_eq!(cursor, p(0, 0));
    }

    #[test]
    fn yank_does_not_edit() {
        let mut fx = Fixture::new("a\nb");
        let cursor = fx.operate(p(1, 0), Operator::Yank, Span::Lines { first: 0, last: 1 });
        assert_eq!(cursor, p(0, 0));
        assert_eq!(fx.unnamed().0, "a\nb\n");
        assert!(!fx.history.is_open());
    }

    #[test]
    fn block_delete() {
        let mut fx = Fixture::new("abcd\nef\nghij");
        let span = Span::Block {
            top: 0,
            bottom: 2,
            left: 1,
            right: 3,
        };
        fx.operate(p(0, 1), Operator::Delete, span);
        assert_eq!(fx.ed.text(), "ad\ne\ngj");
        assert_eq!(fx.unnamed(), ("bc\nf\nhi".to_string(), RegisterKind::Block));
    }

    #[test]
    fn indent_and_outdent() {
        let mut fx = Fixture::new("a\n\n\tb");
        fx.operate(p(0, 0), Operator::Indent, Span::Lines { first: 0, last: 1 });
        assert_eq!(fx.ed.text(), "    a\n\n\tb");
        let cursor = fx.operate(p(0, 0), Operator::Outdent, Span::Lines { first: 0, last: 2 });
        assert_eq!(fx.ed.text(), "a\n\nb");
        assert_eq!(cursor, p(0, 0));
    }

    #[test]
    fn toggle_case() {
        let mut fx = Fixture::new("Hello");
        let span = Span::Chars(Range::ordered(p(0, 0), p(0, 5)));
        fx.operate(p(0, 0), Operator::ToggleCase, span);
        assert_eq!(fx.ed.text(), "hELLO");
        fx.operate(p(0, 0), Operator::Uppercase, Span::Lines { first: 0, last: 0 });
        assert_eq!(fx.ed.text(), "HELLO");
    }

    // -- Paste ---------------------------------------------------------------

    #[test]
    fn paste_chars_after_and_before() {
        let mut fx = Fixture::new("ac");
        fx.shared.yank(None, "b".into(), RegisterKind::Char);
        let cursor = fx.exec().paste(p(0, 0), None, false, 1).unwrap();
        assert_eq!(fx.ed.text(), "abc");
        assert_eq!(cursor, p(0, 1));
        fx.exec().paste(p(0, 0), None, true, 2).unwrap();
        assert_eq!(fx.ed.text(), "bbabc");
    }

    #[test]
    fn paste_lines_below_above_and_at_end() {
        let mut fx = Fixture::new("a\nb");
        fx.shared.yank(None, "x\n".into(), RegisterKind::Line);
        let cursor = fx.exec().paste(p(0, 0), None, false, 1).unwrap();
        assert_eq!(fx.ed.text(), "a\nx\nb");
        assert_eq!(cursor, p(1, 0));
        fx.exec().paste(p(0, 0), None, true, 1).unwrap();
        assert_eq!(fx.ed.text(), "x\na\nx\nb");
        let cursor = fx.exec().paste(p(3, 0), None, false, 2).unwrap();
        assert_eq!(fx.ed.text(), "x\na\nx\nb\nx\nx");
        assert_eq!(cursor, p(4, 0));
    }

    #[test]
    fn paste_block_pads_short_lines() {
        let mut fx = Fixture::new("abc\n\nxyz");
        fx.shared.yank(None, "1\n2\n3\n4".into(), RegisterKind::Block);
        fx.exec().paste(p(0, 1), None, false, 1).unwrap();
        assert_eq!(fx.ed.text(), "ab1c\n  2\nxy3z\n  4");
    }

    #[test]
    fn paste_empty_register() {
        let mut fx = Fixture::new("a");
        assert_eq!(
            fx.exec().paste(p(0, 0), Some('z'), false, 1),
            Err(UserError::EmptyRegister('z'))
        );
    }

    // -- Single characters ---------------------------------------------------

    #[test]
    fn replace_char_needs_room() {
        let mut fx = Fixture::new("abc");
        assert_eq!(fx.exec().replace_char(p(0, 1), 'x', 2).unwrap(), Some(p(0, 2)));
        assert_eq!(fx.ed.text(), "axx");
        assert_eq!(fx.exec().replace_char(p(0, 1), 'y', 5).unwrap(), None);
        assert_eq!(fx.ed.text(), "axx");
    }

    #[test]
    fn typing_insert_and_overwrite() {
        let mut fx = Fixture::new("ab");
        let (cursor, replaced) = fx.exec().type_char(p(0, 1), 'x', false).unwrap();
        assert_eq!((cursor, replaced), (p(0, 2), None));
        assert_eq!(fx.ed.text(), "axb");
        let (cursor, replaced) = fx.exec().type_char(p(0, 2), 'y', true).unwrap();
        assert_eq!((cursor, replaced), (p(0, 3), Some('b')));
        assert_eq!(fx.ed.text(), "axy");
        fx.exec().unreplace(cursor, Some(replaced)).unwrap();
        assert_eq!(fx.ed.text(), "axb");
    }

    #[test]
    fn backspace_joins_lines() {
        let mut fx = Fixture::new("ab\ncd");
        let cursor = fx.exec().backspace(p(1, 0)).unwrap();
        assert_eq!(cursor, p(0, 2));
        assert_eq!(fx.ed.text(), "abcd");
        assert_eq!(fx.exec().backspace(p(0, 0)).unwrap(), p(0, 0));
    }

    #[test]
    fn open_line_below_and_above() {
        let mut fx = Fixture::new("a\nb");
        assert_eq!(fx.exec().open_line(p(0, 0), true).unwrap(), p(1, 0));
        assert_eq!(fx.ed.text(), "a\n\nb");
        assert_eq!(fx.exec().open_line(p(0, 0), false).unwrap(), p(0, 0));
        assert_eq!(fx.ed.text(), "\na\n\nb");
    }

    #[test]
    fn refused_edit_is_reported() {
        let mut fx = Fixture::new("abc");
        fx.ed.set_read_only(true);
        let err = fx.exec().newline(p(0, 0)).unwrap_err();
        assert!(matches!(err, UserError::EditFailed(_)));
        assert!(!fx.history.is_open());
    }

    #[test]
    fn clamp_to_line() {
        let ed = MemoryEditor::from_text("abc\nd");
        assert_eq!(clamp(&ed, p(0, 9), false), p(0, 2));
        assert_eq!(clamp(&ed, p(0, 9), true), p(0, 3));
        assert_eq!(clamp(&ed, p(7, 0), false), p(1, 0));
    }
}
