//! Motion targets — where a motion lands.
//!
//! Pure functions over a [`TextView`]. Motions that depend on engine state
//! (`;` `,` repeat the last find, `n` `N` repeat the last search, `'x`
//! reads a mark) are turned into concrete ones by the engine first and are
//! never resolved here.

use crate::action::{FindKind, Motion};
use crate::position::Position;
use crate::text::TextView;
use crate::word;

/// Where `motion` lands from `from`, or `None` if it can't move (a failed
/// `f`, or a motion resolved elsewhere).
///
/// `past_end` lets horizontal motions stop after the last character, as
/// in insert mode and as an operator's exclusive end.
#[must_use]
pub fn target(
    view: &TextView,
    from: Position,
    motion: Motion,
    count: Option<usize>,
    operand: Option<char>,
    past_end: bool,
) -> Option<Position> {
    let n = count.unwrap_or(1).max(1);
    let last_line = view.line_count().saturating_sub(1);
    let pos = match motion {
        Motion::Left => {
            let col = from.col.min(view.max_col(from.line, past_end));
            Position::new(from.line, col.saturating_sub(n))
        }
        Motion::Right => {
            let col = from.col.saturating_add(n).min(view.max_col(from.line, past_end));
            Position::new(from.line, col)
        }
        Motion::Up => vertical(view, from, from.line.saturating_sub(n), past_end),
        Motion::Down => vertical(view, from, from.line.saturating_add(n).min(last_line), past_end),
        Motion::WordForward => repeat(n, from, |p| word::word_forward(view, p)),
        Motion::WordBackward => repeat(n, from, |p| word::word_backward(view, p)),
        Motion::WordEnd => repeat(n, from, |p| word::word_end(view, p)),
        Motion::BigWordForward => repeat(n, from, |p| word::big_word_forward(view, p)),
        Motion::BigWordBackward => repeat(n, from, |p| word::big_word_backward(view, p)),
        Motion::BigWordEnd => repeat(n, from, |p| word::big_word_end(view, p)),
        Motion::LineStart => Position::new(from.line, 0),
        Motion::FirstNonBlank => Position::new(from.line, view.first_non_blank(from.line)),
        Motion::LineEnd => {
            let line = from.line.saturating_add(n - 1).min(last_line);
            Position::new(line, view.max_col(line, past_end))
        }
        Motion::FirstLine | Motion::LastLine => {
            let default = if motion == Motion::FirstLine { 0 } else { last_line };
            let line = count.map_or(default, |c| c.saturating_sub(1).min(last_line));
            Position::new(line, view.first_non_blank(line))
        }
        Motion::ParagraphForward => paragraph_forward(view, from, n),
        Motion::ParagraphBackward => paragraph_backward(view, from, n),
        Motion::FindChar(kind) => find_char(view, from, kind, operand?, n)?,
        Motion::Lines => Position::new(from.line.saturating_add(n - 1).min(last_line), 0),
        Motion::RepeatFind
        | Motion::RepeatFindReverse
        | Motion::SearchNext
        | Motion::SearchPrev
        | Motion::GotoMark { .. } => return None,
    };
    Some(pos)
}

fn repeat(n: usize, from: Position, step: impl Fn(Position) -> Position) -> Position {
    (0..n).fold(from, |p, _| step(p))
}

fn vertical(view: &TextView, from: Position, line: usize, past_end: bool) -> Position {
    Position::new(line, from.col.min(view.max_col(line, past_end)))
}

// A paragraph boundary is an empty line. From an empty line, skip the run
// of empty lines first. Always lands in column 0.
fn paragraph_forward(view: &TextView, from: Position, n: usize) -> Position {
    let lines = view.line_count();
    let mut line = from.line;
    for _ in 0..n {
        let mut i = line + 1;
        if view.is_blank_line(line) {
            while i < lines && view.is_blank_line(i) {
                i += 1;
            }
        }
        while i < lines && !view.is_blank_line(i) {
            i += 1;
        }
        line = i.min(lines.saturating_sub(1));
    }
    Position::new(line, 0)
}

fn paragraph_backward(view: &TextView, from: Position, n: usize) -> Position {
    let mut line = from.line;
    for _ in 0..n {
        if line == 0 {
            break;
        }
        let mut i = line - 1;
        if view.is_blank_line(line) {
            while i > 0 && view.is_blank_line(i) {
                i -= 1;
            }
        }
        while i > 0 && !view.is_blank_line(i) {
            i -= 1;
        }
        line = i;
    }
    Position::new(line, 0)
}

/// `f` `F` `t` `T`: the `n`th `ch` on the cursor line.
fn find_char(
    view: &TextView,
    from: Position,
    kind: FindKind,
    ch: char,
    n: usize,
) -> Option<Position> {
    let chars: Vec<char> = view.line(from.line)?.chars().collect();
    let col = match kind {
        FindKind::Forward | FindKind::TillForward => {
            let found = (from.col + 1..chars.len())
                .filter(|&i| chars[i] == ch)
                .nth(n - 1)?;
            if kind == FindKind::TillForward { found - 1 } else { found }
        }
        FindKind::Backward | FindKind::TillBackward => {
            let found = (0..from.col.min(chars.len()))
                .rev()
                .filter(|&i| chars[i] == ch)
                .nth(n - 1)?;
            if kind == FindKind::TillBackward { found + 1 } else { found }
        }
    };
    Some(Position::new(from.line, col))
}
