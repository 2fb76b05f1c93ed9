//! Text objects — selecting text by structure.
//!
//! ```text
//! operator + text-object = action
//! d        + iw          = delete inner word
//! c        + i"          = change inside quotes
//! y        + a(          = yank around parentheses
//! ```
//!
//! [`select`] returns the half-open range of the object around the cursor,
//! or `None` when there isn't one (no enclosing brackets, an unpaired
//! quote).
//!
//! | Inner    | Around   |                              |
//! |----------|----------|------------------------------|
//! | `iw`     | `aw`     | word                         |
//! | `iW`     | `aW`     | WORD                         |
//! | `i"`     | `a"`     | double-quoted string         |
//! | `i'`     | `a'`     | single-quoted string         |
//! | `` i` `` | `` a` `` | backtick string              |
//! | `i(`     | `a(`     | parentheses (also `ib`/`ab`) |
//! | `i[`     | `a[`     | square brackets              |
//! | `i{`     | `a{`     | braces (also `iB`/`aB`)      |
//! | `i<`     | `a<`     | angle brackets               |

use crate::action::{ObjectKind, TextObject};
use crate::position::{Position, Range};
use crate::text::TextView;
use crate::word::{CharClass, classify, classify_big};

/// The range `object` selects around `pos`.
#[must_use]
pub fn select(view: &TextView, pos: Position, object: TextObject) -> Option<Range> {
    let TextObject { inner, kind } = object;
    match kind {
        ObjectKind::Word => word_object(view, pos, inner, classify),
        ObjectKind::BigWord => word_object(view, pos, inner, classify_big),
        ObjectKind::DoubleQuote => quote_object(view, pos, inner, '"'),
        ObjectKind::SingleQuote => quote_object(view, pos, inner, '\''),
        ObjectKind::Backtick => quote_object(view, pos, inner, '`'),
        ObjectKind::Paren => bracket_object(view, pos, inner, '(', ')'),
        ObjectKind::Square => bracket_object(view, pos, inner, '[', ']'),
        ObjectKind::Curly => bracket_object(view, pos, inner, '{', '}'),
        ObjectKind::Angle => bracket_object(view, pos, inner, '<', '>'),
    }
}

fn span(view: &TextView, start: usize, end: usize) -> Option<Range> {
    Some(Range {
        start: view.char_idx_to_pos(start)?,
        end: view.char_idx_to_pos(end)?,
    })
}

// ---------------------------------------------------------------------------
// Words
// ---------------------------------------------------------------------------

fn word_object(
    view: &TextView,
    pos: Position,
    inner: bool,
    class_of: fn(char) -> CharClass,
) -> Option<Range> {
    let rope = view.rope();
    let total = rope.len_chars();
    let idx = view.pos_to_char_idx(pos)?;
    if idx >= total {
        return None;
    }

    let class = class_of(rope.char(idx));
    if class == CharClass::Newline {
        return span(view, idx, idx + 1);
    }

    // The run of same-class chars under the cursor.
    let mut start = idx;
    while start > 0 && class_of(rope.char(start - 1)) == class {
        start -= 1;
    }
    let mut end = idx + 1;
    while end < total && class_of(rope.char(end)) == class {
        end += 1;
    }
    if inner {
        return span(view, start, end);
    }

    if class == CharClass::Blank {
        // On blanks, `aw` takes the following word too.
        if end < total {
            let next = class_of(rope.char(end));
            if matches!(next, CharClass::Word | CharClass::Punctuation) {
                while end < total && class_of(rope.char(end)) == next {
                    end += 1;
                }
            }
        }
        return span(view, start, end);
    }

    // Trailing blanks first, leading ones if there are none.
    let mut trailing = end;
    while trailing < total && class_of(rope.char(trailing)) == CharClass::Blank {
        trailing += 1;
    }
    if trailing > end {
        return span(view, start, trailing);
    }
    let mut leading = start;
    while leading > 0 && class_of(rope.char(leading - 1)) == CharClass::Blank {
        leading -= 1;
    }
    span(view, leading, end)
}

// ---------------------------------------------------------------------------
// Quotes
// ---------------------------------------------------------------------------

fn quote_object(view: &TextView, pos: Position, inner: bool, quote: char) -> Option<Range> {
    let (open, close) = find_quote_pair(view, pos, quote)?;
    let line = pos.line;
    if inner {
        Some(Range {
            start: Position::new(line, open + 1),
            end: Position::new(line, close),
        })
    } else {
        Some(Range {
            start: Position::new(line, open),
            end: Position::new(line, close + 1),
        })
    }
}

/// Quotes pair up left to right on the cursor's line. The pair around the
/// cursor wins, else the next pair after it.
fn find_quote_pair(view: &TextView, pos: Position, quote: char) -> Option<(usize, usize)> {
    let text = view.line(pos.line)?;
    let quotes: Vec<usize> = text
        .chars()
        .enumerate()
        .filter(|&(_, c)| c == quote)
        .map(|(i, _)| i)
        .collect();

    let pairs = || quotes.chunks_exact(2).map(|pair| (pair[0], pair[1]));
    pairs()
        .find(|&(open, close)| (open..=close).contains(&pos.col))
        .or_else(|| pairs().find(|&(open, _)| open > pos.col))
}

// ---------------------------------------------------------------------------
// Brackets
// ---------------------------------------------------------------------------

fn bracket_object(
    view: &TextView,
    pos: Position,
    inner: bool,
    open: char,
    close: char,
) -> Option<Range> {
    let (open_idx, close_idx) = find_bracket_pair(view, pos, open, close)?;
    if inner {
        span(view, open_idx + 1, close_idx)
    } else {
        span(view, open_idx, close_idx + 1)
    }
}

/// The innermost bracket pair around `pos`, across lines, nesting aware.
fn find_bracket_pair(
    view: &TextView,
    pos: Position,
    open: char,
    close: char,
) -> Option<(usize, usize)> {
    let rope = view.rope();
    let total = rope.len_chars();
    let cursor = view.pos_to_char_idx(pos)?;
    if cursor >= total {
        return None;
    }

    let here = rope.char(cursor);
    if here == open {
        return Some((cursor, find_closing(view, cursor, open, close)?));
    }
    if here == close {
        return Some((find_opening(view, cursor, open, close)?, cursor));
    }
    let open_idx = find_opening(view, cursor, open, close)?;
    let close_idx = find_closing(view, open_idx, open, close)?;
    (cursor > open_idx && cursor < close_idx).then_some((open_idx, close_idx))
}

fn find_opening(view: &TextView, from: usize, open: char, close: char) -> Option<usize> {
    let rope = view.rope();
    let mut depth = 0usize;
    for i in (0..from).rev() {
        let ch = rope.char(i);
        if ch == close {
            depth += 1;
        } else if ch == open {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
    }
    None
}

fn find_closing(view: &TextView, from: usize, open: char, close: char) -> Option<usize> {
    let rope = view.rope();
    let mut depth = 0usize;
    for i in (from + 1)..rope.len_chars() {
        let ch = rope.char(i);
        if ch == open {
            depth += 1;
        } else if ch == close {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
    }
    None
}
