//! Word motions — `w` `b` `e` and their WORD forms `W` `B` `E`.
//!
//! A **word** is a run of word characters (letters, digits, underscore) or
//! a run of other non-blank characters: `hello.world` is three words. A
//! **WORD** is any run of non-blanks: `hello.world` is one WORD. An empty
//! line counts as a word, so `w` and `b` stop on it.
//!
//! Each function returns `pos` unchanged when there is nowhere to go.

use crate::position::Position;
use crate::text::TextView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CharClass {
    Word,
    Punctuation,
    Blank,
    Newline,
}

pub(crate) fn classify(ch: char) -> CharClass {
    if ch == '\n' {
        CharClass::Newline
    } else if ch.is_whitespace() {
        CharClass::Blank
    } else if ch.is_alphanumeric() || ch == '_' {
        CharClass::Word
    } else {
        CharClass::Punctuation
    }
}

/// WORD classification: only blank vs non-blank matters.
pub(crate) fn classify_big(ch: char) -> CharClass {
    match classify(ch) {
        CharClass::Punctuation => CharClass::Word,
        other => other,
    }
}

const fn is_token(class: CharClass) -> bool {
    matches!(class, CharClass::Word | CharClass::Punctuation)
}

/// `w`
#[must_use]
pub fn word_forward(view: &TextView, pos: Position) -> Position {
    forward_start(view, pos, classify)
}

/// `b`
#[must_use]
pub fn word_backward(view: &TextView, pos: Position) -> Position {
    backward_start(view, pos, classify)
}

/// `e`
#[must_use]
pub fn word_end(view: &TextView, pos: Position) -> Position {
    forward_end(view, pos, classify)
}

/// `W`
#[must_use]
pub fn big_word_forward(view: &TextView, pos: Position) -> Position {
    forward_start(view, pos, classify_big)
}

/// `B`
#[must_use]
pub fn big_word_backward(view: &TextView, pos: Position) -> Position {
    backward_start(view, pos, classify_big)
}

/// `E`
#[must_use]
pub fn big_word_end(view: &TextView, pos: Position) -> Position {
    forward_end(view, pos, classify_big)
}

// Skip the current token, then blanks and line breaks (stopping on an
// empty line), and land on the next token.
fn forward_start(view: &TextView, pos: Position, class_of: fn(char) -> CharClass) -> Position {
    let rope = view.rope();
    let total = rope.len_chars();
    let Some(start) = view.pos_to_char_idx(pos) else {
        return pos;
    };
    if total == 0 || start >= total.saturating_sub(1) {
        return pos;
    }

    let mut idx = start;
    let class = class_of(rope.char(idx));
    if is_token(class) {
        while idx < total && class_of(rope.char(idx)) == class {
            idx += 1;
        }
    }

    while idx < total {
        match class_of(rope.char(idx)) {
            CharClass::Word | CharClass::Punctuation => break,
            CharClass::Blank => idx += 1,
            CharClass::Newline => {
                idx += 1;
                if idx < total && class_of(rope.char(idx)) == CharClass::Newline {
                    break;
                }
            }
        }
    }

    if idx >= total {
        return pos;
    }
    view.char_idx_to_pos(idx).unwrap_or(pos)
}

// Step back over blanks and line breaks (an empty line stops it), then to
// the start of the token found.
fn backward_start(view: &TextView, pos: Position, class_of: fn(char) -> CharClass) -> Position {
    let rope = view.rope();
    let Some(start) = view.pos_to_char_idx(pos) else {
        return pos;
    };
    if start == 0 {
        return pos;
    }

    let mut idx = start - 1;
    loop {
        match class_of(rope.char(idx)) {
            CharClass::Word | CharClass::Punctuation => break,
            CharClass::Newline if view.is_blank_line(rope.char_to_line(idx)) => {
                let line = rope.char_to_line(idx);
                return Position::new(line, 0);
            }
            CharClass::Newline | CharClass::Blank => {
                if idx == 0 {
                    return Position::ZERO;
                }
                idx -= 1;
            }
        }
    }

    let class = class_of(rope.char(idx));
    while idx > 0 && class_of(rope.char(idx - 1)) == class {
        idx -= 1;
    }
    view.char_idx_to_pos(idx).unwrap_or(pos)
}

// Move off the current char, skip blanks and line breaks, and land on the
// last char of the token found.
fn forward_end(view: &TextView, pos: Position, class_of: fn(char) -> CharClass) -> Position {
    let rope = view.rope();
    let total = rope.len_chars();
    let Some(start) = view.pos_to_char_idx(pos) else {
        return pos;
    };
    let last = total.saturating_sub(1);
    if total == 0 || start >= last {
        return pos;
    }

    let mut idx = start + 1;
    while idx < total && !is_token(class_of(rope.char(idx))) {
        idx += 1;
    }
    if idx >= total {
        return pos;
    }

    let class = class_of(rope.char(idx));
    while idx < last && class_of(rope.char(idx + 1)) == class {
        idx += 1;
    }
    view.char_idx_to_pos(idx).unwrap_or(pos)
}
