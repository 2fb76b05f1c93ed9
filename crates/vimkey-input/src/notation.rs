// SPDX-License-Identifier: MIT
//
// Vim key notation.
//
// Every keystroke the engine sees is a `KeyToken`: the canonical Vim
// notation string for that key. Bare printable characters are themselves
// (`a`, `G`, `$`), everything else is bracketed (`<Esc>`, `<C-w>`,
// `<S-Tab>`). Multi-character notation is ONE token, never several.
//
// # Canonical form
//
// - Modifiers are written in the fixed order `C-`, `S-`, `A-`, `D-`.
// - Shift on a printable key is folded into the character: Shift+a is `A`.
// - With Ctrl/Alt/Super held, letters are lower-cased and an explicit
//   `S-` records Shift (`<C-S-w>`). `<C-W>` in notation means `<C-w>`,
//   matching Vim, because a terminal can't tell the two apart.
// - `<C-[>` is `<Esc>`.
// - Space is `<Space>` and a literal `<` is `<lt>`, so a token string
//   never has to be re-parsed to find its boundaries.
//
// Equality and hashing are by the canonical string.

use std::fmt;
use std::str::FromStr;

use crate::key::{KeyCode, KeyEvent, Modifiers};

// ─── Errors ─────────────────────────────────────────────────────────────────

/// Malformed key notation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotationError {
    /// The input contained no keys at all.
    #[error("empty key sequence")]
    Empty,
    /// `<...>` looked like notation but named no key we know.
    #[error("unknown key name <{0}>")]
    UnknownKey(String),
    /// A single-token parse found more (or fewer) than one key.
    #[error("expected a single key, found {0:?}")]
    NotSingleKey(String),
    /// `<leader>` appeared but no leader key was configured.
    #[error("<leader> used but no leader key is set")]
    NoLeader,
}

// ─── KeyToken ───────────────────────────────────────────────────────────────

/// One normalized keystroke.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyToken(String);

impl KeyToken {
    /// The token for a bare (unmodified) character.
    #[must_use]
    pub fn from_char(ch: char) -> Self {
        Self(canonical(KeyCode::Char(ch), Modifiers::empty()))
    }

    /// Normalize a host key event.
    ///
    /// Releases and bare modifier presses aren't keystrokes in Vim's sense
    /// and produce `None`.
    #[must_use]
    pub fn from_event(event: &KeyEvent) -> Option<Self> {
        if !event.is_press() || event.code == KeyCode::Modifier {
            return None;
        }
        Some(Self(canonical(event.code, event.modifiers)))
    }

    /// The canonical notation string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The character of a bare printable key (`a`, `$`, `<Space>`, `<lt>`).
    #[must_use]
    pub fn as_char(&self) -> Option<char> {
        match self.0.as_str() {
            "<Space>" => Some(' '),
            "<lt>" => Some('<'),
            s => single_char(s),
        }
    }

    /// Text inserted when this key is typed into Insert, Replace, or the
    /// command line. `None` for keys that don't produce text.
    #[must_use]
    pub fn typed_text(&self) -> Option<char> {
        if self.0 == "<Tab>" {
            return Some('\t');
        }
        self.as_char()
    }

    /// Value of a bare digit key.
    #[must_use]
    pub fn digit(&self) -> Option<u32> {
        single_char(&self.0).and_then(|c| c.to_digit(10))
    }

    /// True for bracketed tokens (`<Esc>`, `<C-w>`, `<Space>`).
    #[inline]
    #[must_use]
    pub fn is_special(&self) -> bool {
        self.0.starts_with('<') && self.0.len() > 1
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

impl fmt::Debug for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.0)
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<char> for KeyToken {
    fn from(ch: char) -> Self {
        Self::from_char(ch)
    }
}

impl From<KeyCode> for KeyToken {
    fn from(code: KeyCode) -> Self {
        Self(canonical(code, Modifiers::empty()))
    }
}

impl FromStr for KeyToken {
    type Err = NotationError;

    /// Parse exactly one key (`"a"`, `"<C-w>"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut keys = parse_keys(s)?;
        if keys.len() != 1 {
            return Err(NotationError::NotSingleKey(s.to_string()));
        }
        Ok(keys.remove(0))
    }
}

// ─── Canonical encoding ─────────────────────────────────────────────────────

fn canonical(code: KeyCode, modifiers: Modifiers) -> String {
    let mut mods = modifiers;
    let name = match code {
        KeyCode::Char('[') if mods == Modifiers::CTRL => return "<Esc>".to_string(),
        KeyCode::Char(c) => {
            if (mods - Modifiers::SHIFT).is_empty() {
                // Shift is already part of the character.
                return match c {
                    ' ' => "<Space>".to_string(),
                    '<' => "<lt>".to_string(),
                    _ => c.to_string(),
                };
            }
            let c = if c.is_ascii_uppercase() {
                mods |= Modifiers::SHIFT;
                c.to_ascii_lowercase()
            } else {
                if !c.is_ascii_alphabetic() {
                    mods -= Modifiers::SHIFT;
                }
                c
            };
            match c {
                ' ' => "Space".to_string(),
                '<' => "lt".to_string(),
                _ => c.to_string(),
            }
        }
        KeyCode::Enter => "CR".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Backspace => "BS".to_string(),
        KeyCode::Escape => "Esc".to_string(),
        KeyCode::Delete => "Del".to_string(),
        KeyCode::Insert => "Insert".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::F(n) => format!("F{n}"),
        KeyCode::Modifier => String::new(),
    };

    let mut out = String::with_capacity(name.len() + 10);
    out.push('<');
    for (flag, prefix) in [
        (Modifiers::CTRL, "C-"),
        (Modifiers::SHIFT, "S-"),
        (Modifiers::ALT, "A-"),
        (Modifiers::SUPER, "D-"),
    ] {
        if mods.contains(flag) {
            out.push_str(prefix);
        }
    }
    out.push_str(&name);
    out.push('>');
    out
}

/// Look up a bracketed key name (case-insensitive).
fn named_key(name: &str) -> Option<KeyCode> {
    let lower = name.to_ascii_lowercase();
    let code = match lower.as_str() {
        "esc" | "escape" => KeyCode::Escape,
        "cr" | "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "bs" | "backspace" => KeyCode::Backspace,
        "del" | "delete" => KeyCode::Delete,
        "insert" | "ins" => KeyCode::Insert,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "space" => KeyCode::Char(' '),
        "lt" => KeyCode::Char('<'),
        "bar" => KeyCode::Char('|'),
        "bslash" => KeyCode::Char('\\'),
        _ => {
            let n: u8 = lower.strip_prefix('f')?.parse().ok()?;
            if !(1..=35).contains(&n) {
                return None;
            }
            KeyCode::F(n)
        }
    };
    Some(code)
}

/// Parse the inside of `<...>` into a token.
fn parse_bracketed(inner: &str, leader: Option<&KeyToken>) -> Result<KeyToken, NotationError> {
    if inner.eq_ignore_ascii_case("leader") {
        return leader.cloned().ok_or(NotationError::NoLeader);
    }

    let mut mods = Modifiers::empty();
    let mut rest = inner;
    loop {
        let bytes = rest.as_bytes();
        if bytes.len() < 3 || bytes[1] != b'-' {
            break;
        }
        let flag = match bytes[0].to_ascii_uppercase() {
            b'C' => Modifiers::CTRL,
            b'S' => Modifiers::SHIFT,
            b'A' | b'M' => Modifiers::ALT,
            b'D' => Modifiers::SUPER,
            _ => break,
        };
        mods |= flag;
        rest = &rest[2..];
    }

    let code = match single_char(rest) {
        // `<C-W>` is `<C-w>`; only an explicit `S-` keeps Shift.
        Some(c) if mods.contains(Modifiers::CTRL) && !mods.contains(Modifiers::SHIFT) => {
            KeyCode::Char(c.to_ascii_lowercase())
        }
        // `<S-a>` is `A`.
        Some(c) if mods == Modifiers::SHIFT => KeyCode::Char(c.to_ascii_uppercase()),
        Some(c) => KeyCode::Char(c),
        None => named_key(rest).ok_or_else(|| NotationError::UnknownKey(inner.to_string()))?,
    };
    Ok(KeyToken(canonical(code, mods)))
}

/// Could `inner` be intended as notation? Anything with spaces or other
/// punctuation is treated as literal text instead (`a < b`).
fn looks_like_notation(inner: &str) -> bool {
    !inner.is_empty()
        && inner
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c.is_ascii_punctuation() && c != '<')
        && inner.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
}

// ─── Sequence parsing ───────────────────────────────────────────────────────

/// Split a notation string (`"2d<C-w>w"`) into tokens.
///
/// # Errors
///
/// Returns [`NotationError::UnknownKey`] for `<...>` that names no key,
/// [`NotationError::NoLeader`] for `<leader>`, and
/// [`NotationError::Empty`] for an empty string.
pub fn parse_keys(s: &str) -> Result<Vec<KeyToken>, NotationError> {
    parse_keys_with_leader(s, None)
}

/// Like [`parse_keys`], substituting `<leader>` with `leader`.
///
/// # Errors
///
/// Same as [`parse_keys`]; `<leader>` only fails when `leader` is `None`.
pub fn parse_keys_with_leader(
    s: &str,
    leader: Option<&KeyToken>,
) -> Result<Vec<KeyToken>, NotationError> {
    if s.is_empty() {
        return Err(NotationError::Empty);
    }

    let mut keys = Vec::new();
    let mut rest = s;
    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            if let Some(close) = rest[1..].find('>') {
                let inner = &rest[1..=close];
                if looks_like_notation(inner) {
                    keys.push(parse_bracketed(inner, leader)?);
                    rest = &rest[close + 2..];
                    continue;
                }
            }
        }
        keys.push(KeyToken::from_char(ch));
        rest = &rest[ch.len_utf8()..];
    }
    Ok(keys)
}

/// Join tokens back into a notation string.
#[must_use]
pub fn format_keys(keys: &[KeyToken]) -> String {
    keys.iter().map(KeyToken::as_str).collect()
}

// ─── Tests ──────────────────────────────────────────────────────────────────
