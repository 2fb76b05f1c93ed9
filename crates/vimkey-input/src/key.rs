// SPDX-License-Identifier: MIT
//
// Host key events.
//
// A host editor reports keystrokes in its own vocabulary: a key identity,
// the modifiers held, and whether the key went down, repeated, or came
// back up. These types are that vocabulary as the engine sees it. The
// host adapter fills a `KeyEvent`; `notation::KeyToken::from_event`
// turns it into the canonical grammar symbol.

use bitflags::bitflags;

// ─── Event Types ────────────────────────────────────────────────────────────

/// A keyboard event with key identity, modifiers, and press state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// Which key was pressed.
    pub code: KeyCode,
    /// Active modifier keys (Shift, Alt, Ctrl, etc.).
    pub modifiers: Modifiers,
    /// Press, repeat, or release.
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// A plain press of `code` with no modifiers.
    #[must_use]
    pub const fn press(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
            kind: KeyEventKind::Press,
        }
    }

    /// A press of `code` with `modifiers` held.
    #[must_use]
    pub const fn with(code: KeyCode, modifiers: Modifiers) -> Self {
        Self {
            code,
            modifiers,
            kind: KeyEventKind::Press,
        }
    }

    /// True for presses and auto-repeats. Releases never reach the grammar.
    #[inline]
    #[must_use]
    pub const fn is_press(&self) -> bool {
        !matches!(self.kind, KeyEventKind::Release)
    }
}

/// Key press / repeat / release distinction.
///
/// Hosts that cannot tell the difference report everything as
/// [`Press`](KeyEventKind::Press).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    /// Initial key press (or a host where state is unknown).
    #[default]
    Press,
    /// Key held down long enough to trigger auto-repeat.
    Repeat,
    /// Key released.
    Release,
}

/// Identity of a key.
///
/// Named keys have dedicated variants; printable characters use
/// [`Char`](KeyCode::Char). Function keys F1–F35 use [`F`](KeyCode::F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A Unicode character (printable).
    Char(char),
    // ── Named keys ──────────────────────────────────────────────
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    Insert,
    // ── Navigation ──────────────────────────────────────────────
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    // ── Function keys ───────────────────────────────────────────
    /// F1 through F35.
    F(u8),
    // ── Bare modifier presses ───────────────────────────────────
    /// A modifier key pressed on its own (Shift, Ctrl, ...). Never a
    /// grammar symbol.
    Modifier,
}

bitflags! {
    /// Keyboard modifier flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const CTRL  = 0b0000_0100;
        const SUPER = 0b0000_1000;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
