// SPDX-License-Identifier: MIT
//
// vimkey-input — host key events and Vim key notation.
//
//   key      → KeyEvent, KeyCode, Modifiers (what a host reports)
//   notation → KeyToken, parse_keys, format_keys (what the engine matches)

pub mod key;
pub mod notation;

pub use key::{KeyCode, KeyEvent, KeyEventKind, Modifiers};
pub use notation::{KeyToken, NotationError, format_keys, parse_keys, parse_keys_with_leader};
