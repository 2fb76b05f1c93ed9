//! Macro recording and playback.
//!
//! `qa` starts recording into register `a`; every key the user types from
//! then on is captured raw, before remapping, so playback goes through the
//! same remaps again. The `q` that stops the recording is not part of the
//! macro: the recorder keeps a mark at the last point the engine was idle
//! and the stop truncates back to it.
//!
//! Playback does not bypass anything. `@a` puts the register's keys at the
//! front of the input queue, one level deeper than the key that asked for
//! them, so a macro that plays itself runs into the recursion limit like a
//! recursive remap does. A count plays the register lazily, one pass
//! after the other.

use log::debug;
use vimkey_input::{KeyToken, format_keys};

use crate::error::UserError;
use crate::register::Register;
use crate::remap::QueuedKey;

#[derive(Debug, Clone, Default)]
pub struct MacroRecorder {
    register: Option<char>,
    keys: Vec<KeyToken>,
    mark: usize,
}

impl MacroRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start recording into `register`.
    ///
    /// # Errors
    ///
    /// [`UserError::InvalidRegister`] unless `register` is a letter.
    pub fn start(&mut self, register: char) -> Result<(), UserError> {
        if !register.is_ascii_alphabetic() {
            return Err(UserError::InvalidRegister(register));
        }
        debug!("recording @{register}");
        self.register = Some(register);
        self.keys.clear();
        self.mark = 0;
        Ok(())
    }

    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.register.is_some()
    }

    /// The register being recorded into.
    #[must_use]
    pub const fn register(&self) -> Option<char> {
        self.register
    }

    /// Capture one typed key.
    pub fn push(&mut self, key: KeyToken) {
        if self.is_recording() {
            self.keys.push(key);
        }
    }

    /// The engine went idle: everything so far is a finished command.
    pub fn mark(&mut self) {
        self.mark = self.keys.len();
    }

    /// Stop recording. Returns the register and the keys up to the last
    /// idle point.
    pub fn stop(&mut self) -> Option<(char, Vec<KeyToken>)> {
        let register = self.register.take()?;
        let mut keys = std::mem::take(&mut self.keys);
        keys.truncate(self.mark);
        self.mark = 0;
        debug!("recorded @{register}: {}", format_keys(&keys));
        Some((register, keys))
    }

    /// Drop a recording in progress without storing it.
    pub fn cancel(&mut self) {
        self.register = None;
        self.keys.clear();
        self.mark = 0;
    }
}

/// A macro queued for `count` plays. Each pass is expanded only when the
/// previous one has drained, so a huge count costs one pass of keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playback {
    keys: Vec<KeyToken>,
    remaining: usize,
    depth: usize,
}

impl Playback {
    /// The next pass over the register, at the playback depth.
    pub fn next_pass(&mut self) -> Option<Vec<QueuedKey>> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(
            self.keys
                .iter()
                .cloned()
                .map(|key| QueuedKey::new(key, true, self.depth))
                .collect(),
        )
    }

    /// Passes not yet expanded.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.remaining
    }
}

/// Prepare `count` plays of `register` at `depth`.
///
/// # Errors
///
/// [`UserError::EmptyRegister`] if there is nothing to play, and
/// [`UserError::RecursiveMapping`] past `max_depth`.
pub fn playback(
    name: char,
    register: &Register,
    count: usize,
    depth: usize,
    max_depth: usize,
) -> Result<Playback, UserError> {
    if register.is_empty() {
        return Err(UserError::EmptyRegister(name));
    }
    if depth > max_depth {
        return Err(UserError::RecursiveMapping);
    }
    let keys = register.keys();
    debug!("play @{name} x{count}: {}", format_keys(&keys));
    Ok(Playback {
        keys,
        remaining: count.max(1),
        depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vimkey_input::parse_keys;

    fn keys(s: &str) -> Vec<KeyToken> {
        parse_keys(s).unwrap()
    }

    // -- Recording -----------------------------------------------------------

    #[test]
    fn stop_truncates_to_mark() {
        let mut rec = MacroRecorder::new();
        rec.start('q').unwrap();
        for k in keys("dw") {
            rec.push(k);
        }
        rec.mark();
        rec.push(KeyToken::from_char('q'));
        assert_eq!(rec.stop(), Some(('q', keys("dw"))));
        assert!(!rec.is_recording());
    }

    #[test]
    fn keys_ignored_when_not_recording() {
        let mut rec = MacroRecorder::new();
        rec.push(KeyToken::from_char('x'));
        rec.mark();
        assert_eq!(rec.stop(), None);
    }

    #[test]
    fn only_letters_record() {
        let mut rec = MacroRecorder::new();
        assert_eq!(rec.start('1'), Err(UserError::InvalidRegister('1')));
        assert_eq!(rec.start('A'), Ok(()));
        assert_eq!(rec.register(), Some('A'));
        rec.cancel();
        assert_eq!(rec.register(), None);
    }

    // -- Playback ------------------------------------------------------------

    #[test]
    fn playback_expands_one_pass_at_a_time() {
        let mut reg = Register::default();
        reg.record(keys("x"));
        let mut play = playback('a', &reg, 3, 1, 10).unwrap();
        let pass = play.next_pass().unwrap();
        assert_eq!(pass.len(), 1);
        assert!(pass.iter().all(|q| q.depth == 1 && q.remappable));
        assert_eq!(play.remaining(), 2);
        assert!(play.next_pass().is_some());
        assert!(play.next_pass().is_some());
        assert_eq!(play.next_pass(), None);
    }

    #[test]
    fn huge_count_holds_a_single_pass() {
        let mut reg = Register::default();
        reg.record(keys("jj"));
        let mut play = playback('a', &reg, 999_999_999, 1, 10).unwrap();
        assert_eq!(play.next_pass().map(|pass| pass.len()), Some(2));
        assert_eq!(play.remaining(), 999_999_998);
    }

    #[test]
    fn playback_errors() {
        let empty = Register::default();
        assert_eq!(playback('a', &empty, 1, 1, 10), Err(UserError::EmptyRegister('a')));
        let mut reg = Register::default();
        reg.record(keys("@a"));
        assert_eq!(playback('a', &reg, 1, 11, 10), Err(UserError::RecursiveMapping));
    }
}
