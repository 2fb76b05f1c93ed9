//! User remaps and the resolver that expands them.
//!
//! Remaps are checked before the built-in grammar. The [`Resolver`] holds
//! the keys that might still become a remap and decides, one key at a
//! time, between four outcomes:
//!
//! - the held keys are exactly one remap source and nothing longer starts
//!   with them → [`Resolution::Expanded`]
//! - they are a strict prefix of some longer source → [`Resolution::Pending`]
//!   and a deadline is armed; when it passes, [`Resolver::timeout`] settles
//!   the keys as they are
//! - they can no longer match → the longest exact remap at their front is
//!   expanded, or, failing that, the first key goes to the action matcher
//!   unmapped ([`Resolution::Unmapped`]) and the rest are retried
//! - the expansion is too deep → [`Resolution::DepthExceeded`]
//!
//! Expanded keys carry their depth, so `a → b`, `b → a` stops at the
//! configured limit instead of spinning forever.

use std::time::{Duration, Instant};

use log::debug;
use vimkey_input::{KeyToken, format_keys};

use crate::error::ConfigError;
use crate::mode::{Mode, ModeSet};

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// One user mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapEntry {
    pub before: Vec<KeyToken>,
    pub after: Vec<KeyToken>,
    pub modes: ModeSet,
    /// `:map` (true) or `:noremap` (false) semantics for the target.
    pub recursive: bool,
}

/// How a key sequence relates to the remap table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemapMatch<'a> {
    /// Exactly one source, and no longer source starts with it.
    Exact(&'a RemapEntry),
    /// A strict prefix of at least one longer source.
    Prefix,
    None,
}

/// All remaps, across every mode group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapTable {
    entries: Vec<RemapEntry>,
}

impl RemapTable {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a mapping. `group` names the config section for error messages.
    ///
    /// # Errors
    ///
    /// [`ConfigError::EmptyRemap`] for an empty source and
    /// [`ConfigError::DuplicateRemap`] when the source is already mapped in
    /// an overlapping mode set.
    pub fn add(&mut self, entry: RemapEntry, group: &'static str) -> Result<(), ConfigError> {
        if entry.before.is_empty() {
            return Err(ConfigError::EmptyRemap { group });
        }
        if self
            .entries
            .iter()
            .any(|e| e.before == entry.before && e.modes.intersects(entry.modes))
        {
            return Err(ConfigError::DuplicateRemap {
                group,
                keys: format_keys(&entry.before),
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn active(&self, mode: Mode) -> impl Iterator<Item = &RemapEntry> {
        let flag = mode.flag();
        self.entries.iter().filter(move |e| e.modes.contains(flag))
    }

    /// Classify `keys` against the remaps active in `mode`.
    #[must_use]
    pub fn classify(&self, keys: &[KeyToken], mode: Mode) -> RemapMatch<'_> {
        let mut exact = None;
        let mut longer = false;
        for entry in self.active(mode) {
            if entry.before == keys {
                exact = Some(entry);
            } else if entry.before.len() > keys.len() && entry.before.starts_with(keys) {
                longer = true;
            }
        }
        match (exact, longer) {
            (_, true) => RemapMatch::Prefix,
            (Some(entry), false) => RemapMatch::Exact(entry),
            (None, false) => RemapMatch::None,
        }
    }

    /// The longest remap whose source is a prefix of `keys` (possibly all
    /// of it).
    #[must_use]
    pub fn longest_prefix_of(&self, keys: &[KeyToken], mode: Mode) -> Option<&RemapEntry> {
        self.active(mode)
            .filter(|e| keys.starts_with(&e.before))
            .max_by_key(|e| e.before.len())
    }
}

// ---------------------------------------------------------------------------
// Queued keys
// ---------------------------------------------------------------------------

/// A key waiting to be processed, with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedKey {
    pub key: KeyToken,
    /// False for `:noremap` targets, dot-repeat replays, and the protected
    /// head of a self-prefixed target.
    pub remappable: bool,
    /// 0 for keys the user typed; +1 for each expansion or playback.
    pub depth: usize,
}

impl QueuedKey {
    /// A key straight from the user.
    #[must_use]
    pub const fn typed(key: KeyToken) -> Self {
        Self {
            key,
            remappable: true,
            depth: 0,
        }
    }

    #[must_use]
    pub const fn new(key: KeyToken, remappable: bool, depth: usize) -> Self {
        Self {
            key,
            remappable,
            depth,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// What the resolver decided about the keys it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Still ambiguous; wait for more keys or the deadline.
    Pending,
    /// Keys to process next, in order, ahead of anything already queued.
    Expanded(Vec<QueuedKey>),
    /// `key` is not part of a remap and goes to the action matcher; the
    /// `requeue` keys are retried after it.
    Unmapped {
        key: QueuedKey,
        requeue: Vec<QueuedKey>,
    },
    /// The expansion would exceed the recursion limit.
    DepthExceeded,
}

/// The held keys of a possibly-unfinished remap.
#[derive(Debug, Default)]
pub struct Resolver {
    held: Vec<QueuedKey>,
    deadline: Option<Instant>,
}

impl Resolver {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            held: Vec::new(),
            deadline: None,
        }
    }

    /// Offer one key.
    pub fn feed(
        &mut self,
        key: QueuedKey,
        table: &RemapTable,
        mode: Mode,
        timeout: Duration,
        max_depth: usize,
    ) -> Resolution {
        if !key.remappable {
            if self.held.is_empty() {
                return Resolution::Unmapped {
                    key,
                    requeue: Vec::new(),
                };
            }
            // A protected key ends any chord in progress.
            return match self.settle(table, mode, max_depth) {
                Resolution::Expanded(mut keys) => {
                    keys.push(key);
                    Resolution::Expanded(keys)
                }
                Resolution::Unmapped { key: first, mut requeue } => {
                    requeue.push(key);
                    Resolution::Unmapped {
                        key: first,
                        requeue,
                    }
                }
                other => other,
            };
        }

        self.held.push(key);
        let keys = self.tokens();
        match table.classify(&keys, mode) {
            RemapMatch::Exact(entry) => {
                let source = std::mem::take(&mut self.held);
                self.deadline = None;
                expand(entry, &source, Vec::new(), max_depth)
            }
            RemapMatch::Prefix => {
                if self.deadline.is_none() {
                    self.deadline = Some(Instant::now() + timeout);
                }
                debug!("remap pending on {}", format_keys(&keys));
                Resolution::Pending
            }
            RemapMatch::None => self.settle(table, mode, max_depth),
        }
    }

    /// The deadline passed: resolve the held keys as they stand, preferring
    /// the longest complete remap among them. `None` if nothing is held.
    pub fn timeout(&mut self, table: &RemapTable, mode: Mode, max_depth: usize) -> Option<Resolution> {
        if self.held.is_empty() {
            self.deadline = None;
            return None;
        }
        debug!("remap timeout on {}", format_keys(&self.tokens()));
        Some(self.settle(table, mode, max_depth))
    }

    /// Drop everything held (force-stop, mode reset).
    pub fn clear(&mut self) {
        self.held.clear();
        self.deadline = None;
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.held.is_empty()
    }

    /// The held keys.
    #[must_use]
    pub fn tokens(&self) -> Vec<KeyToken> {
        self.held.iter().map(|q| q.key.clone()).collect()
    }

    /// The held keys can no longer grow into a longer remap.
    fn settle(&mut self, table: &RemapTable, mode: Mode, max_depth: usize) -> Resolution {
        let mut held = std::mem::take(&mut self.held);
        self.deadline = None;
        let keys: Vec<KeyToken> = held.iter().map(|q| q.key.clone()).collect();
        if let Some(entry) = table.longest_prefix_of(&keys, mode) {
            let rest = held.split_off(entry.before.len());
            return expand(entry, &held, rest, max_depth);
        }
        let mut rest = held.into_iter();
        match rest.next() {
            Some(key) => Resolution::Unmapped {
                key,
                requeue: rest.collect(),
            },
            None => Resolution::Pending,
        }
    }
}

/// Expand `entry` whose source keys were `source`; `rest` follows the
/// target.
fn expand(
    entry: &RemapEntry,
    source: &[QueuedKey],
    rest: Vec<QueuedKey>,
    max_depth: usize,
) -> Resolution {
    let depth = source.iter().map(|q| q.depth).max().unwrap_or(0) + 1;
    if depth > max_depth {
        return Resolution::DepthExceeded;
    }
    // `:map j gj` style: the target's copy of the source is never remapped
    // again.
    let protected = if entry.after.starts_with(&entry.before) {
        entry.before.len()
    } else {
        0
    };
    debug!(
        "remap {} -> {} (depth {depth})",
        format_keys(&entry.before),
        format_keys(&entry.after)
    );
    let mut keys: Vec<QueuedKey> = entry
        .after
        .iter()
        .enumerate()
        .map(|(i, key)| QueuedKey::new(key.clone(), entry.recursive && i >= protected, depth))
        .collect();
    keys.extend(rest);
    Resolution::Expanded(keys)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vimkey_input::parse_keys;

    const LONG: Duration = Duration::from_secs(60);

    fn keys(s: &str) -> Vec<KeyToken> {
        parse_keys(s).unwrap()
    }

    fn entry(before: &str, after: &str, modes: ModeSet, recursive: bool) -> RemapEntry {
        RemapEntry {
            before: keys(before),
            after: keys(after),
            modes,
            recursive,
        }
    }

    fn table(entries: Vec<RemapEntry>) -> RemapTable {
        let mut t = RemapTable::new();
        for e in entries {
            t.add(e, "test").unwrap();
        }
        t
    }

    fn typed(s: &str) -> Vec<QueuedKey> {
        keys(s).into_iter().map(QueuedKey::typed).collect()
    }

    fn tokens(queued: &[QueuedKey]) -> Vec<KeyToken> {
        queued.iter().map(|q| q.key.clone()).collect()
    }

    fn feed_all(r: &mut Resolver, t: &RemapTable, mode: Mode, s: &str) -> Resolution {
        let mut last = Resolution::Pending;
        for k in typed(s) {
            last = r.feed(k, t, mode, LONG, 10);
        }
        last
    }

    // -- Table ---------------------------------------------------------------

    #[test]
    fn classify_exact_prefix_none() {
        let t = table(vec![
            entry("jj", "<Esc>", ModeSet::INSERT, true),
            entry("jk", "x", ModeSet::INSERT, true),
        ]);
        assert_eq!(t.classify(&keys("j"), Mode::Insert), RemapMatch::Prefix);
        assert!(matches!(t.classify(&keys("jj"), Mode::Insert), RemapMatch::Exact(_)));
        assert_eq!(t.classify(&keys("jx"), Mode::Insert), RemapMatch::None);
        // Wrong mode.
        assert_eq!(t.classify(&keys("jj"), Mode::Normal), RemapMatch::None);
    }

    #[test]
    fn exact_that_is_also_prefix_is_ambiguous() {
        let t = table(vec![
            entry("g", "x", ModeSet::NORMAL, true),
            entry("gx", "y", ModeSet::NORMAL, true),
        ]);
        assert_eq!(t.classify(&keys("g"), Mode::Normal), RemapMatch::Prefix);
    }

    #[test]
    fn duplicate_source_rejected() {
        let mut t = RemapTable::new();
        t.add(entry("jj", "a", ModeSet::INSERT, true), "insert").unwrap();
        let err = t.add(entry("jj", "b", ModeSet::TYPING, true), "insert");
        assert!(matches!(err, Err(ConfigError::DuplicateRemap { .. })));
        // Same source, disjoint modes: fine.
        t.add(entry("jj", "c", ModeSet::NORMAL, true), "normal").unwrap();
    }

    #[test]
    fn empty_source_rejected() {
        let mut t = RemapTable::new();
        let err = t.add(
            RemapEntry {
                before: Vec::new(),
                after: keys("x"),
                modes: ModeSet::NORMAL,
                recursive: true,
            },
            "normal",
        );
        assert!(matches!(err, Err(ConfigError::EmptyRemap { .. })));
    }

    // -- Resolver ------------------------------------------------------------

    #[test]
    fn exact_remap_expands() {
        let t = table(vec![entry("jj", "<Esc>", ModeSet::INSERT, true)]);
        let mut r = Resolver::new();
        assert_eq!(r.feed(QueuedKey::typed(keys("j")[0].clone()), &t, Mode::Insert, LONG, 10), Resolution::Pending);
        assert!(r.deadline().is_some());
        let Resolution::Expanded(out) = r.feed(QueuedKey::typed(keys("j")[0].clone()), &t, Mode::Insert, LONG, 10) else {
            panic!("expected expansion");
        };
        assert_eq!(tokens(&out), keys("<Esc>"));
        assert_eq!(out[0].depth, 1);
        assert!(!r.is_pending());
        assert_eq!(r.deadline(), None);
    }

    #[test]
    fn mismatch_passes_first_key_and_requeues_rest() {
        let t = table(vec![entry("jj", "<Esc>", ModeSet::INSERT, true)]);
        let mut r = Resolver::new();
        let res = feed_all(&mut r, &t, Mode::Insert, "jx");
        assert_eq!(
            res,
            Resolution::Unmapped {
                key: QueuedKey::typed(keys("j")[0].clone()),
                requeue: typed("x"),
            }
        );
    }

    #[test]
    fn no_remaps_passes_straight_through() {
        let t = RemapTable::new();
        let mut r = Resolver::new();
        let res = feed_all(&mut r, &t, Mode::Normal, "d");
        assert!(matches!(res, Resolution::Unmapped { ref requeue, .. } if requeue.is_empty()));
    }

    #[test]
    fn timeout_prefers_longest_exact() {
        let t = table(vec![
            entry("j", "gj", ModeSet::NORMAL, false),
            entry("jjk", "x", ModeSet::NORMAL, true),
        ]);
        let mut r = Resolver::new();
        assert_eq!(feed_all(&mut r, &t, Mode::Normal, "jj"), Resolution::Pending);
        let Some(Resolution::Expanded(out)) = r.timeout(&t, Mode::Normal, 10) else {
            panic!("expected expansion");
        };
        // `j` expands; the second `j` is retried afterwards.
        assert_eq!(tokens(&out), keys("gjj"));
        assert!(!out[0].remappable);
        assert!(out[2].remappable);
        assert_eq!(out[2].depth, 0);
    }

    #[test]
    fn timeout_without_exact_passes_first_key() {
        let t = table(vec![entry("jj", "<Esc>", ModeSet::INSERT, true)]);
        let mut r = Resolver::new();
        feed_all(&mut r, &t, Mode::Insert, "j");
        assert_eq!(
            r.timeout(&t, Mode::Insert, 10),
            Some(Resolution::Unmapped {
                key: QueuedKey::typed(keys("j")[0].clone()),
                requeue: Vec::new(),
            })
        );
        assert_eq!(r.timeout(&t, Mode::Insert, 10), None);
    }

    #[test]
    fn self_prefixed_target_is_protected() {
        let t = table(vec![entry("j", "jzz", ModeSet::NORMAL, true)]);
        let mut r = Resolver::new();
        let Resolution::Expanded(out) = feed_all(&mut r, &t, Mode::Normal, "j") else {
            panic!("expected expansion");
        };
        let flags: Vec<bool> = out.iter().map(|q| q.remappable).collect();
        assert_eq!(flags, vec![false, true, true]);
    }

    #[test]
    fn depth_limit() {
        let t = table(vec![entry("a", "b", ModeSet::NORMAL, true)]);
        let mut r = Resolver::new();
        let deep = QueuedKey::new(keys("a")[0].clone(), true, 10);
        assert_eq!(r.feed(deep, &t, Mode::Normal, LONG, 10), Resolution::DepthExceeded);
    }

    #[test]
    fn protected_key_settles_held_chord() {
        let t = table(vec![entry("jj", "<Esc>", ModeSet::INSERT, true)]);
        let mut r = Resolver::new();
        feed_all(&mut r, &t, Mode::Insert, "j");
        let protected = QueuedKey::new(keys("j")[0].clone(), false, 1);
        let res = r.feed(protected.clone(), &t, Mode::Insert, LONG, 10);
        assert_eq!(
            res,
            Resolution::Unmapped {
                key: QueuedKey::typed(keys("j")[0].clone()),
                requeue: vec![protected],
            }
        );
    }

    #[test]
    fn clear_drops_held_keys() {
        let t = table(vec![entry("jj", "<Esc>", ModeSet::INSERT, true)]);
        let mut r = Resolver::new();
        feed_all(&mut r, &t, Mode::Insert, "j");
        r.clear();
        assert!(!r.is_pending());
        assert_eq!(r.deadline(), None);
    }
}
