//! Process-wide state shared by every editor instance.
//!
//! Registers, the search history, the command-line histories, the last
//! played macro, and one changelist per document. Engines hold cheap clones
//! of a [`SharedState`] handle; every access goes through a narrow method
//! that takes the lock for exactly one read or mutation, which makes each
//! mutation a single sequence point across instances.
//!
//! Tests build a fresh `SharedState` per case, so nothing leaks between
//! them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use vimkey_input::KeyToken;

use crate::action::PromptKind;
use crate::cmdline::BoundedHistory;
use crate::config::Config;
use crate::host::EditorId;
use crate::jumplist::ChangeList;
use crate::position::Position;
use crate::register::{Register, RegisterFile, RegisterKind};
use crate::search::SearchState;

/// Default bound for the line and search histories.
pub const DEFAULT_HISTORY: usize = 50;

#[derive(Debug)]
struct SharedInner {
    registers: RegisterFile,
    searches: BoundedHistory<SearchState>,
    ex_lines: BoundedHistory<String>,
    search_lines: BoundedHistory<String>,
    changelists: HashMap<EditorId, ChangeList>,
    last_macro: Option<char>,
}

impl SharedInner {
    fn new(history: usize) -> Self {
        Self {
            registers: RegisterFile::new(),
            searches: BoundedHistory::new(history),
            ex_lines: BoundedHistory::new(history),
            search_lines: BoundedHistory::new(history),
            changelists: HashMap::new(),
            last_macro: None,
        }
    }

    const fn lines_mut(&mut self, kind: PromptKind) -> &mut BoundedHistory<String> {
        match kind {
            PromptKind::Ex => &mut self.ex_lines,
            PromptKind::Search(_) => &mut self.search_lines,
        }
    }
}

/// Handle to the shared state. Clones refer to the same state.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<Mutex<SharedInner>>,
    history: usize,
}

impl SharedState {
    #[must_use]
    pub fn new() -> Self {
        Self::with_history(DEFAULT_HISTORY)
    }

    /// State whose histories keep `history` entries.
    #[must_use]
    pub fn with_history(history: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SharedInner::new(history))),
            history,
        }
    }

    /// State sized by `config.history_size`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::with_history(config.history_size)
    }

    /// Drop everything: registers, histories, changelists.
    pub fn clear(&self) {
        *self.inner.lock() = SharedInner::new(self.history);
    }

    // ── Registers ───────────────────────────────────────────────────

    pub fn yank(&self, name: Option<char>, text: String, kind: RegisterKind) {
        self.inner.lock().registers.yank(name, text, kind);
    }

    /// A copy of register `name` (`None` = unnamed).
    #[must_use]
    pub fn register(&self, name: Option<char>) -> Register {
        self.inner.lock().registers.get(name).clone()
    }

    pub fn record_macro(&self, name: char, keys: Vec<KeyToken>) {
        self.inner.lock().registers.record(name, keys);
    }

    #[must_use]
    pub fn last_macro(&self) -> Option<char> {
        self.inner.lock().last_macro
    }

    pub fn set_last_macro(&self, name: char) {
        self.inner.lock().last_macro = Some(name);
    }

    // ── Search ──────────────────────────────────────────────────────

    pub fn push_search(&self, search: SearchState) {
        self.inner.lock().searches.push(search);
    }

    /// The most recent search (what `n` repeats).
    #[must_use]
    pub fn last_search(&self) -> Option<SearchState> {
        self.inner.lock().searches.last().cloned()
    }

    /// Search by age, 0 = oldest.
    #[must_use]
    pub fn search_at(&self, index: usize) -> Option<SearchState> {
        self.inner.lock().searches.get(index).cloned()
    }

    #[must_use]
    pub fn search_count(&self) -> usize {
        self.inner.lock().searches.len()
    }

    // ── Command-line history ────────────────────────────────────────

    pub fn push_line(&self, kind: PromptKind, line: &str) {
        if line.is_empty() {
            return;
        }
        self.inner.lock().lines_mut(kind).push(line.to_string());
    }

    /// Snapshot of the lines submitted to `kind`, oldest first.
    #[must_use]
    pub fn lines(&self, kind: PromptKind) -> Vec<String> {
        self.inner.lock().lines_mut(kind).iter().cloned().collect()
    }

    // ── Changelists ─────────────────────────────────────────────────

    pub fn push_change(&self, editor: EditorId, pos: Position) {
        self.inner
            .lock()
            .changelists
            .entry(editor)
            .or_default()
            .push(pos);
    }

    /// Drop the changelist of an editor that was closed.
    pub fn forget(&self, editor: EditorId) {
        self.inner.lock().changelists.remove(&editor);
    }

    /// `g;` for `editor`.
    #[must_use]
    pub fn change_older(&self, editor: EditorId) -> Option<Position> {
        self.inner
            .lock()
            .changelists
            .get_mut(&editor)
            .and_then(ChangeList::older)
    }

    /// `g,` for `editor`.
    #[must_use]
    pub fn change_newer(&self, editor: EditorId) -> Option<Position> {
        self.inner
            .lock()
            .changelists
            .get_mut(&editor)
            .and_then(ChangeList::newer)
    }

    #[must_use]
    pub fn changelist_len(&self, editor: EditorId) -> usize {
        self.inner
            .lock()
            .changelists
            .get(&editor)
            .map_or(0, ChangeList::len)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
