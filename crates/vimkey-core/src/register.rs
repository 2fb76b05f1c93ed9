//! Registers — named storage for yanked text and recorded macros.
//!
//! Every yank and delete copies text into a register; `p` / `P` read it
//! back. Macro recording (`qa` … `q`) stores the typed key sequence in the
//! same slots, so a register holds either text or keys:
//!
//! - **Text** remembers whether it was captured char-wise, line-wise, or
//!   block-wise, because paste behaves differently for each.
//! - **Keys** are replayed through the full engine by `@a`. Playing a text
//!   register reads its characters back as keys, which is how Vim lets you
//!   edit a macro by pasting, changing, and yanking it again.
//!
//! ## Names
//!
//! - **Unnamed (`""`)** receives every yank and delete.
//! - **Named (`"a`–`"z`)** are user-selected. Lowercase overwrites,
//!   uppercase (`"A`–`"Z`) appends to the lowercase register.

use vimkey_input::{KeyCode, KeyToken};

/// How text was captured — determines paste behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    /// Paste inserts inline at the cursor.
    Char,
    /// Paste inserts whole lines above or below the cursor line.
    Line,
    /// Captured from a visual block. Pasted inline, one row per line.
    Block,
}

/// What a register slot holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterContent {
    Text { text: String, kind: RegisterKind },
    Keys(Vec<KeyToken>),
}

impl Default for RegisterContent {
    fn default() -> Self {
        Self::Text {
            text: String::new(),
            kind: RegisterKind::Char,
        }
    }
}

/// A single register slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Register {
    content: RegisterContent,
}

impl Register {
    /// Store text, replacing whatever was there.
    pub fn yank(&mut self, text: String, kind: RegisterKind) {
        self.content = RegisterContent::Text { text, kind };
    }

    /// Append text (uppercase register names).
    ///
    /// If either side is line-wise the result is line-wise, joined by a
    /// newline. Appending text to a key register converts the keys to text
    /// first.
    pub fn append(&mut self, text: &str, kind: RegisterKind) {
        let (mut existing, existing_kind) = match &self.content {
            RegisterContent::Text { text, kind } => (text.clone(), *kind),
            RegisterContent::Keys(keys) => (keys_to_text(keys), RegisterKind::Char),
        };
        let kind = if kind == RegisterKind::Line || existing_kind == RegisterKind::Line {
            if !existing.is_empty() && !existing.ends_with('\n') {
                existing.push('\n');
            }
            RegisterKind::Line
        } else {
            existing_kind
        };
        existing.push_str(text);
        self.content = RegisterContent::Text {
            text: existing,
            kind,
        };
    }

    /// Store a recorded key sequence.
    pub fn record(&mut self, keys: Vec<KeyToken>) {
        self.content = RegisterContent::Keys(keys);
    }

    /// Append recorded keys (`qA`). Text content is read back as keys first.
    pub fn append_keys(&mut self, keys: &[KeyToken]) {
        let mut existing = self.keys();
        existing.extend_from_slice(keys);
        self.content = RegisterContent::Keys(existing);
    }

    #[must_use]
    pub const fn content(&self) -> &RegisterContent {
        &self.content
    }

    /// The register as text (keys are rendered in notation).
    #[must_use]
    pub fn text(&self) -> (String, RegisterKind) {
        match &self.content {
            RegisterContent::Text { text, kind } => (text.clone(), *kind),
            RegisterContent::Keys(keys) => (keys_to_text(keys), RegisterKind::Char),
        }
    }

    /// The register as a key sequence for macro playback.
    #[must_use]
    pub fn keys(&self) -> Vec<KeyToken> {
        match &self.content {
            RegisterContent::Keys(keys) => keys.clone(),
            RegisterContent::Text { text, .. } => text
                .chars()
                .map(|c| {
                    if c == '\n' {
                        KeyToken::from(KeyCode::Enter)
                    } else {
                        KeyToken::from_char(c)
                    }
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.content {
            RegisterContent::Text { text, .. } => text.is_empty(),
            RegisterContent::Keys(keys) => keys.is_empty(),
        }
    }
}

/// Render keys as register text: printable keys become their character,
/// `<CR>` a newline, everything else its notation.
fn keys_to_text(keys: &[KeyToken]) -> String {
    let mut out = String::new();
    for key in keys {
        match (key.as_str(), key.as_char()) {
            ("<CR>", _) => out.push('\n'),
            (_, Some(c)) => out.push(c),
            (s, None) => out.push_str(s),
        }
    }
    out
}

// ── Register file ────────────────────────────────────────────────────────

/// True for names a `"x` prefix, `qx`, or `@x` may use.
#[must_use]
pub const fn is_valid_name(name: char) -> bool {
    name.is_ascii_alphabetic() || name == '"'
}

/// The unnamed register plus the 26 named registers.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    unnamed: Register,
    named: [Register; 26],
}

impl RegisterFile {
    #[must_use]
    pub fn new() -> Self {
        Self {
            unnamed: Register::default(),
            named: std::array::from_fn(|_| Register::default()),
        }
    }

    fn named_index(name: char) -> Option<usize> {
        name.is_ascii_alphabetic()
            .then(|| (name.to_ascii_lowercase() as u8 - b'a') as usize)
    }

    /// Store yanked or deleted text.
    ///
    /// - `None` / `'"'` → unnamed only
    /// - `'a'..='z'` → overwrite named, copy to unnamed
    /// - `'A'..='Z'` → append to named, copy the result to unnamed
    pub fn yank(&mut self, name: Option<char>, text: String, kind: RegisterKind) {
        match name.and_then(|n| Self::named_index(n).map(|i| (n, i))) {
            Some((n, idx)) if n.is_ascii_uppercase() => {
                self.named[idx].append(&text, kind);
                self.unnamed = self.named[idx].clone();
            }
            Some((_, idx)) => {
                self.named[idx].yank(text.clone(), kind);
                self.unnamed.yank(text, kind);
            }
            None => self.unnamed.yank(text, kind),
        }
    }

    /// Store a recorded macro. Uppercase appends. The unnamed register is
    /// left alone, as in Vim.
    pub fn record(&mut self, name: char, keys: Vec<KeyToken>) {
        match Self::named_index(name) {
            Some(idx) if name.is_ascii_uppercase() => self.named[idx].append_keys(&keys),
            Some(idx) => self.named[idx].record(keys),
            None => self.unnamed.record(keys),
        }
    }

    /// Read a register. Uppercase reads the lowercase slot; `None` and
    /// anything unrecognized read the unnamed register.
    #[must_use]
    pub fn get(&self, name: Option<char>) -> &Register {
        match name.and_then(Self::named_index) {
            Some(idx) => &self.named[idx],
            None => &self.unnamed,
        }
    }

    /// Empty every register.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
