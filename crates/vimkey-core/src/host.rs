//! The collaborator interfaces.
//!
//! The engine never touches a host editor's internals. Everything it needs
//! from the text buffer goes through [`EditorHost`], and every completed
//! `:` / `/` / `?` line goes to a [`CommandExecutor`].
//!
//! Edits are requests: `apply_edit` returns only once the host has applied
//! the change (or refused it), and the engine issues exactly one such request
//! at a time per editor instance.

use crate::action::PromptKind;
use crate::error::{CommandError, HostError};
use crate::mode::Mode;
use crate::position::{Position, Range, Selection};

/// Identifies one open editor. Engines for the same document share a
/// changelist through [`crate::shared::SharedState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditorId(pub u64);

/// The host editor as the engine sees it.
pub trait EditorHost {
    /// Replace `range` with `text`.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] when the host refuses the edit.
    fn apply_edit(&mut self, range: Range, text: &str) -> Result<(), HostError>;

    /// Current selections, primary first. Never empty.
    fn selections(&self) -> Vec<Selection>;

    fn set_selections(&mut self, selections: Vec<Selection>);

    /// Text of line `n`, without its line ending.
    fn line(&self, n: usize) -> Option<String>;

    fn line_count(&self) -> usize;

    /// Step the host's native undo stack back once. `false` at the oldest
    /// state.
    fn undo(&mut self) -> bool;

    /// Step the host's native undo stack forward once.
    fn redo(&mut self) -> bool;

    // ── Provided helpers ────────────────────────────────────────────

    /// The primary cursor.
    fn cursor(&self) -> Position {
        self.selections()
            .first()
            .map_or(Position::ZERO, |sel| sel.cursor)
    }

    /// Collapse to a single caret at `pos`.
    fn set_cursor(&mut self, pos: Position) {
        self.set_selections(vec![Selection::caret(pos)]);
    }

    /// Length of line `n` in characters.
    fn line_len(&self, n: usize) -> usize {
        self.line(n).map_or(0, |l| l.chars().count())
    }
}

/// A completed command line handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub kind: PromptKind,
    /// The line without its leader (`w`, not `:w`).
    pub text: String,
    /// The mode the prompt was opened from.
    pub origin: Mode,
    pub selections: Vec<Selection>,
}

/// How a successful command leaves the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Done; return to the invoking mode, optionally with a message.
    Completed(Option<String>),
    /// Keep the command line open (the executor wants more input).
    Continue,
}

/// Runs Ex commands and searches.
pub trait CommandExecutor {
    /// Run one line.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] when the command is unknown or fails.
    fn run(
        &mut self,
        request: &CommandRequest,
        host: &mut dyn EditorHost,
    ) -> Result<CommandOutcome, CommandError>;
}

/// An executor that knows no commands. Every line fails with
/// [`CommandError::NotACommand`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCommands;

impl CommandExecutor for NoCommands {
    fn run(
        &mut self,
        request: &CommandRequest,
        _host: &mut dyn EditorHost,
    ) -> Result<CommandOutcome, CommandError> {
        Err(CommandError::NotACommand(request.text.clone()))
    }
}
