//! Error types.
//!
//! Three families, kept apart because they travel differently:
//!
//! - [`ConfigError`] is fatal and surfaces once, when a configuration is
//!   loaded. Nothing per-keystroke ever produces one.
//! - [`UserError`] is the vi "you typed something that can't be done"
//!   class. The engine turns it into a status message and resets; it never
//!   escapes `feed`.
//! - [`HostError`] and [`CommandError`] come back from the collaborators
//!   (the editor and the Ex executor) and are wrapped into a `UserError`.

use std::path::PathBuf;

use thiserror::Error;
use vimkey_input::NotationError;

use crate::position::Position;

/// A configuration that can't be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{field}: {source}")]
    Notation {
        field: String,
        #[source]
        source: NotationError,
    },

    #[error("{group}: remap with an empty source")]
    EmptyRemap { group: &'static str },

    #[error("{group}: remap source {keys} starts with the force-stop key")]
    ForceStopRemap { group: &'static str, keys: String },

    #[error("{group}: {keys} is remapped twice")]
    DuplicateRemap { group: &'static str, keys: String },

    #[error("duplicate binding for {keys} in {mode}")]
    DuplicateBinding { mode: String, keys: String },
}

/// The host refused or failed an edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("position {0} is outside the buffer")]
    OutOfBounds(Position),
    #[error("{0}")]
    Rejected(String),
}

/// The command executor failed to run a line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("E492: Not an editor command: {0}")]
    NotACommand(String),
    #[error("E486: Pattern not found: {0}")]
    PatternNotFound(String),
    #[error("{0}")]
    Failed(String),
}

/// A user-level failure, reported on the status line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("E20: Mark not set")]
    MarkNotSet(char),
    #[error("E354: Invalid register name: '{0}'")]
    InvalidRegister(char),
    #[error("E353: Nothing in register {0}")]
    EmptyRegister(char),
    #[error("E35: No previous regular expression")]
    NoPreviousSearch,
    #[error("E748: No previously used register")]
    NoPreviousMacro,
    #[error("E223: recursive mapping")]
    RecursiveMapping,
    #[error("E662: At start of changelist")]
    ChangelistStart,
    #[error("E663: At end of changelist")]
    ChangelistEnd,
    #[error("At start of jump list")]
    JumplistStart,
    #[error("At end of jump list")]
    JumplistEnd,
    #[error("Already at oldest change")]
    AlreadyOldest,
    #[error("Already at newest change")]
    AlreadyNewest,
    #[error("Nothing to repeat")]
    NothingToRepeat,
    #[error("{0}")]
    EditFailed(#[from] HostError),
    #[error("{0}")]
    Command(#[from] CommandError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_are_vim_style() {
        assert_eq!(UserError::MarkNotSet('a').to_string(), "E20: Mark not set");
        assert_eq!(UserError::RecursiveMapping.to_string(), "E223: recursive mapping");
        assert_eq!(
            UserError::InvalidRegister('%').to_string(),
            "E354: Invalid register name: '%'"
        );
    }

    #[test]
    fn collaborator_errors_convert() {
        let err: UserError = CommandError::NotACommand("frob".into()).into();
        assert_eq!(err.to_string(), "E492: Not an editor command: frob");
        let err: UserError = HostError::OutOfBounds(Position::new(9, 0)).into();
        assert_eq!(err.to_string(), "position 10:1 is outside the buffer");
    }

    #[test]
    fn config_errors_name_the_culprit() {
        let err = ConfigError::DuplicateBinding {
            mode: "NORMAL".into(),
            keys: "gg".into(),
        };
        assert_eq!(err.to_string(), "duplicate binding for gg in NORMAL");
    }
}
