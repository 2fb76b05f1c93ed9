//! Engine configuration.
//!
//! Loaded from TOML once at startup (and again on change notification).
//! A loaded [`Config`] is immutable; engines hold it as an `Arc<Config>`
//! snapshot so a reload never disturbs a key sequence already in flight.
//!
//! ```toml
//! timeout_ms = 1000
//! leader = "\\"
//!
//! [[insert_remaps]]
//! before = "jj"
//! after = "<Esc>"
//! ```
//!
//! Everything is validated here: notation, empty or duplicate remaps, remaps
//! that would swallow the force-stop key, and the built-in grammar itself.
//! A `Config` that exists is usable.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use vimkey_input::{KeyToken, format_keys, parse_keys_with_leader};

use crate::error::ConfigError;
use crate::grammar::Grammar;
use crate::mode::ModeSet;
use crate::remap::{RemapEntry, RemapTable};

// ---------------------------------------------------------------------------
// On-disk shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigRaw {
    timeout_ms: u64,
    leader: String,
    force_stop: String,
    toggle: String,
    max_recursion_depth: usize,
    history_size: usize,
    shift_width: usize,
    normal_remaps: Vec<RemapRaw>,
    insert_remaps: Vec<RemapRaw>,
    visual_remaps: Vec<RemapRaw>,
    operator_pending_remaps: Vec<RemapRaw>,
    command_line_remaps: Vec<RemapRaw>,
}

impl Default for ConfigRaw {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            leader: "\\".to_string(),
            force_stop: "<Esc>".to_string(),
            toggle: "<C-A-v>".to_string(),
            max_recursion_depth: 1000,
            history_size: 50,
            shift_width: 4,
            normal_remaps: Vec::new(),
            insert_remaps: Vec::new(),
            visual_remaps: Vec::new(),
            operator_pending_remaps: Vec::new(),
            command_line_remaps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RemapRaw {
    before: String,
    after: String,
    #[serde(default = "recursive_default")]
    recursive: bool,
}

const fn recursive_default() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// A validated configuration snapshot.
#[derive(Debug, Clone)]
pub struct Config {
    /// How long an ambiguous remap waits for its next key.
    pub timeout: Duration,
    pub leader: KeyToken,
    /// Unconditionally aborts pending keys, playback, and operators.
    pub force_stop: KeyToken,
    /// Enables / disables the engine from any mode.
    pub toggle: KeyToken,
    pub max_recursion_depth: usize,
    /// Bound on command-line and search history.
    pub history_size: usize,
    /// Columns per `>` / `<` step.
    pub shift_width: usize,
    pub remaps: RemapTable,
    pub grammar: Arc<Grammar>,
}

impl Config {
    /// The defaults, with no remaps.
    ///
    /// # Errors
    ///
    /// Only if the built-in grammar is inconsistent.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_raw(ConfigRaw::default())
    }

    /// Parse and validate a TOML document. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] except `Io`.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let raw: ConfigRaw = toml::from_str(source)?;
        Self::from_raw(raw)
    }

    /// Read and validate a TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file can't be read, otherwise as
    /// [`Config::from_toml`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&source)
    }

    fn from_raw(raw: ConfigRaw) -> Result<Self, ConfigError> {
        let leader = single_key("leader", &raw.leader, None)?;
        let force_stop = single_key("force_stop", &raw.force_stop, None)?;
        let toggle = single_key("toggle", &raw.toggle, None)?;

        let mut remaps = RemapTable::new();
        let groups = [
            ("normal_remaps", ModeSet::NORMAL, raw.normal_remaps),
            ("insert_remaps", ModeSet::TYPING, raw.insert_remaps),
            ("visual_remaps", ModeSet::ANY_VISUAL, raw.visual_remaps),
            (
                "operator_pending_remaps",
                ModeSet::OPERATOR_PENDING,
                raw.operator_pending_remaps,
            ),
            ("command_line_remaps", ModeSet::PROMPT, raw.command_line_remaps),
        ];
        for (group, modes, entries) in groups {
            for (i, entry) in entries.into_iter().enumerate() {
                let field = |name: &str| format!("{group}[{i}].{name}");
                let before = keys(&field("before"), &entry.before, &leader)?;
                let after = keys(&field("after"), &entry.after, &leader)?;
                if before.first() == Some(&force_stop) {
                    return Err(ConfigError::ForceStopRemap {
                        group,
                        keys: format_keys(&before),
                    });
                }
                remaps.add(
                    RemapEntry {
                        before,
                        after,
                        modes,
                        recursive: entry.recursive,
                    },
                    group,
                )?;
            }
        }

        Ok(Self {
            timeout: Duration::from_millis(raw.timeout_ms),
            leader,
            force_stop,
            toggle,
            max_recursion_depth: raw.max_recursion_depth.max(1),
            history_size: raw.history_size.max(1),
            shift_width: raw.shift_width.max(1),
            remaps,
            grammar: Arc::new(Grammar::vim()?),
        })
    }
}

fn keys(field: &str, source: &str, leader: &KeyToken) -> Result<Vec<KeyToken>, ConfigError> {
    parse_keys_with_leader(source, Some(leader)).map_err(|source| ConfigError::Notation {
        field: field.to_string(),
        source,
    })
}

fn single_key(field: &str, source: &str, leader: Option<&KeyToken>) -> Result<KeyToken, ConfigError> {
    let notation = |source| ConfigError::Notation {
        field: field.to_string(),
        source,
    };
    let mut parsed = parse_keys_with_leader(source, leader).map_err(notation)?;
    if parsed.len() != 1 {
        return Err(notation(vimkey_input::NotationError::NotSingleKey(
            source.to_string(),
        )));
    }
    Ok(parsed.remove(0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vimkey_input::parse_keys;

    use crate::mode::Mode;
    use crate::remap::RemapMatch;

    #[test]
    fn defaults() {
        let config = Config::builtin().unwrap();
        assert_eq!(config.timeout, Duration::from_millis(1000));
        assert_eq!(config.leader.as_str(), "\\");
        assert_eq!(config.force_stop.as_str(), "<Esc>");
        assert_eq!(config.toggle.as_str(), "<C-A-v>");
        assert_eq!(config.max_recursion_depth, 1000);
        assert_eq!(config.history_size, 50);
        assert!(config.remaps.is_empty());
    }

    #[test]
    fn empty_document_is_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.shift_width, 4);
    }

    #[test]
    fn remap_groups_and_leader() {
        let config = Config::from_toml(
            r#"
            timeout_ms = 250
            leader = "<Space>"

            [[normal_remaps]]
            before = "<leader>w"
            after = ":w<CR>"
            recursive = false

            [[insert_remaps]]
            before = "jj"
            after = "<Esc>"
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.remaps.len(), 2);

        let Some(entry) = config
            .remaps
            .longest_prefix_of(&parse_keys("<Space>w").unwrap(), Mode::Normal)
        else {
            panic!("leader remap missing");
        };
        assert_eq!(entry.after, parse_keys(":w<CR>").unwrap());
        assert!(!entry.recursive);

        // Insert remaps also apply in Replace, and default to recursive.
        assert!(matches!(
            config.remaps.classify(&parse_keys("jj").unwrap(), Mode::Replace),
            RemapMatch::Exact(e) if e.recursive
        ));
        assert_eq!(
            config.remaps.classify(&parse_keys("jj").unwrap(), Mode::Normal),
            RemapMatch::None
        );
    }

    #[test]
    fn unknown_field_rejected() {
        assert!(matches!(
            Config::from_toml("timeoutt = 3"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn bad_notation_names_field() {
        let err = Config::from_toml(
            r#"
            [[normal_remaps]]
            before = "<Bogus>"
            after = "x"
            "#,
        )
        .unwrap_err();
        let ConfigError::Notation { field, .. } = err else {
            panic!("expected notation error, got {err:?}");
        };
        assert_eq!(field, "normal_remaps[0].before");
    }

    #[test]
    fn force_stop_source_rejected() {
        let err = Config::from_toml(
            r#"
            [[insert_remaps]]
            before = "<Esc>x"
            after = "y"
            "#,
        );
        assert!(matches!(err, Err(ConfigError::ForceStopRemap { .. })));
    }

    #[test]
    fn duplicate_remap_rejected() {
        let err = Config::from_toml(
            r#"
            [[visual_remaps]]
            before = "J"
            after = "5j"

            [[visual_remaps]]
            before = "J"
            after = "10j"
            "#,
        );
        assert!(matches!(err, Err(ConfigError::DuplicateRemap { .. })));
    }

    #[test]
    fn multi_key_toggle_rejected() {
        assert!(matches!(
            Config::from_toml(r#"toggle = "ab""#),
            Err(ConfigError::Notation { .. })
        ));
    }
}
