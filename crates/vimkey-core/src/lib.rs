//! # vimkey-core — modal key-sequence engine
//!
//! Turns a stream of keys into Vim actions and drives a host editor
//! through them:
//!
//! - **[`engine`]** — `VimEngine`, one per editor: the queue, the pipeline,
//!   and everything an action does
//! - **[`remap`]** — user remaps with timeout and recursion depth
//! - **[`recorded`]** / **[`grammar`]** — count, register, and the action
//!   table keys are matched against
//! - **[`machine`]** — the mode state machine: `(mode, action)` → next mode
//!   plus an effect
//! - **[`exec`]** / **[`motion`]** / **[`text_object`]** — turning effects
//!   into host edits and cursor moves
//! - **[`history`]** / **[`jumplist`]** / **[`macros`]** / **[`shared`]** —
//!   undo steps, jumps, marks, macros, registers, and the state shared
//!   between engines
//! - **[`host`]** — the traits a host implements; **[`memory`]** is an
//!   in-memory host for tests and scripting
//!
//! Keys arrive as [`vimkey_input::KeyToken`]s.

pub mod action;
pub mod cmdline;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod grammar;
pub mod history;
pub mod host;
pub mod jumplist;
pub mod machine;
pub mod macros;
pub mod memory;
pub mod mode;
pub mod motion;
pub mod position;
pub mod recorded;
pub mod register;
pub mod remap;
pub mod search;
pub mod shared;
pub mod text;
pub mod text_object;
mod word;

pub use action::{ActionId, Motion, Operator, ResolvedAction};
pub use config::Config;
pub use engine::{KeyDisposition, Status, VimEngine};
pub use error::{CommandError, ConfigError, HostError, UserError};
pub use host::{CommandExecutor, CommandOutcome, CommandRequest, EditorHost, EditorId, NoCommands};
pub use memory::{MemoryCommands, MemoryEditor};
pub use mode::{Mode, VisualKind};
pub use position::{Position, Range, Selection};
pub use shared::SharedState;
