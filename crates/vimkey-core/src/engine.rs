//! `VimEngine` — the per-editor key pipeline.
//!
//! ```text
//!  feed(key)
//!    │  toggle key ─────────────▶ Disabled ⇄ Normal
//!    │  force-stop key ─────────▶ unwind, then <Esc>
//!    ▼
//!  queue ──▶ Resolver (remaps) ──▶ RecordedState (count, register)
//!                                      │
//!                                      ▼
//!                                 Grammar::resolve ──▶ ResolvedAction
//!                                                          │
//!                                      machine::transition ▼
//!                                        Effect ──▶ Exec ──▶ EditorHost
//! ```
//!
//! Every key, typed or produced by a remap, a macro, or `.`, takes the same
//! path through the queue. The engine never blocks: when a remap is
//! ambiguous it reports [`KeyDisposition::Pending`] with a deadline and the
//! host calls [`VimEngine::flush`] once it passes. Each engine owns one
//! editor's state; registers, macros, histories, and changelists live in
//! the [`SharedState`] its engines share.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, trace, warn};
use vimkey_input::{KeyCode, KeyEvent, KeyToken, format_keys};

use crate::action::{ActionId, FindKind, InsertEntry, Motion, Operator, PromptKind, ResolvedAction};
use crate::cmdline::PromptSession;
use crate::config::Config;
use crate::error::UserError;
use crate::exec::{self, Exec, Span};
use crate::grammar::Lookup;
use crate::history::HistoryTracker;
use crate::host::{CommandExecutor, CommandOutcome, CommandRequest, EditorHost, EditorId};
use crate::machine::{self, Context, Effect, Target, Transition};
use crate::macros::{self, MacroRecorder, Playback};
use crate::mode::{Mode, PendingOperator, VisualKind};
use crate::motion;
use crate::position::{Position, Selection};
use crate::recorded::{CommandStatus, Pushed, RecordedState};
use crate::register::RegisterKind;
use crate::remap::{QueuedKey, Resolution, Resolver};
use crate::search::SearchState;
use crate::shared::SharedState;
use crate::text::TextView;
use crate::text_object;

/// What the host should do with the key it just fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// The engine handled it.
    Consumed,
    /// The engine is waiting for more keys. With a deadline, call
    /// [`VimEngine::flush`] once it passes.
    Pending { deadline: Option<Instant> },
    /// The engine is disabled; the host handles the key itself.
    PassThrough,
}

/// The status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Message(String),
    Error(UserError),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(msg) => f.write_str(msg),
            Self::Error(err) => write!(f, "{err}"),
        }
    }
}

/// Text typed since Insert or Replace was entered, for count replay and
/// for Replace-mode backspace.
#[derive(Debug, Clone)]
struct InsertSession {
    entry: Option<InsertEntry>,
    count: usize,
    overwrite: bool,
    typed: String,
    /// What each typed character overwrote (Replace mode).
    replaced: Vec<Option<char>>,
}

impl InsertSession {
    const fn new(entry: Option<InsertEntry>, count: usize, overwrite: bool) -> Self {
        Self {
            entry,
            count,
            overwrite,
            typed: String::new(),
            replaced: Vec::new(),
        }
    }
}

/// One entry of the input queue.
#[derive(Debug, Clone)]
enum Queued {
    Key(QueuedKey),
    /// The rest of a counted macro, expanded when it reaches the front.
    Replay(Playback),
}

pub struct VimEngine {
    id: EditorId,
    config: Arc<Config>,
    /// A reload waiting for the engine to go idle.
    staged: Option<Arc<Config>>,
    shared: SharedState,
    mode: Mode,
    queue: VecDeque<Queued>,
    resolver: Resolver,
    recorded: RecordedState,
    /// Depth of the key being matched.
    depth: usize,
    prompt: Option<PromptSession>,
    insert: Option<InsertSession>,
    visual_anchor: Position,
    history: HistoryTracker,
    recorder: MacroRecorder,
    last_find: Option<(FindKind, char)>,
    /// Keys since the engine was last idle in Normal mode.
    change_keys: Vec<KeyToken>,
    pending_change: bool,
    last_change: Option<Vec<KeyToken>>,
    resolved: Vec<ResolvedAction>,
    status: Option<Status>,
}

impl VimEngine {
    #[must_use]
    pub fn new(id: EditorId, config: Arc<Config>, shared: SharedState) -> Self {
        Self {
            id,
            config,
            staged: None,
            shared,
            mode: Mode::Normal,
            queue: VecDeque::new(),
            resolver: Resolver::new(),
            recorded: RecordedState::new(),
            depth: 0,
            prompt: None,
            insert: None,
            visual_anchor: Position::ZERO,
            history: HistoryTracker::new(),
            recorder: MacroRecorder::new(),
            last_find: None,
            change_keys: Vec::new(),
            pending_change: false,
            last_change: None,
            resolved: Vec::new(),
            status: None,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    #[must_use]
    pub const fn id(&self) -> EditorId {
        self.id
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub const fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// The partially typed command.
    #[must_use]
    pub const fn recorded(&self) -> &RecordedState {
        &self.recorded
    }

    /// The open `:` / `/` / `?` prompt.
    #[must_use]
    pub const fn prompt(&self) -> Option<&PromptSession> {
        self.prompt.as_ref()
    }

    /// The register a macro is being recorded into.
    #[must_use]
    pub const fn recording(&self) -> Option<char> {
        self.recorder.register()
    }

    #[must_use]
    pub const fn history(&self) -> &HistoryTracker {
        &self.history
    }

    #[must_use]
    pub const fn shared(&self) -> &SharedState {
        &self.shared
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// When [`VimEngine::flush`] is due, if a remap is waiting.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.resolver.deadline()
    }

    /// Keys are held, queued, or half-typed.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.is_idle()
    }

    /// Take the actions resolved since the last call.
    pub fn drain_resolved(&mut self) -> Vec<ResolvedAction> {
        std::mem::take(&mut self.resolved)
    }

    // ── Input ───────────────────────────────────────────────────────

    /// Feed one host key event. Releases and bare modifiers pass through.
    pub fn feed_event(
        &mut self,
        event: &KeyEvent,
        host: &mut dyn EditorHost,
        commands: &mut dyn CommandExecutor,
    ) -> KeyDisposition {
        match KeyToken::from_event(event) {
            Some(key) => self.feed(key, host, commands),
            None => KeyDisposition::PassThrough,
        }
    }

    /// Feed one typed key and process everything it makes ready.
    pub fn feed(
        &mut self,
        key: KeyToken,
        host: &mut dyn EditorHost,
        commands: &mut dyn CommandExecutor,
    ) -> KeyDisposition {
        trace!("key {key} in {}", self.mode);
        if key == self.config.toggle {
            self.toggle(host, commands);
            return KeyDisposition::Consumed;
        }
        if self.mode == Mode::Disabled {
            return KeyDisposition::PassThrough;
        }

        if key == self.config.force_stop {
            self.recorder.push(escape());
            self.force_stop(host, commands);
        } else {
            // A key arriving after the deadline does not extend the held keys.
            if self
                .resolver
                .deadline()
                .is_some_and(|deadline| Instant::now() >= deadline)
            {
                self.flush(host, commands);
            }
            self.recorder.push(key.clone());
            self.queue.push_back(Queued::Key(QueuedKey::typed(key)));
            while self.step(host, commands) {}
        }
        self.disposition()
    }

    /// The remap deadline passed: settle the held keys as they stand.
    pub fn flush(
        &mut self,
        host: &mut dyn EditorHost,
        commands: &mut dyn CommandExecutor,
    ) -> KeyDisposition {
        let config = Arc::clone(&self.config);
        if let Some(resolution) =
            self.resolver
                .timeout(&config.remaps, self.mode, config.max_recursion_depth)
        {
            self.resolve(resolution, host, commands);
            while self.step(host, commands) {}
        }
        self.disposition()
    }

    /// Queue keys behind whatever is pending. Nothing runs until
    /// [`VimEngine::step`] is called.
    pub fn enqueue(&mut self, keys: &[KeyToken]) {
        self.queue
            .extend(keys.iter().cloned().map(|key| Queued::Key(QueuedKey::typed(key))));
    }

    /// Process one queued key. `false` once the queue is empty.
    pub fn step(
        &mut self,
        host: &mut dyn EditorHost,
        commands: &mut dyn CommandExecutor,
    ) -> bool {
        let Some(front) = self.queue.pop_front() else {
            return false;
        };
        if self.mode == Mode::Disabled {
            self.queue.clear();
            return false;
        }
        let queued = match front {
            Queued::Key(queued) => queued,
            Queued::Replay(mut playback) => {
                if let Some(pass) = playback.next_pass() {
                    if playback.remaining() > 0 {
                        self.queue.push_front(Queued::Replay(playback));
                    }
                    self.push_front(pass);
                }
                return true;
            }
        };
        trace!("step {} (depth {})", queued.key, queued.depth);

        if queued.remappable || self.resolver.is_pending() {
            let config = Arc::clone(&self.config);
            let resolution = self.resolver.feed(
                queued,
                &config.remaps,
                self.mode,
                config.timeout,
                config.max_recursion_depth,
            );
            self.resolve(resolution, host, commands);
        } else {
            self.match_action(queued, host, commands);
        }

        if self.queue.is_empty() {
            self.settle();
        }
        true
    }

    /// Abort everything in flight (held remap keys, queued playback, a
    /// half-typed command, a pending operator), then act as `<Esc>`.
    pub fn force_stop(&mut self, host: &mut dyn EditorHost, commands: &mut dyn CommandExecutor) {
        if self.mode == Mode::Disabled {
            return;
        }
        debug!("force stop in {}", self.mode);
        self.unwind();
        if let Mode::OperatorPending(_) = self.mode {
            self.mode = Mode::Normal;
        }
        self.change_keys.push(escape());
        self.dispatch(synthetic(ActionId::Escape), host, commands);
        self.settle();
    }

    /// Swap in a new configuration. Applied at once when idle, otherwise
    /// as soon as the sequence in flight completes.
    pub fn reload_config(&mut self, config: Arc<Config>) {
        if self.is_idle() {
            debug!("config reloaded");
            self.config = config;
        } else {
            debug!("config reload staged");
            self.staged = Some(config);
        }
    }

    /// The host undid a change by itself: restore the cursor to where the
    /// matching step began.
    pub fn on_host_undo(&mut self, host: &mut dyn EditorHost) {
        if let Some(pos) = self.history.follow_undo() {
            let pos = exec::clamp(host, pos, false);
            host.set_cursor(pos);
        }
    }

    /// The host redid a change by itself.
    pub fn on_host_redo(&mut self, host: &mut dyn EditorHost) {
        if let Some(pos) = self.history.follow_redo() {
            let pos = exec::clamp(host, pos, false);
            host.set_cursor(pos);
        }
    }

    // ── Pipeline ────────────────────────────────────────────────────

    fn disposition(&self) -> KeyDisposition {
        if self.mode == Mode::Disabled {
            KeyDisposition::PassThrough
        } else if self.resolver.is_pending() {
            KeyDisposition::Pending {
                deadline: self.resolver.deadline(),
            }
        } else if !self.recorded.is_empty() {
            KeyDisposition::Pending { deadline: None }
        } else {
            KeyDisposition::Consumed
        }
    }

    fn is_idle(&self) -> bool {
        self.queue.is_empty() && !self.resolver.is_pending() && self.recorded.is_empty()
    }

    /// Idle bookkeeping: mark the macro, apply a staged reload.
    fn settle(&mut self) {
        if !self.is_idle() {
            return;
        }
        self.recorder.mark();
        if let Some(config) = self.staged.take() {
            debug!("staged config applied");
            self.config = config;
        }
    }

    /// Drop everything in flight.
    fn unwind(&mut self) {
        self.queue.clear();
        self.resolver.clear();
        self.recorded.reset();
    }

    fn toggle(&mut self, host: &mut dyn EditorHost, commands: &mut dyn CommandExecutor) {
        if self.mode == Mode::Disabled {
            debug!("enabled");
            self.mode = Mode::Normal;
            return;
        }
        self.unwind();
        if let Mode::OperatorPending(_) = self.mode {
            self.mode = Mode::Normal;
        }
        // Leave prompts, insert and visual properly so history and
        // selections are settled.
        for _ in 0..3 {
            if self.mode == Mode::Normal {
                break;
            }
            self.dispatch(synthetic(ActionId::Escape), host, commands);
        }
        self.recorder.cancel();
        self.change_keys.clear();
        self.pending_change = false;
        self.mode = Mode::Disabled;
        debug!("disabled");
    }

    fn resolve(
        &mut self,
        resolution: Resolution,
        host: &mut dyn EditorHost,
        commands: &mut dyn CommandExecutor,
    ) {
        match resolution {
            Resolution::Pending => {}
            Resolution::Expanded(keys) => {
                debug!(
                    "remap expanded to {}",
                    format_keys(&keys.iter().map(|q| q.key.clone()).collect::<Vec<_>>())
                );
                self.push_front(keys);
            }
            Resolution::Unmapped { key, requeue } => {
                self.push_front(requeue);
                self.match_action(key, host, commands);
            }
            Resolution::DepthExceeded => self.fail(UserError::RecursiveMapping),
        }
    }

    fn match_action(
        &mut self,
        queued: QueuedKey,
        host: &mut dyn EditorHost,
        commands: &mut dyn CommandExecutor,
    ) {
        self.depth = queued.depth;
        self.change_keys.push(queued.key.clone());

        match self.recorded.push(queued.key, self.mode) {
            Pushed::Prefix => {}
            Pushed::BadRegister(name) => self.fail(UserError::InvalidRegister(name)),
            Pushed::Command => {
                let grammar = Arc::clone(&self.config.grammar);
                let lookup = grammar.resolve(
                    self.recorded.command(),
                    self.mode,
                    self.recorder.is_recording(),
                );
                match lookup {
                    Lookup::Prefix => {}
                    Lookup::NoMatch => {
                        debug!("no action for {:?} in {}", self.recorded, self.mode);
                        self.recorded.set_status(CommandStatus::Invalid);
                        self.recorded.clear();
                        if let Mode::OperatorPending(_) = self.mode {
                            self.mode = Mode::Normal;
                        }
                        self.track_change();
                    }
                    Lookup::Complete { action, operands } => {
                        let resolved = self.build(action, operands);
                        self.recorded.set_status(CommandStatus::Complete);
                        self.recorded.clear();
                        self.dispatch(resolved, host, commands);
                    }
                }
            }
        }
    }

    fn build(&self, action: ActionId, operands: Vec<KeyToken>) -> ResolvedAction {
        let completes = matches!(action, ActionId::Motion(_) | ActionId::TextObject(_));
        let (count, register, operator) = match self.mode {
            Mode::OperatorPending(PendingOperator {
                operator,
                count,
                register,
            }) => (
                multiply(count, self.recorded.count()),
                register,
                completes.then_some(operator),
            ),
            _ => (self.recorded.count(), self.recorded.register(), None),
        };
        ResolvedAction {
            action,
            operator,
            count,
            register,
            operands,
            keys: self.recorded.keys().to_vec(),
        }
    }

    /// Report `err` and drop the rest of the sequence.
    fn fail(&mut self, err: UserError) {
        debug!("{err}");
        self.unwind();
        self.recorded.set_status(CommandStatus::Invalid);
        if let Mode::OperatorPending(_) = self.mode {
            self.mode = Mode::Normal;
        }
        self.status = Some(Status::Error(err));
        self.track_change();
    }

    /// Dot-repeat bookkeeping at each resolution point.
    fn track_change(&mut self) {
        if self.mode != Mode::Normal || !self.recorded.is_empty() {
            return;
        }
        let keys = std::mem::take(&mut self.change_keys);
        if std::mem::take(&mut self.pending_change) {
            debug!("last change: {}", format_keys(&keys));
            self.last_change = Some(keys);
        }
    }

    fn exec<'a>(&'a mut self, host: &'a mut dyn EditorHost) -> Exec<'a> {
        Exec::new(host, &mut self.history, &self.shared, self.config.shift_width)
    }

    // ── Dispatch ────────────────────────────────────────────────────

    fn dispatch(
        &mut self,
        action: ResolvedAction,
        host: &mut dyn EditorHost,
        commands: &mut dyn CommandExecutor,
    ) {
        let ctx = Context {
            prompt_origin: self.prompt.as_ref().map(|p| p.origin),
            recording: self.recorder.is_recording(),
        };
        let Transition { next, effect } = machine::transition(self.mode, &action, ctx);
        debug!("{:?} in {} -> {:?}", action.action, self.mode, effect);
        self.resolved.push(action);

        if effect.starts_change() {
            self.pending_change = true;
        }
        let prev = self.mode;
        self.mode = next;
        if !matches!(effect, Effect::Undo(_) | Effect::Redo(_)) {
            self.history.begin(host.cursor());
        }

        if let Err(err) = self.apply(effect, prev, host, commands) {
            self.fail(err);
        }

        if !self.mode.is_typing() {
            if let Some(at) = self.history.commit(host.cursor()) {
                self.shared.push_change(self.id, at);
            }
        }
        if matches!(self.mode, Mode::Normal | Mode::OperatorPending(_)) {
            let cursor = host.cursor();
            let clamped = exec::clamp(host, cursor, false);
            let selections = host.selections();
            if selections.len() != 1 || selections.first() != Some(&Selection::caret(clamped)) {
                host.set_cursor(clamped);
            }
        }
        if prev != self.mode {
            debug!("mode {prev} -> {}", self.mode);
        }
        self.track_change();
    }

    #[allow(clippy::too_many_lines)]
    fn apply(
        &mut self,
        effect: Effect,
        prev: Mode,
        host: &mut dyn EditorHost,
        commands: &mut dyn CommandExecutor,
    ) -> Result<(), UserError> {
        match effect {
            Effect::Nothing | Effect::SwitchVisual(_) => {}
            Effect::Move {
                motion,
                count,
                operand,
            } => self.move_cursor(motion, count, operand, host, commands)?,
            Effect::Operate {
                operator,
                target,
                count,
                register,
                operand,
            } => self.operate(operator, target, count, register, operand, host, commands)?,
            Effect::SelectObject(object) => {
                let view = TextView::from_host(host);
                let cursor = host.cursor();
                if let Some(range) = text_object::select(&view, cursor, object) {
                    if !range.is_empty() {
                        let end = view
                            .pos_to_char_idx(range.end)
                            .and_then(|idx| view.char_idx_to_pos(idx.saturating_sub(1)))
                            .unwrap_or(range.end);
                        self.visual_anchor = range.start;
                        host.set_selections(vec![Selection::new(range.start, end)]);
                    }
                }
            }
            Effect::BeginInsert { entry, count } => self.begin_insert(entry, count, host)?,
            Effect::BeginReplace { count } => {
                self.insert = Some(InsertSession::new(None, count, true));
            }
            Effect::EndInsert => self.end_insert(host)?,
            Effect::BeginVisual(_) => {
                let cursor = host.cursor();
                self.visual_anchor = cursor;
                host.set_selections(vec![Selection::new(cursor, cursor)]);
            }
            Effect::EndVisual => {
                let cursor = host.cursor();
                host.set_cursor(cursor);
            }
            Effect::ReplaceChar { ch, count } => {
                if let Some(ch) = ch {
                    let cursor = host.cursor();
                    if let Some(pos) = self.exec(host).replace_char(cursor, ch, count)? {
                        host.set_cursor(pos);
                    }
                }
            }
            Effect::Type(ch) => {
                let cursor = host.cursor();
                let overwrite = self.mode == Mode::Replace;
                let (pos, replaced) = self.exec(host).type_char(cursor, ch, overwrite)?;
                host.set_cursor(pos);
                if let Some(session) = self.insert.as_mut() {
                    session.typed.push(ch);
                    if overwrite {
                        session.replaced.push(replaced);
                    }
                }
            }
            Effect::Newline => {
                let cursor = host.cursor();
                let pos = self.exec(host).newline(cursor)?;
                host.set_cursor(pos);
                if let Some(session) = self.insert.as_mut() {
                    session.typed.push('\n');
                }
            }
            Effect::Backspace => {
                let cursor = host.cursor();
                let pos = if self.mode == Mode::Replace {
                    if cursor.col == 0 {
                        cursor
                    } else {
                        let restore = self.insert.as_mut().and_then(|s| s.replaced.pop());
                        self.exec(host).unreplace(cursor, restore)?
                    }
                } else {
                    self.exec(host).backspace(cursor)?
                };
                host.set_cursor(pos);
                if let Some(session) = self.insert.as_mut() {
                    session.typed.pop();
                }
            }
            Effect::OpenPrompt(kind) => {
                let prefill = if kind == PromptKind::Ex && prev.is_visual() {
                    "'<,'>"
                } else {
                    ""
                };
                self.prompt = Some(PromptSession::new(kind, prev, host.cursor(), prefill));
            }
            Effect::PromptType(ch) => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.type_char(ch);
                }
            }
            Effect::PromptBackspace => {
                // Backspace on an empty line closes the prompt.
                let open = self.prompt.as_mut().is_some_and(PromptSession::backspace);
                if !open {
                    if let Some(prompt) = self.prompt.take() {
                        self.mode = prompt.origin;
                    }
                }
            }
            Effect::PromptHistory { older } => {
                if let Some(prompt) = self.prompt.as_mut() {
                    let lines = self.shared.lines(prompt.kind);
                    if older {
                        prompt.older(&lines);
                    } else {
                        prompt.newer(&lines);
                    }
                }
            }
            Effect::SubmitPrompt => self.submit_prompt(prev, host, commands)?,
            Effect::CancelPrompt => self.prompt = None,
            Effect::Undo(count) => {
                for _ in 0..count {
                    let pos = self.history.undo(host)?;
                    let pos = exec::clamp(host, pos, false);
                    host.set_cursor(pos);
                }
            }
            Effect::Redo(count) => {
                for _ in 0..count {
                    let pos = self.history.redo(host)?;
                    let pos = exec::clamp(host, pos, false);
                    host.set_cursor(pos);
                }
            }
            Effect::Paste {
                before,
                count,
                register,
                over,
            } => self.paste(before, count, register, over, host)?,
            Effect::RepeatChange(count) => self.repeat_change(count)?,
            Effect::SetMark(name) => {
                if let Some(name) = name.filter(char::is_ascii_alphabetic) {
                    self.history.set_mark(name, host.cursor());
                }
            }
            Effect::StartRecording(Some(register)) => {
                self.recorder.start(register)?;
                self.status = Some(Status::Message(format!("recording @{register}")));
            }
            Effect::StartRecording(None) => {}
            Effect::StopRecording => {
                if let Some((register, keys)) = self.recorder.stop() {
                    self.shared.record_macro(register, keys);
                }
                self.status = None;
            }
            Effect::PlayMacro { register, count } => self.play_macro(register, count)?,
            Effect::Changelist { older, count } => {
                let mut target = None;
                for _ in 0..count {
                    let next = if older {
                        self.shared.change_older(self.id)
                    } else {
                        self.shared.change_newer(self.id)
                    };
                    match next {
                        Some(pos) => target = Some(pos),
                        None => break,
                    }
                }
                let pos = target.ok_or(if older {
                    UserError::ChangelistStart
                } else {
                    UserError::ChangelistEnd
                })?;
                let pos = exec::clamp(host, pos, false);
                host.set_cursor(pos);
            }
            Effect::Jumplist { older, count } => {
                let mut pos = host.cursor();
                for _ in 0..count {
                    pos = if older {
                        self.history.jump_older(pos)?
                    } else {
                        self.history.jump_newer()?
                    };
                }
                let pos = exec::clamp(host, pos, false);
                host.set_cursor(pos);
            }
        }
        Ok(())
    }

    // ── Motions ─────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn motion_target(
        &mut self,
        motion: Motion,
        count: Option<usize>,
        operand: Option<char>,
        from: Position,
        past_end: bool,
        host: &mut dyn EditorHost,
        commands: &mut dyn CommandExecutor,
    ) -> Result<Option<(Motion, Position)>, UserError> {
        let (motion, operand) = match motion {
            Motion::RepeatFind | Motion::RepeatFindReverse => {
                let Some((kind, ch)) = self.last_find else {
                    return Ok(None);
                };
                let kind = if motion == Motion::RepeatFind {
                    kind
                } else {
                    kind.opposite()
                };
                (Motion::FindChar(kind), Some(ch))
            }
            Motion::FindChar(kind) => {
                if let Some(ch) = operand {
                    self.last_find = Some((kind, ch));
                }
                (motion, operand)
            }
            Motion::GotoMark { exact } => {
                let Some(name) = operand else {
                    return Ok(None);
                };
                let pos = self.history.mark(name)?;
                let pos = if exact {
                    pos
                } else {
                    Position::new(pos.line, exec::first_non_blank(host, pos.line))
                };
                return Ok(Some((motion, pos)));
            }
            Motion::SearchNext | Motion::SearchPrev => {
                let reverse = motion == Motion::SearchPrev;
                let pos = self.search_again(reverse, count, host, commands)?;
                return Ok(Some((motion, pos)));
            }
            other => (other, operand),
        };
        let view = TextView::from_host(host);
        Ok(motion::target(&view, from, motion, count, operand, past_end).map(|pos| (motion, pos)))
    }

    /// `n` / `N`: run the last search again through the executor and report
    /// where it landed. The host cursor is left where it was.
    fn search_again(
        &self,
        reverse: bool,
        count: Option<usize>,
        host: &mut dyn EditorHost,
        commands: &mut dyn CommandExecutor,
    ) -> Result<Position, UserError> {
        let last = self.shared.last_search().ok_or(UserError::NoPreviousSearch)?;
        let last = if reverse { last.reversed() } else { last };
        let saved = host.selections();
        for _ in 0..count.unwrap_or(1).max(1) {
            let request = CommandRequest {
                kind: PromptKind::Search(last.direction),
                text: last.pattern.clone(),
                origin: self.mode,
                selections: host.selections(),
            };
            if let Err(err) = commands.run(&request, host) {
                host.set_selections(saved);
                return Err(err.into());
            }
        }
        let landed = host.cursor();
        host.set_selections(saved);
        Ok(landed)
    }

    fn move_cursor(
        &mut self,
        motion: Motion,
        count: Option<usize>,
        operand: Option<char>,
        host: &mut dyn EditorHost,
        commands: &mut dyn CommandExecutor,
    ) -> Result<(), UserError> {
        let from = host.cursor();
        let past_end = self.mode.is_typing();
        let Some((motion, to)) =
            self.motion_target(motion, count, operand, from, past_end, host, commands)?
        else {
            return Ok(());
        };
        if motion.is_jump() {
            self.history.push_jump(from);
        }
        if let Some(session) = self.insert.as_mut() {
            // Moving breaks the insert: a count no longer repeats it.
            session.count = 1;
            session.typed.clear();
        }
        let to = exec::clamp(host, to, past_end);
        if self.mode.is_visual() {
            host.set_selections(vec![Selection::new(self.visual_anchor, to)]);
        } else {
            host.set_cursor(to);
        }
        Ok(())
    }

    // ── Operators ───────────────────────────────────────────────────

    /// The operator has nothing to act on: back to Normal, no change.
    fn abandon(&mut self) {
        self.mode = Mode::Normal;
        self.pending_change = false;
        self.insert = None;
    }

    #[allow(clippy::too_many_arguments)]
    fn operate(
        &mut self,
        operator: Operator,
        target: Target,
        count: Option<usize>,
        register: Option<char>,
        operand: Option<char>,
        host: &mut dyn EditorHost,
        commands: &mut dyn CommandExecutor,
    ) -> Result<(), UserError> {
        let from = host.cursor();
        let view = TextView::from_host(host);
        let span = match target {
            Target::Selection(kind) => {
                exec::selection_span(&view, Selection::new(self.visual_anchor, from), kind)
            }
            Target::Object(object) => match text_object::select(&view, from, object) {
                Some(range) => Span::Chars(range),
                None => {
                    self.abandon();
                    return Ok(());
                }
            },
            Target::Motion(motion) => {
                let change_word = operator == Operator::Change
                    && matches!(motion, Motion::WordForward | Motion::BigWordForward)
                    && exec::on_word(&view, from);
                let landed = if change_word {
                    let big = motion == Motion::BigWordForward;
                    let end = exec::change_word_target(&view, from, count.unwrap_or(1), big);
                    Some((if big { Motion::BigWordEnd } else { Motion::WordEnd }, end))
                } else {
                    let past_end = !motion.is_inclusive();
                    self.motion_target(motion, count, operand, from, past_end, host, commands)?
                };
                let Some((motion, to)) = landed else {
                    self.abandon();
                    return Ok(());
                };
                exec::motion_span(&view, from, to, motion)
            }
        };

        let cursor = self.exec(host).operate(&view, from, operator, span, register)?;
        let past_end = operator == Operator::Change;
        let cursor = exec::clamp(host, cursor, past_end);
        host.set_cursor(cursor);
        if operator == Operator::Change {
            self.insert = Some(InsertSession::new(None, 1, false));
        }
        Ok(())
    }

    fn paste(
        &mut self,
        before: bool,
        count: usize,
        register: Option<char>,
        over: Option<VisualKind>,
        host: &mut dyn EditorHost,
    ) -> Result<(), UserError> {
        let cursor = host.cursor();
        let Some(kind) = over else {
            let pos = self.exec(host).paste(cursor, register, before, count)?;
            host.set_cursor(pos);
            return Ok(());
        };

        // Replace the selection: read the register before the delete
        // overwrites the unnamed one.
        let reg = self.shared.register(register);
        if reg.is_empty() {
            return Err(UserError::EmptyRegister(register.unwrap_or('"')));
        }
        let (text, text_kind) = reg.text();
        let view = TextView::from_host(host);
        let span = exec::selection_span(&view, Selection::new(self.visual_anchor, cursor), kind);
        let at = self.exec(host).operate(&view, cursor, Operator::Delete, span, None)?;
        let pos = match span {
            Span::Lines { first, .. } => {
                let body = if text_kind == RegisterKind::Line {
                    text
                } else {
                    format!("{text}\n")
                };
                let lines = host.line_count();
                if first >= lines {
                    let last = Position::new(lines.saturating_sub(1), 0);
                    self.exec(host).put(last, &body, RegisterKind::Line, false, count)?
                } else {
                    let at = Position::new(first, 0);
                    self.exec(host).put(at, &body, RegisterKind::Line, true, count)?
                }
            }
            _ => self.exec(host).put(at, &text, text_kind, true, count)?,
        };
        host.set_cursor(pos);
        Ok(())
    }

    // ── Insert ──────────────────────────────────────────────────────

    fn begin_insert(
        &mut self,
        entry: InsertEntry,
        count: usize,
        host: &mut dyn EditorHost,
    ) -> Result<(), UserError> {
        let cursor = host.cursor();
        let len = host.line_len(cursor.line);
        let pos = match entry {
            InsertEntry::Before => cursor,
            InsertEntry::After => Position::new(cursor.line, (cursor.col + 1).min(len)),
            InsertEntry::FirstNonBlank => {
                Position::new(cursor.line, exec::first_non_blank(host, cursor.line))
            }
            InsertEntry::LineEnd => Position::new(cursor.line, len),
            InsertEntry::OpenBelow => self.exec(host).open_line(cursor, true)?,
            InsertEntry::OpenAbove => self.exec(host).open_line(cursor, false)?,
        };
        host.set_cursor(pos);
        self.insert = Some(InsertSession::new(Some(entry), count, false));
        Ok(())
    }

    /// `<Esc>` from Insert or Replace: repeat the typed text for a count,
    /// then step back onto the last character.
    fn end_insert(&mut self, host: &mut dyn EditorHost) -> Result<(), UserError> {
        if let Some(session) = self.insert.take() {
            if session.count > 1 && !session.typed.is_empty() {
                let open = matches!(
                    session.entry,
                    Some(InsertEntry::OpenBelow | InsertEntry::OpenAbove)
                );
                for _ in 1..session.count {
                    if open {
                        let cursor = host.cursor();
                        let pos = self.exec(host).open_line(cursor, true)?;
                        host.set_cursor(pos);
                    }
                    for ch in session.typed.chars() {
                        let cursor = host.cursor();
                        let pos = if ch == '\n' {
                            self.exec(host).newline(cursor)?
                        } else {
                            self.exec(host).type_char(cursor, ch, session.overwrite)?.0
                        };
                        host.set_cursor(pos);
                    }
                }
            }
        }
        let cursor = host.cursor();
        host.set_cursor(Position::new(cursor.line, cursor.col.saturating_sub(1)));
        Ok(())
    }

    // ── Prompts ─────────────────────────────────────────────────────

    fn submit_prompt(
        &mut self,
        prev: Mode,
        host: &mut dyn EditorHost,
        commands: &mut dyn CommandExecutor,
    ) -> Result<(), UserError> {
        let Some(session) = self.prompt.take() else {
            return Ok(());
        };
        let text = session.line.text().to_string();
        self.shared.push_line(session.kind, &text);

        let text = match session.kind {
            PromptKind::Ex if text.is_empty() => return Ok(()),
            PromptKind::Ex => text,
            PromptKind::Search(direction) => {
                let pattern = if text.is_empty() {
                    self.shared
                        .last_search()
                        .map(|s| s.pattern)
                        .ok_or(UserError::NoPreviousSearch)?
                } else {
                    text
                };
                self.shared.push_search(SearchState {
                    direction,
                    anchor: session.anchor,
                    pattern: pattern.clone(),
                    origin: session.origin,
                });
                pattern
            }
        };

        let request = CommandRequest {
            kind: session.kind,
            text,
            origin: session.origin,
            selections: host.selections(),
        };
        match commands.run(&request, host) {
            Ok(CommandOutcome::Completed(message)) => {
                if let PromptKind::Search(_) = session.kind {
                    self.history.push_jump(session.anchor);
                }
                self.status = message.map(Status::Message);
                Ok(())
            }
            Ok(CommandOutcome::Continue) => {
                self.mode = prev;
                self.prompt = Some(session);
                Ok(())
            }
            Err(err) => {
                warn!("{}{} failed: {err}", session.kind.leader(), request.text);
                Err(err.into())
            }
        }
    }

    // ── Repeat and macros ───────────────────────────────────────────

    fn repeat_change(&mut self, count: Option<usize>) -> Result<(), UserError> {
        let keys = self.last_change.clone().ok_or(UserError::NothingToRepeat)?;
        let keys = match count {
            Some(n) => with_count(&keys, n),
            None => keys,
        };
        debug!("repeat {}", format_keys(&keys));
        let depth = self.depth;
        self.push_front(keys.into_iter().map(|key| QueuedKey::new(key, false, depth)).collect());
        Ok(())
    }

    fn play_macro(&mut self, register: Option<char>, count: usize) -> Result<(), UserError> {
        let name = match register {
            Some('@') => self.shared.last_macro().ok_or(UserError::NoPreviousMacro)?,
            Some(name) if name.is_ascii_alphabetic() => name.to_ascii_lowercase(),
            Some(name) => return Err(UserError::InvalidRegister(name)),
            None => return Ok(()),
        };
        let reg = self.shared.register(Some(name));
        let playback = macros::playback(
            name,
            &reg,
            count,
            self.depth + 1,
            self.config.max_recursion_depth,
        )?;
        self.shared.set_last_macro(name);
        self.queue.push_front(Queued::Replay(playback));
        Ok(())
    }

    /// Put `keys` ahead of everything queued, in order.
    fn push_front(&mut self, keys: Vec<QueuedKey>) {
        for key in keys.into_iter().rev() {
            self.queue.push_front(Queued::Key(key));
        }
    }
}

impl fmt::Debug for VimEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VimEngine")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("recorded", &self.recorded)
            .field("queued", &self.queue.len())
            .field("recording", &self.recorder.register())
            .finish_non_exhaustive()
    }
}

fn escape() -> KeyToken {
    KeyToken::from(KeyCode::Escape)
}

fn synthetic(action: ActionId) -> ResolvedAction {
    ResolvedAction {
        action,
        operator: None,
        count: None,
        register: None,
        operands: Vec::new(),
        keys: vec![escape()],
    }
}

/// `2d3w` counts 6.
fn multiply(outer: Option<usize>, inner: Option<usize>) -> Option<usize> {
    match (outer, inner) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(1).saturating_mul(b.unwrap_or(1))),
    }
}

/// Replace the count of a recorded change: `"a3x` and `2"a3x` with 5 both
/// become `"a5x`.
fn with_count(keys: &[KeyToken], count: usize) -> Vec<KeyToken> {
    fn skip_digits(keys: &[KeyToken]) -> &[KeyToken] {
        let digits = keys.iter().take_while(|k| k.digit().is_some()).count();
        &keys[digits..]
    }

    let mut out = Vec::with_capacity(keys.len() + 2);
    let mut rest = skip_digits(keys);
    if rest.len() >= 2 && rest[0].as_char() == Some('"') {
        out.extend_from_slice(&rest[..2]);
        rest = skip_digits(&rest[2..]);
    }
    out.extend(count.to_string().chars().map(KeyToken::from_char));
    out.extend_from_slice(rest);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use vimkey_input::parse_keys;

    use crate::memory::{MemoryCommands, MemoryEditor};

    struct Harness {
        engine: VimEngine,
        ed: MemoryEditor,
        cmds: MemoryCommands,
    }

    impl Harness {
        fn new(text: &str) -> Self {
            Self::with_config(text, Config::builtin().unwrap())
        }

        fn with_config(text: &str, config: Config) -> Self {
            Self::shared(text, config, SharedState::new(), 1)
        }

        fn shared(text: &str, config: Config, shared: SharedState, id: u64) -> Self {
            Self {
                engine: VimEngine::new(EditorId(id), Arc::new(config), shared),
                ed: MemoryEditor::from_text(text),
                cmds: MemoryCommands::new(),
            }
        }

        fn remapped(text: &str, toml: &str) -> Self {
            Self::with_config(text, Config::from_toml(toml).unwrap())
        }

        fn keys(&mut self, s: &str) -> KeyDisposition {
            let mut last = KeyDisposition::Consumed;
            if s.is_empty() {
                return last;
            }
            for key in parse_keys(s).unwrap() {
                last = self.engine.feed(key, &mut self.ed, &mut self.cmds);
            }
            last
        }

        fn flush(&mut self) -> KeyDisposition {
            self.engine.flush(&mut self.ed, &mut self.cmds)
        }

        fn text(&self) -> String {
            self.ed.text()
        }

        fn cursor(&self) -> Position {
            self.ed.cursor()
        }

        fn actions(&mut self) -> Vec<ActionId> {
            self.engine
                .drain_resolved()
                .into_iter()
                .map(|a| a.action)
                .collect()
        }

        fn error(&self) -> Option<UserError> {
            match self.engine.status() {
                Some(Status::Error(err)) => Some(err.clone()),
                _ => None,
            }
        }
    }

    fn p(line: usize, col: usize) -> Position {
        Position::new(line, col)
    }

    const JJ: &str = r#"
        [[insert_remaps]]
        before = "jj"
        after = "<Esc>"
    "#;

    // -- Counts and operators ------------------------------------------------

    #[test]
    fn count_operator_motion() {
        let mut h = Harness::new("one two three four");
        h.keys("2dw");
        assert_eq!(h.text(), "three four");
        let last = h.engine.drain_resolved().pop().unwrap();
        assert_eq!(last.action, ActionId::Motion(Motion::WordForward));
        assert_eq!(last.operator, Some(Operator::Delete));
        assert_eq!(last.count, Some(2));
        assert_eq!(h.engine.mode(), Mode::Normal);
    }

    #[test]
    fn counts_multiply() {
        let mut h = Harness::new("a b c d e f g h");
        h.keys("2d3w");
        assert_eq!(h.text(), "g h");
    }

    #[test]
    fn zero_is_a_motion_unless_it_extends_a_count() {
        let mut h = Harness::new("abcdef");
        h.keys("$0");
        assert_eq!(h.cursor(), p(0, 0));
        let mut h = Harness::new(&"x".repeat(60));
        h.keys("50l");
        assert_eq!(h.cursor(), p(0, 50));
    }

    #[test]
    fn dd_and_count() {
        let mut h = Harness::new("1\n2\n3\n4");
        h.keys("j2dd");
        assert_eq!(h.text(), "1\n4");
        assert_eq!(h.cursor(), p(1, 0));
        h.keys("P");
        assert_eq!(h.text(), "1\n2\n3\n4");
    }

    #[test]
    fn change_word_enters_insert() {
        let mut h = Harness::new("foo bar");
        h.keys("cwbaz<Esc>");
        assert_eq!(h.text(), "baz bar");
        assert_eq!(h.engine.mode(), Mode::Normal);
        assert_eq!(h.cursor(), p(0, 2));
    }

    #[test]
    fn text_object_delete() {
        let mut h = Harness::new("call(a, b)");
        h.keys("f(di(");
        assert_eq!(h.text(), "call()");
    }

    #[test]
    fn failed_find_cancels_operator() {
        let mut h = Harness::new("abc");
        h.keys("dfz");
        assert_eq!(h.text(), "abc");
        assert_eq!(h.engine.mode(), Mode::Normal);
        h.keys("cfz");
        assert_eq!(h.engine.mode(), Mode::Normal);
    }

    #[test]
    fn repeat_find() {
        let mut h = Harness::new("a,b,c,d");
        h.keys("f,;;");
        assert_eq!(h.cursor(), p(0, 5));
        h.keys(",");
        assert_eq!(h.cursor(), p(0, 3));
    }

    // -- Prefix waits --------------------------------------------------------

    #[test]
    fn g_waits_then_gg_completes() {
        let mut h = Harness::new("a\nb\nc");
        h.keys("G");
        assert_eq!(h.cursor(), p(2, 0));
        assert_eq!(h.keys("g"), KeyDisposition::Pending { deadline: None });
        assert_eq!(h.engine.recorded().status(), CommandStatus::Ambiguous);
        assert_eq!(h.keys("g"), KeyDisposition::Consumed);
        assert_eq!(h.cursor(), p(0, 0));
        assert_eq!(h.engine.recorded().status(), CommandStatus::Complete);
    }

    #[test]
    fn builtin_prefixes_wait_without_deadline() {
        let mut h = Harness::remapped("one two three", "timeout_ms = 1");
        assert_eq!(h.keys("\"a2d"), KeyDisposition::Pending { deadline: None });
        assert_eq!(h.engine.deadline(), None);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(h.flush(), KeyDisposition::Pending { deadline: None });
        h.keys("w");
        assert_eq!(h.text(), "three");
        assert_eq!(h.engine.shared().register(Some('a')).text().0, "one two ");
    }

    #[test]
    fn unknown_sequence_is_discarded() {
        let mut h = Harness::new("abc");
        assert_eq!(h.keys("gQ"), KeyDisposition::Consumed);
        assert_eq!(h.engine.recorded().status(), CommandStatus::Invalid);
        assert_eq!(h.engine.mode(), Mode::Normal);
        assert_eq!(h.text(), "abc");
    }

    #[test]
    fn bad_register_is_reported() {
        let mut h = Harness::new("abc");
        h.keys("\"%");
        assert_eq!(h.error(), Some(UserError::InvalidRegister('%')));
        assert!(h.engine.recorded().is_empty());
        assert_eq!(h.text(), "abc");
    }

    // -- Remaps --------------------------------------------------------------

    #[test]
    fn jj_within_timeout_escapes() {
        let mut h = Harness::remapped("", JJ);
        h.keys("ihi");
        let disposition = h.keys("j");
        assert!(matches!(
            disposition,
            KeyDisposition::Pending { deadline: Some(_) }
        ));
        assert_eq!(h.text(), "hi");
        h.keys("j");
        assert_eq!(h.engine.mode(), Mode::Normal);
        assert_eq!(h.text(), "hi");
    }

    #[test]
    fn lone_j_types_after_timeout() {
        let mut h = Harness::remapped("", JJ);
        h.keys("ij");
        assert_eq!(h.text(), "");
        assert_eq!(h.flush(), KeyDisposition::Consumed);
        assert_eq!(h.text(), "j");
        assert_eq!(h.engine.mode(), Mode::Insert);
    }

    #[test]
    fn key_after_expired_deadline_does_not_complete_remap() {
        let mut h = Harness::remapped("", &format!("timeout_ms = 1\n{JJ}"));
        h.keys("ij");
        std::thread::sleep(Duration::from_millis(30));
        h.keys("j");
        assert_eq!(h.engine.mode(), Mode::Insert);
        assert!(matches!(
            h.engine.disposition(),
            KeyDisposition::Pending { deadline: Some(_) }
        ));
        h.flush();
        assert_eq!(h.text(), "jj");
        assert_eq!(h.engine.mode(), Mode::Insert);
    }

    #[test]
    fn j_then_other_key_types_both() {
        let mut h = Harness::remapped("", JJ);
        h.keys("ijk");
        assert_eq!(h.text(), "jk");
        assert_eq!(h.engine.mode(), Mode::Insert);
    }

    #[test]
    fn remap_is_transparent() {
        let mut mapped = Harness::remapped("", JJ);
        mapped.keys("iab");
        mapped.actions();
        mapped.keys("jj");
        let mut plain = Harness::new("");
        plain.keys("iab");
        plain.actions();
        plain.keys("<Esc>");
        assert_eq!(mapped.actions(), plain.actions());
        assert_eq!(mapped.text(), plain.text());
        assert_eq!(mapped.cursor(), plain.cursor());
    }

    #[test]
    fn normal_remap_with_count() {
        let mut h = Harness::remapped(
            "a\nb\nc\nd",
            r#"
            [[normal_remaps]]
            before = "<Space>j"
            after = "j"
            "#,
        );
        h.keys("2<Space>j");
        assert_eq!(h.cursor(), p(2, 0));
    }

    #[test]
    fn recursion_depth_is_bounded() {
        let mut h = Harness::remapped(
            "abc",
            r#"
            max_recursion_depth = 5

            [[normal_remaps]]
            before = "a"
            after = "b"

            [[normal_remaps]]
            before = "b"
            after = "a"
            "#,
        );
        h.keys("a");
        assert_eq!(h.error(), Some(UserError::RecursiveMapping));
        assert_eq!(h.engine.mode(), Mode::Normal);
        assert!(h.engine.is_idle());
    }

    // -- Cancel --------------------------------------------------------------

    #[test]
    fn escape_always_lands_in_normal() {
        for setup in ["", "i", "v", "V", "d", "2d", "\"a", "R", "g", "f"] {
            let mut h = Harness::new("text");
            h.keys(setup);
            h.keys("<Esc>");
            assert_eq!(h.engine.mode(), Mode::Normal, "after {setup:?}");
            assert!(h.engine.recorded().is_empty(), "after {setup:?}");
        }
    }

    #[test]
    fn escape_from_prompt_returns_to_origin() {
        let mut h = Harness::new("text");
        h.keys("v:");
        assert_eq!(h.engine.mode(), Mode::CommandLine);
        assert_eq!(h.engine.prompt().map(PromptSession::display).as_deref(), Some(":'<,'>"));
        h.keys("<Esc>");
        assert_eq!(h.engine.mode(), Mode::Visual(VisualKind::Char));
    }

    #[test]
    fn force_stop_drops_held_remap_keys() {
        let mut h = Harness::remapped("", JJ);
        h.keys("ij");
        h.keys("<Esc>");
        assert_eq!(h.engine.mode(), Mode::Normal);
        assert_eq!(h.text(), "");
        assert_eq!(h.engine.deadline(), None);
    }

    #[test]
    fn force_stop_aborts_queued_playback() {
        let mut h = Harness::new("abc");
        h.engine.enqueue(&parse_keys("x").unwrap());
        h.keys("<Esc>");
        assert!(!h.engine.step(&mut h.ed, &mut h.cmds));
        assert_eq!(h.text(), "abc");
    }

    // -- Insert --------------------------------------------------------------

    #[test]
    fn insert_count_repeats_text() {
        let mut h = Harness::new("");
        h.keys("3iab<Esc>");
        assert_eq!(h.text(), "ababab");
        assert_eq!(h.cursor(), p(0, 5));
    }

    #[test]
    fn open_line_with_count() {
        let mut h = Harness::new("top");
        h.keys("2ox<Esc>");
        assert_eq!(h.text(), "top\nx\nx");
        assert_eq!(h.cursor(), p(2, 0));
    }

    #[test]
    fn append_and_backspace() {
        let mut h = Harness::new("ab");
        h.keys("Acd<BS>e<Esc>");
        assert_eq!(h.text(), "abce");
        h.keys("0ix<CR>y<Esc>");
        assert_eq!(h.text(), "x\nyabce");
    }

    #[test]
    fn replace_mode_restores_on_backspace() {
        let mut h = Harness::new("abc");
        h.keys("Rxyzw<BS><BS><Esc>");
        assert_eq!(h.text(), "xyc");
        assert_eq!(h.engine.mode(), Mode::Normal);
    }

    #[test]
    fn replace_char_with_count() {
        let mut h = Harness::new("abcd");
        h.keys("3rx");
        assert_eq!(h.text(), "xxxd");
        assert_eq!(h.cursor(), p(0, 2));
    }

    // -- Undo ----------------------------------------------------------------

    #[test]
    fn undo_restores_cursor_before_change() {
        let mut h = Harness::new("one two three");
        h.keys("wdw$");
        assert_eq!(h.text(), "one three");
        h.keys("u");
        assert_eq!(h.text(), "one two three");
        assert_eq!(h.cursor(), p(0, 4));
        h.keys("<C-r>");
        assert_eq!(h.text(), "one three");
    }

    #[test]
    fn insert_session_undoes_as_one_step() {
        let mut h = Harness::new("x");
        h.keys("ihello<Esc>u");
        assert_eq!(h.text(), "x");
        h.keys("u");
        assert_eq!(h.error(), Some(UserError::AlreadyOldest));
    }

    #[test]
    fn host_undo_restores_cursor() {
        let mut h = Harness::new("abc");
        h.keys("$x");
        assert_eq!(h.cursor(), p(0, 1));
        h.ed.undo();
        h.engine.on_host_undo(&mut h.ed);
        assert_eq!(h.cursor(), p(0, 2));
    }

    // -- Visual --------------------------------------------------------------

    #[test]
    fn visual_delete_and_yank() {
        let mut h = Harness::new("hello world");
        h.keys("vlld");
        assert_eq!(h.text(), "lo world");
        h.keys("Vy");
        assert_eq!(h.engine.shared().register(None).text().0, "lo world\n");
        assert_eq!(h.engine.mode(), Mode::Normal);
    }

    #[test]
    fn visual_block_change_case() {
        let mut h = Harness::new("abc\ndef");
        h.keys("<C-v>jlU");
        assert_eq!(h.text(), "ABc\nDEf");
    }

    #[test]
    fn visual_paste_replaces_selection() {
        let mut h = Harness::new("foo bar");
        h.keys("yiwwviwp");
        assert_eq!(h.text(), "foo foo");
    }

    #[test]
    fn visual_inner_word_selects() {
        let mut h = Harness::new("foo bar");
        h.keys("wviw");
        assert_eq!(h.ed.selections(), vec![Selection::new(p(0, 4), p(0, 6))]);
    }

    // -- Registers and paste -------------------------------------------------

    #[test]
    fn named_register_round_trip() {
        let mut h = Harness::new("one\ntwo");
        h.keys("\"ayyj\"ap");
        assert_eq!(h.text(), "one\ntwo\none");
        h.keys("\"zp");
        assert_eq!(h.error(), Some(UserError::EmptyRegister('z')));
    }

    #[test]
    fn counts_around_register_multiply() {
        let mut h = Harness::new("a b c d e f g h i j");
        h.keys("2\"a3dw");
        assert_eq!(h.text(), "g h i j");
    }

    #[test]
    fn registers_shared_between_engines() {
        let shared = SharedState::new();
        let config = Config::builtin().unwrap();
        let mut a = Harness::shared("alpha", config.clone(), shared.clone(), 1);
        let mut b = Harness::shared("beta", config, shared, 2);
        a.keys("yiw");
        b.keys("P");
        assert_eq!(b.text(), "alphabeta");
    }

    // -- Dot repeat ----------------------------------------------------------

    #[test]
    fn dot_repeats_last_change() {
        let mut h = Harness::new("a b c d e");
        h.keys("dw.");
        assert_eq!(h.text(), "c d e");
        h.keys("j.");
        assert_eq!(h.text(), "d e");
    }

    #[test]
    fn dot_repeats_insert() {
        let mut h = Harness::new("x");
        h.keys("A!<Esc>.");
        assert_eq!(h.text(), "x!!");
    }

    #[test]
    fn dot_count_replaces_original() {
        let mut h = Harness::new("abcdefgh");
        h.keys("2x3.");
        assert_eq!(h.text(), "fgh");
    }

    #[test]
    fn dot_without_change() {
        let mut h = Harness::new("abc");
        h.keys("w.");
        assert_eq!(h.error(), Some(UserError::NothingToRepeat));
    }

    #[test]
    fn with_count_keeps_register() {
        let keys = parse_keys("\"a12dw").unwrap();
        assert_eq!(format_keys(&with_count(&keys, 3)), "\"a3dw");
        assert_eq!(format_keys(&with_count(&parse_keys("x").unwrap(), 4)), "4x");
        let keys = parse_keys("2\"a3dw").unwrap();
        assert_eq!(format_keys(&with_count(&keys, 5)), "\"a5dw");
    }

    // -- Macros --------------------------------------------------------------

    #[test]
    fn macro_equals_typed_keys() {
        let mut recorded = Harness::new("a b c d e f g");
        recorded.keys("qqdwq");
        assert_eq!(recorded.engine.recording(), None);
        assert_eq!(
            recorded.engine.shared().register(Some('q')).keys(),
            parse_keys("dw").unwrap()
        );
        recorded.keys("3@q");

        let mut typed = Harness::new("a b c d e f g");
        typed.keys("dwdwdwdw");
        assert_eq!(recorded.text(), typed.text());
    }

    #[test]
    fn at_at_replays_last_macro() {
        let mut h = Harness::new("abcdef");
        h.keys("@@");
        assert_eq!(h.error(), Some(UserError::NoPreviousMacro));
        h.keys("qaxq@a@@");
        assert_eq!(h.text(), "def");
    }

    #[test]
    fn macro_through_remap() {
        let mut h = Harness::remapped("", JJ);
        h.keys("qwihijjq");
        h.keys("@w");
        assert_eq!(h.text(), "hhii");
        assert_eq!(h.engine.mode(), Mode::Normal);
    }

    #[test]
    fn huge_macro_count_plays_lazily() {
        let mut h = Harness::new("abcdefghij");
        h.engine.shared().record_macro('a', parse_keys("x").unwrap());
        h.engine.enqueue(&parse_keys("999999999@a").unwrap());
        let mut steps = 0;
        while h.text().len() > 7 {
            assert!(h.engine.step(&mut h.ed, &mut h.cmds));
            steps += 1;
            assert!(steps < 100);
        }
        assert!(h.engine.queue.len() <= 2);
        h.keys("<Esc>");
        assert!(!h.engine.step(&mut h.ed, &mut h.cmds));
        assert_eq!(h.text(), "defghij");
    }

    #[test]
    fn self_playing_macro_hits_the_limit() {
        let mut h = Harness::remapped(&"x".repeat(50), "max_recursion_depth = 20");
        h.keys("qaxq");
        h.engine.shared().record_macro('a', parse_keys("x@a").unwrap());
        h.keys("@a");
        assert_eq!(h.error(), Some(UserError::RecursiveMapping));
        assert!(h.engine.is_idle());
    }

    #[test]
    fn record_into_non_letter() {
        let mut h = Harness::new("abc");
        h.keys("q1");
        assert_eq!(h.error(), Some(UserError::InvalidRegister('1')));
        assert_eq!(h.engine.recording(), None);
    }

    // -- Search and prompts --------------------------------------------------

    #[test]
    fn search_then_n() {
        let mut h = Harness::new("foo x foo y foo");
        h.keys("/foo<CR>");
        assert_eq!(h.cursor(), p(0, 6));
        h.keys("n");
        assert_eq!(h.cursor(), p(0, 12));
        h.keys("N");
        assert_eq!(h.cursor(), p(0, 6));
        let forward = PromptKind::Search(crate::search::SearchDirection::Forward);
        assert_eq!(h.engine.shared().lines(forward), vec!["foo".to_string()]);
    }

    #[test]
    fn jumps_walk_back() {
        let mut h = Harness::new("a\nb\nc");
        h.keys("G<C-o>");
        assert_eq!(h.cursor(), p(0, 0));
        h.keys("<C-i>");
        assert_eq!(h.cursor(), p(2, 0));
        h.keys("<C-i>");
        assert_eq!(h.error(), Some(UserError::JumplistEnd));
    }

    #[test]
    fn n_without_search() {
        let mut h = Harness::new("abc");
        h.keys("n");
        assert_eq!(h.error(), Some(UserError::NoPreviousSearch));
    }

    #[test]
    fn search_under_operator() {
        let mut h = Harness::new("abc def ghi");
        h.keys("/gh<CR>0dn");
        assert_eq!(h.text(), "ghi");
    }

    #[test]
    fn failed_command_reports_and_returns() {
        let mut h = Harness::new("abc");
        h.keys(":frobnicate<CR>");
        assert_eq!(h.engine.mode(), Mode::Normal);
        assert!(matches!(h.error(), Some(UserError::Command(_))));
        h.keys(":2<CR>");
        assert_eq!(h.cursor(), p(0, 0));
        assert_eq!(h.cmds.requests.len(), 2);
    }

    #[test]
    fn prompt_backspace_past_start_cancels() {
        let mut h = Harness::new("abc");
        h.keys(":a<BS><BS>");
        assert_eq!(h.engine.mode(), Mode::Normal);
        assert!(h.cmds.requests.is_empty());
    }

    #[test]
    fn prompt_history_respects_configured_bound() {
        let config = Config::from_toml("history_size = 1").unwrap();
        let shared = SharedState::from_config(&config);
        let mut h = Harness::shared("a\nb\nc", config, shared, 1);
        h.keys(":2<CR>:3<CR>:<Up><Up>");
        assert_eq!(h.engine.prompt().map(PromptSession::display).as_deref(), Some(":3"));
    }

    #[test]
    fn prompt_history_browsing() {
        let mut h = Harness::new("a\nb\nc");
        h.keys(":2<CR>:3<CR>:<Up><Up>");
        assert_eq!(h.engine.prompt().map(PromptSession::display).as_deref(), Some(":2"));
        h.keys("<CR>");
        assert_eq!(h.cursor(), p(1, 0));
    }

    // -- Marks and lists -----------------------------------------------------

    #[test]
    fn marks() {
        let mut h = Harness::new("one\n  two\nthree");
        h.keys("jllmaG'a");
        assert_eq!(h.cursor(), p(1, 2));
        h.keys("G`a");
        assert_eq!(h.cursor(), p(1, 2));
        h.keys("'z");
        assert_eq!(h.error(), Some(UserError::MarkNotSet('z')));
    }

    #[test]
    fn changelist_walks_edits() {
        let mut h = Harness::new("a\nb\nc");
        h.keys("xGx");
        assert_eq!(h.engine.shared().changelist_len(EditorId(1)), 2);
        h.keys("g;");
        assert_eq!(h.cursor(), p(2, 0));
        h.keys("g;");
        assert_eq!(h.cursor(), p(0, 0));
        h.keys("g;");
        assert_eq!(h.error(), Some(UserError::ChangelistStart));
    }

    // -- Disabled ------------------------------------------------------------

    #[test]
    fn disabled_passes_everything_through() {
        let mut h = Harness::new("abc");
        h.keys("i");
        assert_eq!(h.keys("<C-A-v>"), KeyDisposition::Consumed);
        assert_eq!(h.engine.mode(), Mode::Disabled);
        assert_eq!(h.keys("x"), KeyDisposition::PassThrough);
        assert_eq!(h.keys("<Esc>"), KeyDisposition::PassThrough);
        assert_eq!(h.text(), "abc");
        h.keys("<C-A-v>");
        assert_eq!(h.engine.mode(), Mode::Normal);
        h.keys("x");
        assert_eq!(h.text(), "bc");
    }

    // -- Config reload -------------------------------------------------------

    #[test]
    fn reload_waits_for_idle() {
        let mut h = Harness::new("abc");
        h.keys("d");
        h.keys("2");
        let mut config = Config::builtin().unwrap();
        config.timeout = Duration::from_millis(5);
        h.engine.reload_config(Arc::new(config));
        assert_eq!(h.engine.config().timeout, Duration::from_millis(1000));
        h.keys("l");
        assert_eq!(h.engine.config().timeout, Duration::from_millis(5));
    }

    #[test]
    fn feed_event_ignores_releases() {
        use vimkey_input::{KeyEventKind, Modifiers};
        let mut h = Harness::new("abc");
        let release = KeyEvent {
            code: KeyCode::Char('x'),
            modifiers: Modifiers::empty(),
            kind: KeyEventKind::Release,
        };
        assert_eq!(
            h.engine.feed_event(&release, &mut h.ed, &mut h.cmds),
            KeyDisposition::PassThrough
        );
        let press = KeyEvent::press(KeyCode::Char('x'));
        h.engine.feed_event(&press, &mut h.ed, &mut h.cmds);
        assert_eq!(h.text(), "bc");
    }
}
