//! Undo / redo history engine.
//!
//! Raw insert/delete notifications are coalesced into a single pending
//! [`Cache`] entry and committed as immutable [`Step`]s once an edit can no
//! longer be merged. Steps live in a `Vec` with a `needle` index marking the
//! boundary between applied (`..needle`) and undone (`needle..`) history.
//!
//! Coalescing rules, in order, for an edit arriving while unlocked:
//! 1. Outside a group, a cache holding a grouped entry is flushed first so a
//!    finished group never absorbs unrelated typing.
//! 2. Outside a group, a multi-cluster edit (paste) never merges, and a cache
//!    holding one never absorbs later edits. With `split_words` enabled, a
//!    non-whitespace cluster after a whitespace-flagged cache is a word boundary.
//! 3. Same-direction adjacent edits extend the cache: an insert at the cache
//!    end appends; a backspace (delete ending at the cache start) prepends and
//!    slides `start` left; a forward delete at the cache start appends.
//! 4. Anything else flushes and starts a new entry.
//!
//! Recording any new edit drops steps after the needle (linear history).
//!
//! Grouping: edits after the first one inside an explicit group
//! (`begin_group`/`end_group`) or inside one user action are chained with
//! `in_group = true` and undo/redo together with their predecessor.
//!
//! Replay writes straight to the [`EditTarget`] while the engine is locked, so
//! any notification the owner still forwards during replay is ignored.

use core_events::{
    EDITS_SUPPRESSED, HistoryEvent, HistorySink, REDO_TRUNCATIONS, STEPS_COMMITTED, STEPS_REDONE,
    STEPS_UNDONE,
};
use core_text::{BufferError, BufferId, EditTarget, grapheme};
use std::ops::Range;
use std::sync::atomic::Ordering;
use thiserror::Error;
use tracing::{debug, trace};

/// `max_steps` value meaning "keep every step".
pub const UNDO_HISTORY_UNBOUNDED: usize = 0;

/// Direction of a recorded edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Insert,
    Delete,
}

/// One committed, reversible unit of history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    action: StepAction,
    start: usize,
    end: usize,
    /// Delete: removed text, stored eagerly. Insert: captured the first time
    /// the step is undone and reused by redo.
    text: Option<String>,
    in_group: bool,
}

impl Step {
    pub fn action(&self) -> StepAction {
        self.action
    }
    /// Char range the step covered when it was recorded.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
    pub fn len(&self) -> usize {
        self.end - self.start
    }
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
    /// True when the step undoes/redoes together with the step before it.
    pub fn in_group(&self) -> bool {
        self.in_group
    }
}

/// The pending, still-mergeable edit.
#[derive(Debug, Clone, Default)]
struct Cache {
    action: Option<StepAction>,
    start: usize,
    end: usize,
    /// Accumulated removed text (Delete only).
    string: String,
    is_space: bool,
    in_group: bool,
    /// False for multi-cluster entries; they never absorb later edits outside a group.
    mergeable: bool,
}

impl Cache {
    fn is_empty(&self) -> bool {
        self.action.is_none()
    }

    fn open(
        action: StepAction,
        range: Range<usize>,
        text: &str,
        class: EditClass,
        in_group: bool,
    ) -> Self {
        Self {
            action: Some(action),
            start: range.start,
            end: range.end,
            string: match action {
                StepAction::Delete => text.to_string(),
                StepAction::Insert => String::new(),
            },
            is_space: class.is_space,
            in_group,
            mergeable: class.single,
        }
    }

    /// Extend in place when `action` continues the cached run. Returns false when not adjacent.
    fn try_extend(&mut self, action: StepAction, range: Range<usize>, text: &str) -> bool {
        match (self.action, action) {
            (Some(StepAction::Insert), StepAction::Insert) if range.start == self.end => {
                self.end += range.len();
                true
            }
            // Backspace: the removed text precedes everything cached so far.
            (Some(StepAction::Delete), StepAction::Delete) if range.end == self.start => {
                self.string.insert_str(0, text);
                self.start = range.start;
                true
            }
            // Forward delete: text after the cached run slid into the same offset.
            (Some(StepAction::Delete), StepAction::Delete) if range.start == self.start => {
                self.string.push_str(text);
                self.end += range.len();
                true
            }
            _ => false,
        }
    }

    fn into_step(self) -> Option<Step> {
        let action = self.action?;
        Some(Step {
            action,
            start: self.start,
            end: self.end,
            text: match action {
                StepAction::Delete => Some(self.string),
                StepAction::Insert => None,
            },
            in_group: self.in_group,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct EditClass {
    single: bool,
    is_space: bool,
}

impl EditClass {
    fn of(text: &str) -> Self {
        let single = grapheme::is_single_cluster(text);
        Self {
            single,
            is_space: single && grapheme::is_whitespace(text),
        }
    }
}

/// Tuning knobs, usually derived from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    /// Upper bound on committed steps (`UNDO_HISTORY_UNBOUNDED` = none). Oldest
    /// groups are dropped whole, so a large group may briefly exceed the bound.
    pub max_steps: usize,
    /// Start a new step at whitespace-to-word transitions.
    pub split_words: bool,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_steps: UNDO_HISTORY_UNBOUNDED,
            split_words: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UndoError {
    #[error("history is already attached to buffer {0:?}")]
    AlreadyAttached(BufferId),
    #[error("history is not attached to a buffer")]
    Detached,
    #[error("history belongs to buffer {expected:?}, not {actual:?}")]
    ForeignBuffer { expected: BufferId, actual: BufferId },
    #[error("insert step {0} has no captured text to redo")]
    MissingText(usize),
    #[error("buffer rejected replay: {0}")]
    Buffer(#[from] BufferError),
}

pub struct UndoEngine {
    steps: Vec<Step>,
    /// One past the last applied step.
    needle: usize,
    cache: Cache,
    locked: u32,
    /// Edits already recorded in the current group / user action.
    grouping: u32,
    group_depth: u32,
    user_action_depth: u32,
    limits: HistoryLimits,
    attached: Option<BufferId>,
    sinks: Vec<Box<dyn HistorySink>>,
    last_can_undo: bool,
    last_can_redo: bool,
}

impl Default for UndoEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UndoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoEngine")
            .field("steps", &self.steps.len())
            .field("needle", &self.needle)
            .field("pending", &!self.cache.is_empty())
            .field("locked", &self.locked)
            .field("grouping", &self.grouping)
            .field("group_depth", &self.group_depth)
            .field("user_action_depth", &self.user_action_depth)
            .field("attached", &self.attached)
            .finish()
    }
}

impl UndoEngine {
    pub fn new() -> Self {
        Self::with_limits(HistoryLimits::default())
    }

    pub fn with_limits(limits: HistoryLimits) -> Self {
        Self {
            steps: Vec::new(),
            needle: 0,
            cache: Cache::default(),
            locked: 0,
            grouping: 0,
            group_depth: 0,
            user_action_depth: 0,
            limits,
            attached: None,
            sinks: Vec::new(),
            last_can_undo: false,
            last_can_redo: false,
        }
    }

    /// Bind the engine to `target`. Replay against any other buffer is refused.
    pub fn attach<T: EditTarget + ?Sized>(&mut self, target: &T) -> Result<(), UndoError> {
        if let Some(id) = self.attached {
            return Err(UndoError::AlreadyAttached(id));
        }
        self.attached = Some(target.buffer_id());
        debug!(target: "state.undo", buffer = target.buffer_id().get(), "attached");
        Ok(())
    }

    pub fn attached(&self) -> Option<BufferId> {
        self.attached
    }

    pub fn limits(&self) -> HistoryLimits {
        self.limits
    }

    /// Replace the limits; a lower `max_steps` trims immediately.
    pub fn set_limits(&mut self, limits: HistoryLimits) {
        self.limits = limits;
        self.enforce_limit();
        self.notify_availability();
    }

    /// Register an availability observer.
    pub fn connect<S: HistorySink + 'static>(&mut self, sink: S) {
        self.sinks.push(Box::new(sink));
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn needle(&self) -> usize {
        self.needle
    }

    /// True while an uncommitted edit sits in the cache.
    pub fn has_pending(&self) -> bool {
        !self.cache.is_empty()
    }

    pub fn is_locked(&self) -> bool {
        self.locked > 0
    }

    pub fn group_depth(&self) -> u32 {
        self.group_depth
    }

    pub fn can_undo(&self) -> bool {
        self.needle > 0 || !self.cache.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        self.needle < self.steps.len()
    }

    /// Route a buffer notification.
    pub fn handle(&mut self, event: &core_events::BufferEvent) {
        use core_events::BufferEvent;
        match event {
            BufferEvent::Insert { offset, text } => self.on_insert(*offset, text),
            BufferEvent::Delete { start, end, text } => self.on_delete(*start, *end, text),
            BufferEvent::BeginUserAction => self.begin_user_action(),
            BufferEvent::EndUserAction => self.end_user_action(),
        }
    }

    pub fn on_insert(&mut self, offset: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        let len = text.chars().count();
        self.record(StepAction::Insert, offset..offset + len, text);
    }

    pub fn on_delete(&mut self, start: usize, end: usize, text: &str) {
        if start >= end {
            return;
        }
        debug_assert_eq!(text.chars().count(), end - start, "delete text/range mismatch");
        self.record(StepAction::Delete, start..end, text);
    }

    /// A logical user action starts: its first edit is merged by the normal
    /// heuristics; later edits of the same action are chained to it. Actions
    /// nest by count; only the outermost pair opens and closes the unit.
    pub fn begin_user_action(&mut self) {
        if self.user_action_depth == 0 && self.group_depth == 0 {
            self.grouping = 0;
        }
        self.user_action_depth += 1;
    }

    /// # Panics
    /// When called without a matching `begin_user_action`.
    pub fn end_user_action(&mut self) {
        assert!(
            self.user_action_depth > 0,
            "end_user_action() without matching begin_user_action()"
        );
        self.user_action_depth -= 1;
        if self.user_action_depth == 0 && self.group_depth == 0 {
            self.grouping = 0;
        }
    }

    /// Open (or nest) an explicit group. Everything recorded until the matching
    /// `end_group` undoes as one unit; the outermost pair also commits the pending
    /// edit on both sides so the group shares no step with surrounding typing.
    pub fn begin_group(&mut self) {
        if self.group_depth == 0 {
            self.flush();
            self.grouping = 0;
        }
        self.group_depth += 1;
        trace!(target: "state.undo", depth = self.group_depth, "begin_group");
    }

    /// # Panics
    /// When called without a matching `begin_group`.
    pub fn end_group(&mut self) {
        assert!(self.group_depth > 0, "end_group() without matching begin_group()");
        self.group_depth -= 1;
        if self.group_depth == 0 {
            self.flush();
            self.grouping = 0;
        }
        trace!(target: "state.undo", depth = self.group_depth, "end_group");
    }

    /// Suppress recording; reentrant.
    pub fn lock(&mut self) {
        self.locked += 1;
    }

    /// # Panics
    /// When the lock count would drop below zero.
    pub fn unlock(&mut self) {
        assert!(self.locked > 0, "unlock() without matching lock()");
        self.locked -= 1;
    }

    /// Drop the pending edit and every step.
    pub fn clear(&mut self) {
        self.lock();
        let dropped = self.steps.len();
        self.cache = Cache::default();
        self.steps.clear();
        self.needle = 0;
        self.grouping = 0;
        self.unlock();
        debug!(target: "state.undo", dropped, "history_cleared");
        self.notify_availability();
    }

    /// Revert the most recent step (and the rest of its group). Returns `Ok(false)`
    /// when nothing can be undone.
    ///
    /// The cursor lands at the start of the earliest reverted step, also when
    /// the step re-inserts deleted text.
    pub fn undo<T: EditTarget + ?Sized>(&mut self, target: &mut T) -> Result<bool, UndoError> {
        self.check_target(target)?;
        if !self.can_undo() {
            return Ok(false);
        }
        self.flush();
        self.lock();
        let result = self.replay_backward(target);
        self.unlock();
        self.notify_availability();
        result.map(|undone| {
            STEPS_UNDONE.fetch_add(undone as u64, Ordering::Relaxed);
            debug!(target: "state.undo", undone, needle = self.needle, steps = self.steps.len(), "undo");
            true
        })
    }

    /// Re-apply the next undone step (and the rest of its group). Returns `Ok(false)`
    /// when nothing can be redone.
    pub fn redo<T: EditTarget + ?Sized>(&mut self, target: &mut T) -> Result<bool, UndoError> {
        self.check_target(target)?;
        if !self.can_redo() {
            return Ok(false);
        }
        self.lock();
        let result = self.replay_forward(target);
        self.unlock();
        self.notify_availability();
        result.map(|redone| {
            STEPS_REDONE.fetch_add(redone as u64, Ordering::Relaxed);
            debug!(target: "state.undo", redone, needle = self.needle, steps = self.steps.len(), "redo");
            true
        })
    }

    fn replay_backward<T: EditTarget + ?Sized>(&mut self, target: &mut T) -> Result<usize, UndoError> {
        let mut undone = 0;
        while self.needle > 0 {
            let idx = self.needle - 1;
            let step = &mut self.steps[idx];
            match step.action {
                StepAction::Insert => {
                    let removed = target.remove_chars(step.start, step.end)?;
                    if step.text.is_none() {
                        step.text = Some(removed);
                    }
                }
                StepAction::Delete => {
                    let text = step.text.as_deref().unwrap_or_default();
                    target.insert_chars(step.start, text)?;
                }
            }
            target.set_cursor(step.start);
            trace!(target: "state.undo", idx, action = ?step.action, start = step.start, end = step.end, "undo_step");
            self.needle = idx;
            undone += 1;
            if !step.in_group {
                break;
            }
        }
        Ok(undone)
    }

    fn replay_forward<T: EditTarget + ?Sized>(&mut self, target: &mut T) -> Result<usize, UndoError> {
        let mut redone = 0;
        while self.needle < self.steps.len() {
            let idx = self.needle;
            let step = &self.steps[idx];
            match step.action {
                StepAction::Insert => {
                    let text = step.text.as_deref().ok_or(UndoError::MissingText(idx))?;
                    target.insert_chars(step.start, text)?;
                    target.set_cursor(step.end);
                }
                StepAction::Delete => {
                    let removed = target.remove_chars(step.start, step.end)?;
                    debug_assert_eq!(Some(removed.as_str()), step.text.as_deref());
                    target.set_cursor(step.start);
                }
            }
            trace!(target: "state.undo", idx, action = ?step.action, start = step.start, end = step.end, "redo_step");
            self.needle = idx + 1;
            redone += 1;
            let next_grouped = self.steps.get(self.needle).is_some_and(Step::in_group);
            if !next_grouped {
                break;
            }
        }
        Ok(redone)
    }

    fn check_target<T: EditTarget + ?Sized>(&self, target: &T) -> Result<(), UndoError> {
        match self.attached {
            None => Err(UndoError::Detached),
            Some(expected) if expected != target.buffer_id() => Err(UndoError::ForeignBuffer {
                expected,
                actual: target.buffer_id(),
            }),
            Some(_) => Ok(()),
        }
    }

    fn record(&mut self, action: StepAction, range: Range<usize>, text: &str) {
        if self.locked > 0 {
            EDITS_SUPPRESSED.fetch_add(1, Ordering::Relaxed);
            trace!(target: "state.undo", ?action, start = range.start, end = range.end, "edit_suppressed_locked");
            return;
        }
        let grouped = self.grouping > 0;
        if !grouped && self.cache.in_group {
            self.flush();
        }
        self.truncate_redo();

        let class = EditClass::of(text);
        let merged = !self.cache.is_empty()
            && (grouped || !self.is_boundary(class))
            && self.cache.try_extend(action, range.clone(), text);
        if merged {
            self.cache.is_space = class.is_space;
        } else {
            self.flush();
            self.cache = Cache::open(action, range.clone(), text, class, grouped);
        }
        trace!(target: "state.undo", ?action, start = range.start, end = range.end, merged, grouped, "edit_recorded");

        if self.group_depth > 0 || self.user_action_depth > 0 {
            self.grouping += 1;
        }
        self.notify_availability();
    }

    /// Whether an ungrouped edit of `class` must start a new step.
    fn is_boundary(&self, class: EditClass) -> bool {
        !class.single
            || !self.cache.mergeable
            || (self.limits.split_words && self.cache.is_space && !class.is_space)
    }

    /// Commit the pending cache as a step.
    fn flush(&mut self) {
        let Some(step) = std::mem::take(&mut self.cache).into_step() else {
            return;
        };
        self.truncate_redo();
        trace!(target: "state.undo", action = ?step.action, start = step.start, end = step.end, in_group = step.in_group, "step_committed");
        self.steps.push(step);
        self.needle = self.steps.len();
        STEPS_COMMITTED.fetch_add(1, Ordering::Relaxed);
        self.enforce_limit();
    }

    fn truncate_redo(&mut self) {
        if self.needle < self.steps.len() {
            let dropped = self.steps.len() - self.needle;
            self.steps.truncate(self.needle);
            REDO_TRUNCATIONS.fetch_add(1, Ordering::Relaxed);
            trace!(target: "state.undo", dropped, "redo_truncated");
        }
    }

    /// Drop the oldest steps beyond `max_steps`, never splitting a group and never
    /// touching steps that are currently undone.
    fn enforce_limit(&mut self) {
        let max = self.limits.max_steps;
        if max == UNDO_HISTORY_UNBOUNDED || self.steps.len() <= max {
            return;
        }
        let mut cut = (self.steps.len() - max).min(self.needle);
        while cut > 0 && self.steps.get(cut).is_some_and(Step::in_group) {
            cut -= 1;
        }
        if cut == 0 {
            return;
        }
        self.steps.drain(..cut);
        self.needle -= cut;
        trace!(target: "state.undo", dropped = cut, "undo_stack_trimmed");
    }

    fn notify_availability(&mut self) {
        let can_undo = self.can_undo();
        let can_redo = self.can_redo();
        let mut events = Vec::with_capacity(2);
        if can_undo != self.last_can_undo {
            self.last_can_undo = can_undo;
            events.push(HistoryEvent::CanUndo(can_undo));
        }
        if can_redo != self.last_can_redo {
            self.last_can_redo = can_redo;
            events.push(HistoryEvent::CanRedo(can_redo));
        }
        for event in &events {
            trace!(target: "state.undo", ?event, "availability_changed");
            for sink in &self.sinks {
                sink.notify(event);
            }
        }
    }
}
