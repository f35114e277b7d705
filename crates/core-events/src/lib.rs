//! Event vocabulary shared by the document, the history engine and observers.
//!
//! Two directions of traffic:
//! * [`BufferEvent`]: raw edit notifications flowing *into* the history engine
//!   from whoever owns the text buffer. Offsets are char offsets.
//! * [`HistoryEvent`]: availability changes flowing *out* of the engine so a
//!   front end can enable or gray out its undo/redo commands.

use crossbeam_channel::{Receiver, Sender};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// -------------------------------------------------------------------------------------------------
// Telemetry
// -------------------------------------------------------------------------------------------------
// Relaxed atomic counters, process wide. Tests should compare deltas rather than absolute values
// since every engine in the process feeds the same counters.
// -------------------------------------------------------------------------------------------------
pub static STEPS_COMMITTED: AtomicU64 = AtomicU64::new(0);
pub static STEPS_UNDONE: AtomicU64 = AtomicU64::new(0);
pub static STEPS_REDONE: AtomicU64 = AtomicU64::new(0);
pub static EDITS_SUPPRESSED: AtomicU64 = AtomicU64::new(0); // notifications ignored while locked
pub static REDO_TRUNCATIONS: AtomicU64 = AtomicU64::new(0);
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);

/// Raw edit notification delivered synchronously by the buffer owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferEvent {
    /// `text` is about to be inserted at `offset`.
    Insert { offset: usize, text: String },
    /// `[start,end)` holding `text` is about to be removed.
    Delete {
        start: usize,
        end: usize,
        text: String,
    },
    /// A logical user action (keystroke, paste, replace-selection) begins.
    BeginUserAction,
    EndUserAction,
}

impl BufferEvent {
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::Insert {
            offset,
            text: text.into(),
        }
    }

    pub fn delete(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self::Delete {
            start,
            end,
            text: text.into(),
        }
    }

    /// True for the events that change buffer content.
    pub fn is_edit(&self) -> bool {
        matches!(self, Self::Insert { .. } | Self::Delete { .. })
    }
}

impl fmt::Display for BufferEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Content is deliberately not printed; only shape.
        match self {
            Self::Insert { offset, text } => {
                write!(f, "insert@{offset}+{}", text.chars().count())
            }
            Self::Delete { start, end, .. } => write!(f, "delete[{start},{end})"),
            Self::BeginUserAction => f.write_str("begin_user_action"),
            Self::EndUserAction => f.write_str("end_user_action"),
        }
    }
}

/// Undo/redo availability transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEvent {
    CanUndo(bool),
    CanRedo(bool),
}

/// Observer of [`HistoryEvent`]s. Invoked synchronously on the thread driving the engine and
/// must not call back into it.
///
/// Closures implement this trait, so `engine.connect(|ev: &HistoryEvent| ...)` works.
pub trait HistorySink {
    fn notify(&self, event: &HistoryEvent);
}

impl<F> HistorySink for F
where
    F: Fn(&HistoryEvent),
{
    fn notify(&self, event: &HistoryEvent) {
        self(event)
    }
}

/// Forwards history events into a crossbeam channel so another thread (or a later poll in the
/// same loop) can consume them. Never blocks: the channel is unbounded and send failures are
/// counted rather than propagated.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<HistoryEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<HistoryEvent>) -> Self {
        Self { tx }
    }
}

impl HistorySink for ChannelSink {
    fn notify(&self, event: &HistoryEvent) {
        if self.tx.send(*event).is_err() {
            CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(target: "events", ?event, "history_event_dropped");
        }
    }
}

/// Convenience constructor returning a connected sink/receiver pair.
pub fn history_channel() -> (ChannelSink, Receiver<HistoryEvent>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (ChannelSink::new(tx), rx)
}

/// Point-in-time copy of the telemetry counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetrySnapshot {
    pub steps_committed: u64,
    pub steps_undone: u64,
    pub steps_redone: u64,
    pub edits_suppressed: u64,
    pub redo_truncations: u64,
    pub channel_send_failures: u64,
}

pub fn telemetry_snapshot() -> TelemetrySnapshot {
    TelemetrySnapshot {
        steps_committed: STEPS_COMMITTED.load(Ordering::Relaxed),
        steps_undone: STEPS_UNDONE.load(Ordering::Relaxed),
        steps_redone: STEPS_REDONE.load(Ordering::Relaxed),
        edits_suppressed: EDITS_SUPPRESSED.load(Ordering::Relaxed),
        redo_truncations: REDO_TRUNCATIONS.load(Ordering::Relaxed),
        channel_send_failures: CHANNEL_SEND_FAILURES.load(Ordering::Relaxed),
    }
}
