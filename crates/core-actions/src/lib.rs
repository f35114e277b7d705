//! Action vocabulary and dispatch for a single document.
//!
//! Front ends (menus, key bindings, the `rewind` edit script) translate user
//! input into [`Action`]s; [`dispatcher::dispatch`] applies them to a
//! `core_state::Document`, framing each one as a user action so the history
//! engine sees the same boundaries a GUI key handler would produce.

use std::path::PathBuf;

pub mod dispatcher;
pub mod io_ops;
pub mod script;

pub use dispatcher::{DispatchResult, dispatch};
pub use script::{ScriptCommand, ScriptError, ScriptSummary, execute, parse_line, parse_script};

/// Text mutation requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditKind {
    /// Typed input: each grapheme cluster is its own keystroke.
    Type(String),
    /// A single multi-character insert (clipboard paste).
    Paste(String),
    /// Remove `n` grapheme clusters before the cursor.
    Backspace(usize),
    /// Remove `n` grapheme clusters after the cursor.
    DeleteForward(usize),
}

/// Cursor movement. Offsets are char offsets and clamp to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    To(usize),
    Left(usize),
    Right(usize),
    LineStart,
    LineEnd,
    BufferStart,
    BufferEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Edit(EditKind),
    Motion(MotionKind),
    /// Replace every occurrence of `find` as one undoable unit.
    ReplaceAll {
        find: String,
        replacement: String,
    },
    Undo {
        count: usize,
    },
    Redo {
        count: usize,
    },
    ClearHistory,
    /// Re-read the document's file, discarding history.
    Reload,
    /// Save to the given path or the document's own file name.
    Write(Option<PathBuf>),
}

/// Observer notified before each action is applied.
pub trait ActionObserver {
    fn on_action(&self, action: &Action);
}
