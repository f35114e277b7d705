//! Document state: one text buffer, its undo engine, and file metadata.
//!
//! `Document` is the notification path between edits and history. Every
//! mutation goes through it: offsets are validated first (a rejected edit
//! never reaches the history), the engine is told about the edit, then the
//! buffer is changed. Undo/redo replay bypasses this path and writes to the
//! buffer directly while the engine holds its own lock.
//!
//! Loading content (file open, reload) happens under the engine lock and is
//! followed by a history clear, so freshly loaded text is never undoable.

use core_events::{BufferEvent, HistorySink};
use core_text::{Buffer, BufferError, EditTarget};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, trace};

pub mod undo;
pub use undo::{
    HistoryLimits, Step, StepAction, UNDO_HISTORY_UNBOUNDED, UndoEngine, UndoError,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error(transparent)]
    Undo(#[from] UndoError),
}

/// Line ending style detected from source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    Cr,
    Crlf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Cr => "\r",
            LineEnding::Crlf => "\r\n",
        }
    }
}

/// Result of normalizing line endings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    pub normalized: String, // LF-only content
    pub original: LineEnding,
    pub had_trailing_newline: bool,
    pub mixed: bool,
}

/// Rewrite CRLF and lone CR to LF. The reported style is the most frequent one
/// (ties prefer CRLF, then LF, then CR).
pub fn normalize_line_endings(input: &str) -> NormalizedText {
    let (mut crlf, mut lf, mut cr) = (0usize, 0usize, 0usize);
    let mut normalized = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                crlf += 1;
                normalized.push('\n');
            }
            '\r' => {
                cr += 1;
                normalized.push('\n');
            }
            '\n' => {
                lf += 1;
                normalized.push('\n');
            }
            other => normalized.push(other),
        }
    }
    let counts = [
        (LineEnding::Crlf, crlf),
        (LineEnding::Lf, lf),
        (LineEnding::Cr, cr),
    ];
    let original = counts
        .iter()
        .fold((LineEnding::Lf, 0usize), |best, &(style, n)| {
            if n > best.1 { (style, n) } else { best }
        })
        .0;
    let styles_seen = counts.iter().filter(|(_, n)| *n > 0).count();
    NormalizedText {
        had_trailing_newline: normalized.ends_with('\n'),
        normalized,
        original,
        mixed: styles_seen > 1,
    }
}

/// One open document.
pub struct Document {
    buffer: Buffer,
    history: UndoEngine,
    pub file_name: Option<PathBuf>,
    pub dirty: bool,
    pub original_line_ending: LineEnding,
    pub had_trailing_newline: bool,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("buffer", &self.buffer)
            .field("history", &self.history)
            .field("file_name", &self.file_name)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl Document {
    pub fn new(buffer: Buffer) -> Self {
        Self::with_limits(buffer, HistoryLimits::default())
    }

    pub fn with_limits(buffer: Buffer, limits: HistoryLimits) -> Self {
        let mut history = UndoEngine::with_limits(limits);
        history
            .attach(&buffer)
            .expect("fresh engine is unattached");
        Self {
            buffer,
            history,
            file_name: None,
            dirty: false,
            original_line_ending: LineEnding::Lf,
            had_trailing_newline: false,
        }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn history(&self) -> &UndoEngine {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut UndoEngine {
        &mut self.history
    }

    pub fn text(&self) -> String {
        self.buffer.text()
    }

    pub fn len_chars(&self) -> usize {
        self.buffer.len_chars()
    }

    pub fn cursor(&self) -> usize {
        self.buffer.cursor()
    }

    pub fn set_cursor(&mut self, offset: usize) {
        self.buffer.set_cursor(offset);
    }

    /// Register an undo/redo availability observer.
    pub fn connect<S: HistorySink + 'static>(&mut self, sink: S) {
        self.history.connect(sink);
    }

    /// Insert `text` at `offset`; the cursor lands after it.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<(), EditError> {
        let len = self.buffer.len_chars();
        if offset > len {
            return Err(BufferError::OutOfBounds {
                start: offset,
                end: offset,
                len,
            }
            .into());
        }
        if text.is_empty() {
            return Ok(());
        }
        self.notify(BufferEvent::insert(offset, text));
        self.buffer.insert_chars(offset, text)?;
        self.buffer.set_cursor(offset + text.chars().count());
        self.dirty = true;
        Ok(())
    }

    /// Remove `[start,end)`; the cursor lands at `start`. Returns the removed text.
    pub fn delete(&mut self, start: usize, end: usize) -> Result<String, EditError> {
        let removed = self.buffer.slice_chars(start, end)?;
        if removed.is_empty() {
            return Ok(removed);
        }
        self.notify(BufferEvent::delete(start, end, removed.as_str()));
        self.buffer.remove_chars(start, end)?;
        self.buffer.set_cursor(start);
        self.dirty = true;
        Ok(removed)
    }

    /// Replace `[start,end)` with `text` as a single user action.
    pub fn replace(&mut self, start: usize, end: usize, text: &str) -> Result<(), EditError> {
        self.user_action(|doc| {
            doc.delete(start, end)?;
            doc.insert(start, text)
        })
    }

    pub fn begin_user_action(&mut self) {
        self.notify(BufferEvent::BeginUserAction);
    }

    pub fn end_user_action(&mut self) {
        self.notify(BufferEvent::EndUserAction);
    }

    fn notify(&mut self, event: BufferEvent) {
        if event.is_edit() {
            trace!(target: "state.document", %event, "edit_notified");
        }
        self.history.handle(&event);
    }

    /// Run `f` between begin/end user-action boundaries.
    pub fn user_action<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_user_action();
        let out = f(self);
        self.end_user_action();
        out
    }

    pub fn begin_group(&mut self) {
        self.history.begin_group();
    }

    pub fn end_group(&mut self) {
        self.history.end_group();
    }

    /// Run `f` inside an explicit history group so everything it records undoes at once.
    pub fn grouped<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_group();
        let out = f(self);
        self.end_group();
        out
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> Result<bool, EditError> {
        let applied = self.history.undo(&mut self.buffer)?;
        if applied {
            self.dirty = true;
        }
        Ok(applied)
    }

    pub fn redo(&mut self) -> Result<bool, EditError> {
        let applied = self.history.redo(&mut self.buffer)?;
        if applied {
            self.dirty = true;
        }
        Ok(applied)
    }

    /// Drop all undo history, keeping the text.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Replace the whole content without recording it (file load / reload).
    /// History is cleared and the document is marked clean.
    pub fn load_text(&mut self, text: &str) {
        self.history.lock();
        let old_len = self.buffer.len_chars();
        if old_len > 0 {
            let old = self.buffer.text();
            self.history.handle(&BufferEvent::delete(0, old_len, old));
        }
        self.history.handle(&BufferEvent::insert(0, text));
        self.buffer.set_text(text);
        self.history.unlock();
        self.history.clear();
        self.dirty = false;
        debug!(target: "state.document", chars = self.buffer.len_chars(), "content_loaded");
    }
}
