//! Rope-based text buffer abstraction.
//!
//! All public offsets are *character* offsets (Unicode scalar values), which is
//! the unit the undo engine records. Byte offsets never leave this crate.
//!
//! The [`EditTarget`] trait is the contract the history engine replays against:
//! offset-addressed slice/insert/remove plus a single cursor mark.

use ropey::Rope;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Buffer`]. Used by the history engine to refuse
/// replaying steps against a buffer it was not attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u64);

impl BufferId {
    fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("char range {start}..{end} is out of bounds for a buffer of {len} chars")]
    OutOfBounds { start: usize, end: usize, len: usize },
}

/// Offset-addressed mutable text with a cursor mark.
///
/// Implementations must reject ranges outside `0..=len_chars()` instead of
/// clamping, so a caller holding stale offsets gets an error rather than a
/// silently different edit.
pub trait EditTarget {
    fn buffer_id(&self) -> BufferId;
    fn len_chars(&self) -> usize;
    /// Text in the half-open char range `[start,end)`.
    fn slice_chars(&self, start: usize, end: usize) -> Result<String, BufferError>;
    fn insert_chars(&mut self, offset: usize, text: &str) -> Result<(), BufferError>;
    /// Remove `[start,end)` returning the removed text.
    fn remove_chars(&mut self, start: usize, end: usize) -> Result<String, BufferError>;
    fn cursor(&self) -> usize;
    /// Move the cursor mark; offsets past the end clamp to the end.
    fn set_cursor(&mut self, offset: usize);
}

/// A text buffer backed by a `ropey::Rope`.
pub struct Buffer {
    rope: Rope,
    pub name: String,
    id: BufferId,
    cursor: usize,
}

/// A cursor location expressed as (line index, char column within that line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("len_chars", &self.rope.len_chars())
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl Buffer {
    /// Construct an empty buffer.
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_text(name, "")
    }

    /// Construct a buffer from an in-memory string slice. The cursor starts at offset 0.
    pub fn from_text(name: impl Into<String>, content: &str) -> Self {
        Self {
            rope: Rope::from_str(content),
            name: name.into(),
            id: BufferId::next(),
            cursor: 0,
        }
    }

    /// Full buffer contents.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Replace the whole content. The cursor returns to the start.
    pub fn set_text(&mut self, content: &str) {
        self.rope = Rope::from_str(content);
        self.cursor = 0;
    }

    /// Line/column of a char offset (clamped to the buffer end).
    pub fn position_of(&self, offset: usize) -> Position {
        let offset = offset.min(self.rope.len_chars());
        let line = self.rope.char_to_line(offset);
        let col = offset - self.rope.line_to_char(line);
        Position { line, col }
    }

    /// Char range of line `idx` without its line break. Out-of-range lines
    /// yield the empty range at the buffer end.
    pub fn line_range(&self, idx: usize) -> std::ops::Range<usize> {
        let len = self.rope.len_chars();
        if idx >= self.rope.len_lines() {
            return len..len;
        }
        let start = self.rope.line_to_char(idx);
        let line = self.rope.line(idx);
        let mut end = start + line.len_chars();
        if end > start && line.char(line.len_chars() - 1) == '\n' {
            end -= 1;
        }
        start..end
    }

    /// Char offset of the grapheme boundary preceding `offset` (0 at the start).
    pub fn prev_grapheme_offset(&self, offset: usize) -> usize {
        let offset = offset.min(self.rope.len_chars());
        if offset == 0 {
            return 0;
        }
        let window_start = offset.saturating_sub(grapheme::WINDOW);
        let window = self.rope.slice(window_start..offset).to_string();
        window_start + grapheme::last_cluster_start(&window)
    }

    /// Char offset of the grapheme boundary following `offset` (buffer end at the end).
    pub fn next_grapheme_offset(&self, offset: usize) -> usize {
        let len = self.rope.len_chars();
        if offset >= len {
            return len;
        }
        let window_end = (offset + grapheme::WINDOW).min(len);
        let window = self.rope.slice(offset..window_end).to_string();
        offset + grapheme::first_cluster_len(&window)
    }

    fn check_range(&self, start: usize, end: usize) -> Result<(), BufferError> {
        let len = self.rope.len_chars();
        if start > end || end > len {
            return Err(BufferError::OutOfBounds { start, end, len });
        }
        Ok(())
    }
}

impl EditTarget for Buffer {
    fn buffer_id(&self) -> BufferId {
        self.id
    }

    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn slice_chars(&self, start: usize, end: usize) -> Result<String, BufferError> {
        self.check_range(start, end)?;
        Ok(self.rope.slice(start..end).to_string())
    }

    fn insert_chars(&mut self, offset: usize, text: &str) -> Result<(), BufferError> {
        self.check_range(offset, offset)?;
        self.rope.insert(offset, text);
        Ok(())
    }

    fn remove_chars(&mut self, start: usize, end: usize) -> Result<String, BufferError> {
        self.check_range(start, end)?;
        let removed = self.rope.slice(start..end).to_string();
        self.rope.remove(start..end);
        // Keep the mark inside the shrunken buffer.
        if self.cursor > self.rope.len_chars() {
            self.cursor = self.rope.len_chars();
        }
        Ok(removed)
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn set_cursor(&mut self, offset: usize) {
        self.cursor = offset.min(self.rope.len_chars());
    }
}

/// Grapheme cluster helpers operating on plain string slices.
pub mod grapheme {
    use unicode_segmentation::UnicodeSegmentation;

    /// Chars inspected around an offset when locating a cluster boundary.
    /// Longer clusters (e.g. pathological combining runs) are split at the window edge.
    pub(crate) const WINDOW: usize = 32;

    /// Iterate grapheme clusters of `text`.
    pub fn clusters(text: &str) -> impl Iterator<Item = &str> {
        text.graphemes(true)
    }

    /// True when `text` is exactly one grapheme cluster.
    pub fn is_single_cluster(text: &str) -> bool {
        let mut it = text.graphemes(true);
        it.next().is_some() && it.next().is_none()
    }

    /// True when every char of the cluster is whitespace.
    pub fn is_whitespace(cluster: &str) -> bool {
        !cluster.is_empty() && cluster.chars().all(char::is_whitespace)
    }

    /// Char index where the last cluster of `text` begins.
    pub(crate) fn last_cluster_start(text: &str) -> usize {
        match text.grapheme_indices(true).next_back() {
            Some((byte, _)) => text[..byte].chars().count(),
            None => 0,
        }
    }

    /// Char length of the first cluster of `text`.
    pub(crate) fn first_cluster_len(text: &str) -> usize {
        text.graphemes(true)
            .next()
            .map(|g| g.chars().count())
            .unwrap_or(0)
    }
}
