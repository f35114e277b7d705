//! File IO for documents.
//!
//! Loading normalizes line endings to `\n` and goes through
//! `Document::load_text`, so file content is never undoable. Saving expands
//! `\n` back to the style the file was opened with.

use anyhow::{Context, Result, bail};
use core_state::{Document, HistoryLimits, normalize_line_endings};
use core_text::Buffer;
use std::path::{Path, PathBuf};

/// Open `path` as a new document with the given history limits.
pub fn open_document(path: &Path, limits: HistoryLimits) -> Result<Document> {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("file")
        .to_string();
    let mut doc = Document::with_limits(Buffer::new(name), limits);
    load_into(&mut doc, path)?;
    Ok(doc)
}

/// Replace the content of `doc` with the file at `path`, discarding history.
pub fn load_into(doc: &mut Document, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let norm = normalize_line_endings(&content);
    if norm.mixed {
        tracing::warn!(target: "io", path = %path.display(), chosen = ?norm.original, "mixed_line_endings");
    }
    doc.load_text(&norm.normalized);
    doc.file_name = Some(path.to_path_buf());
    doc.original_line_ending = norm.original;
    doc.had_trailing_newline = norm.had_trailing_newline;
    tracing::info!(target: "io", path = %path.display(), chars = doc.len_chars(), "file_loaded");
    Ok(())
}

/// Re-read the document's own file.
pub fn reload(doc: &mut Document) -> Result<()> {
    let Some(path) = doc.file_name.clone() else {
        bail!("document has no file to reload");
    };
    load_into(doc, &path)
}

/// Document text with the original line ending style restored.
pub fn serialize(doc: &Document) -> String {
    let ending = doc.original_line_ending.as_str();
    let text = doc.text();
    let mut out = if ending == "\n" {
        text
    } else {
        text.replace('\n', ending)
    };
    if doc.had_trailing_newline && !out.is_empty() && !out.ends_with(ending) {
        out.push_str(ending);
    }
    out
}

/// Write to `target`, or to the document's own file. A document without a
/// file name adopts `target`. Returns the path written.
pub fn write_file(doc: &mut Document, target: Option<&Path>) -> Result<PathBuf> {
    let path = match (target, doc.file_name.as_ref()) {
        (Some(p), _) => p.to_path_buf(),
        (None, Some(existing)) => existing.clone(),
        (None, None) => bail!("no file name to write to"),
    };
    let content = serialize(doc);
    std::fs::write(&path, content.as_bytes())
        .with_context(|| format!("writing {}", path.display()))?;
    if doc.file_name.is_none() {
        doc.file_name = Some(path.clone());
    }
    doc.dirty = false;
    tracing::info!(target: "io", path = %path.display(), bytes = content.len(), "file_written");
    Ok(path)
}
