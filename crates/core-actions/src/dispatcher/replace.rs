//! Replace-all: every occurrence is rewritten inside one history group, so a
//! single undo restores the original text and a single redo reapplies it.

use super::DispatchResult;
use core_state::{Document, EditError};

/// Char ranges of the non-overlapping occurrences of `needle`, left to right.
pub(crate) fn find_all(haystack: &str, needle: &str) -> Vec<std::ops::Range<usize>> {
    if needle.is_empty() {
        return Vec::new();
    }
    let needle_chars = needle.chars().count();
    let mut hits = Vec::new();
    let mut chars_seen = 0usize;
    let mut bytes_seen = 0usize;
    for (byte_idx, _) in haystack.match_indices(needle) {
        chars_seen += haystack[bytes_seen..byte_idx].chars().count();
        bytes_seen = byte_idx;
        hits.push(chars_seen..chars_seen + needle_chars);
    }
    hits
}

pub(crate) fn handle_replace_all(
    find: &str,
    replacement: &str,
    doc: &mut Document,
) -> Result<DispatchResult, EditError> {
    let hits = find_all(&doc.text(), find);
    if hits.is_empty() {
        tracing::debug!(target: "actions.dispatch", op = "replace_all", hits = 0, "no_match");
        return Ok(DispatchResult::clean());
    }
    let grow = replacement.chars().count() as isize - find.chars().count() as isize;
    doc.grouped(|d| {
        let mut shift = 0isize;
        for hit in &hits {
            let start = (hit.start as isize + shift) as usize;
            let end = (hit.end as isize + shift) as usize;
            d.replace(start, end, replacement)?;
            shift += grow;
        }
        Ok::<_, EditError>(())
    })?;
    tracing::debug!(target: "actions.dispatch", op = "replace_all", hits = hits.len(), "replaced");
    Ok(DispatchResult::dirty())
}
