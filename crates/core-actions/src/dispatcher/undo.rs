//! Undo / redo / history reset.

use super::DispatchResult;
use core_state::{Document, EditError};

/// Undo up to `count` steps; stops early once nothing is left.
pub(crate) fn handle_undo(count: usize, doc: &mut Document) -> Result<DispatchResult, EditError> {
    let mut applied = 0usize;
    while applied < count && doc.undo()? {
        applied += 1;
    }
    tracing::trace!(target: "actions.dispatch", op = "undo", requested = count, applied, can_redo = doc.can_redo(), "history");
    Ok(DispatchResult::from_changed(applied > 0))
}

pub(crate) fn handle_redo(count: usize, doc: &mut Document) -> Result<DispatchResult, EditError> {
    let mut applied = 0usize;
    while applied < count && doc.redo()? {
        applied += 1;
    }
    tracing::trace!(target: "actions.dispatch", op = "redo", requested = count, applied, can_undo = doc.can_undo(), "history");
    Ok(DispatchResult::from_changed(applied > 0))
}

pub(crate) fn handle_clear(doc: &mut Document) -> DispatchResult {
    let had_history = doc.can_undo() || doc.can_redo();
    doc.clear_history();
    tracing::debug!(target: "actions.dispatch", op = "clear_history", had_history, "history");
    DispatchResult::clean()
}
