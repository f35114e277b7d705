//! Dispatcher applying `Action` to a mutable `Document`.
//!
//! Sub-modules:
//! * `motion`  - cursor movement
//! * `edit`    - typing, paste, backspace, forward delete
//! * `replace` - grouped replace-all
//! * `undo`    - undo / redo / history reset
//!
//! File actions (`Reload`, `Write`) delegate to `crate::io_ops`.

use crate::{Action, ActionObserver};
use anyhow::Result;
use core_state::Document;

mod edit;
mod motion;
mod replace;
mod undo;

/// Result of dispatching a single `Action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchResult {
    /// Buffer content or cursor changed.
    pub dirty: bool,
    /// Content was replaced wholesale (reload); history starts over.
    pub buffer_replaced: bool,
}

impl DispatchResult {
    pub fn dirty() -> Self {
        Self {
            dirty: true,
            buffer_replaced: false,
        }
    }
    pub fn clean() -> Self {
        Self {
            dirty: false,
            buffer_replaced: false,
        }
    }
    pub fn buffer_replaced() -> Self {
        Self {
            dirty: true,
            buffer_replaced: true,
        }
    }
    pub(crate) fn from_changed(changed: bool) -> Self {
        if changed { Self::dirty() } else { Self::clean() }
    }
}

/// Apply an action to the document.
///
/// Errors are edit rejections from the buffer (which leave history untouched)
/// and IO failures from file actions.
pub fn dispatch(
    action: Action,
    doc: &mut Document,
    observers: &[Box<dyn ActionObserver>],
) -> Result<DispatchResult> {
    for obs in observers {
        obs.on_action(&action);
    }

    let result = match action {
        Action::Edit(kind) => edit::handle_edit(kind, doc)?,
        Action::Motion(kind) => motion::handle_motion(kind, doc),
        Action::ReplaceAll { find, replacement } => {
            replace::handle_replace_all(&find, &replacement, doc)?
        }
        Action::Undo { count } => undo::handle_undo(count, doc)?,
        Action::Redo { count } => undo::handle_redo(count, doc)?,
        Action::ClearHistory => undo::handle_clear(doc),
        Action::Reload => {
            crate::io_ops::reload(doc)?;
            DispatchResult::buffer_replaced()
        }
        Action::Write(target) => {
            crate::io_ops::write_file(doc, target.as_deref())?;
            DispatchResult::clean()
        }
    };
    Ok(result)
}
