//! Text edit handling (typing, paste, backspace, forward delete).
//!
//! Every keystroke becomes its own user action, the way a GUI key handler
//! frames input, so the history engine's coalescing decides what merges.
//! Deletions walk grapheme boundaries; a user never removes half a cluster.

use super::DispatchResult;
use crate::EditKind;
use core_state::{Document, EditError};
use core_text::grapheme;

pub(crate) fn handle_edit(kind: EditKind, doc: &mut Document) -> Result<DispatchResult, EditError> {
    let changed = match kind {
        EditKind::Type(text) => {
            let mut typed = 0usize;
            for cluster in grapheme::clusters(&text) {
                doc.user_action(|d| {
                    let at = d.cursor();
                    d.insert(at, cluster)
                })?;
                typed += 1;
            }
            tracing::trace!(target: "actions.dispatch", op = "type", clusters = typed, cursor = doc.cursor(), "edit");
            typed > 0
        }
        EditKind::Paste(text) => {
            let at = doc.cursor();
            doc.user_action(|d| d.insert(at, &text))?;
            tracing::trace!(target: "actions.dispatch", op = "paste", offset = at, chars = text.chars().count(), "edit");
            !text.is_empty()
        }
        EditKind::Backspace(count) => {
            let mut removed = 0usize;
            for _ in 0..count {
                let at = doc.cursor();
                if at == 0 {
                    break;
                }
                let prev = doc.buffer().prev_grapheme_offset(at);
                doc.user_action(|d| d.delete(prev, at))?;
                removed += 1;
            }
            tracing::trace!(target: "actions.dispatch", op = "backspace", requested = count, removed, "edit");
            removed > 0
        }
        EditKind::DeleteForward(count) => {
            let mut removed = 0usize;
            for _ in 0..count {
                let at = doc.cursor();
                if at >= doc.len_chars() {
                    break;
                }
                let next = doc.buffer().next_grapheme_offset(at);
                doc.user_action(|d| d.delete(at, next))?;
                removed += 1;
            }
            tracing::trace!(target: "actions.dispatch", op = "delete_forward", requested = count, removed, "edit");
            removed > 0
        }
    };
    Ok(DispatchResult::from_changed(changed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::Buffer;

    fn doc(text: &str, cursor: usize) -> Document {
        let mut d = Document::new(Buffer::from_text("edit", text));
        d.set_cursor(cursor);
        d
    }

    #[test]
    fn typing_inserts_at_cursor() {
        let mut d = doc("ad", 1);
        handle_edit(EditKind::Type("bc".into()), &mut d).unwrap();
        assert_eq!(d.text(), "abcd");
        assert_eq!(d.cursor(), 3);
        d.undo().unwrap();
        assert_eq!(d.text(), "ad");
    }

    #[test]
    fn backspace_removes_whole_cluster() {
        let mut d = doc("xe\u{301}", 3);
        handle_edit(EditKind::Backspace(1), &mut d).unwrap();
        assert_eq!(d.text(), "x");
        assert_eq!(d.cursor(), 1);
    }

    #[test]
    fn backspace_at_start_is_clean() {
        let mut d = doc("abc", 0);
        let r = handle_edit(EditKind::Backspace(3), &mut d).unwrap();
        assert_eq!(r, DispatchResult::clean());
        assert!(!d.can_undo());
    }

    #[test]
    fn delete_forward_stops_at_end() {
        let mut d = doc("abc", 1);
        handle_edit(EditKind::DeleteForward(10), &mut d).unwrap();
        assert_eq!(d.text(), "a");
        d.undo().unwrap();
        assert_eq!(d.text(), "abc");
    }

    #[test]
    fn paste_is_separate_from_typing() {
        let mut d = doc("", 0);
        handle_edit(EditKind::Type("ab".into()), &mut d).unwrap();
        handle_edit(EditKind::Paste("cd".into()), &mut d).unwrap();
        d.undo().unwrap();
        assert_eq!(d.text(), "ab");
    }
}
