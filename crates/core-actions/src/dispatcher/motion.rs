//! Cursor movement. Never touches the text or the history.

use super::DispatchResult;
use crate::MotionKind;
use core_state::Document;

pub(crate) fn handle_motion(kind: MotionKind, doc: &mut Document) -> DispatchResult {
    let before = doc.cursor();
    let target = {
        let buf = doc.buffer();
        match kind {
            MotionKind::To(offset) => offset.min(doc.len_chars()),
            MotionKind::Left(n) => (0..n).fold(before, |at, _| buf.prev_grapheme_offset(at)),
            MotionKind::Right(n) => (0..n).fold(before, |at, _| buf.next_grapheme_offset(at)),
            MotionKind::LineStart => buf.line_range(buf.position_of(before).line).start,
            MotionKind::LineEnd => buf.line_range(buf.position_of(before).line).end,
            MotionKind::BufferStart => 0,
            MotionKind::BufferEnd => doc.len_chars(),
        }
    };
    doc.set_cursor(target);
    tracing::trace!(target: "actions.dispatch", ?kind, from = before, to = target, "motion");
    DispatchResult::from_changed(before != target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::Buffer;

    #[test]
    fn line_motions_stay_on_current_line() {
        let mut d = Document::new(Buffer::from_text("m", "one\ntwo\nthree"));
        d.set_cursor(5);
        handle_motion(MotionKind::LineEnd, &mut d);
        assert_eq!(d.cursor(), 7);
        handle_motion(MotionKind::LineStart, &mut d);
        assert_eq!(d.cursor(), 4);
    }

    #[test]
    fn horizontal_motion_clamps() {
        let mut d = Document::new(Buffer::from_text("m", "ab"));
        handle_motion(MotionKind::Right(9), &mut d);
        assert_eq!(d.cursor(), 2);
        let r = handle_motion(MotionKind::To(99), &mut d);
        assert_eq!(r, DispatchResult::clean());
        handle_motion(MotionKind::Left(1), &mut d);
        assert_eq!(d.cursor(), 1);
    }
}
