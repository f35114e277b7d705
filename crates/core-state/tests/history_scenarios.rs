//! End-to-end history scenarios driven through `Document`, the way an editor front end does.

use core_events::{HistoryEvent, history_channel, telemetry_snapshot};
use core_state::{Document, HistoryLimits, StepAction};
use core_text::Buffer;
use pretty_assertions::assert_eq;

fn doc(text: &str) -> Document {
    Document::new(Buffer::from_text("scenario", text))
}

/// One keystroke = one user action, like a GUI key handler.
fn type_str(doc: &mut Document, text: &str) {
    for ch in text.chars() {
        doc.user_action(|d| {
            let at = d.cursor();
            d.insert(at, &ch.to_string()).unwrap();
        });
    }
}

fn backspace(doc: &mut Document, times: usize) {
    for _ in 0..times {
        doc.user_action(|d| {
            let at = d.cursor();
            d.delete(at - 1, at).unwrap();
        });
    }
}

#[test]
fn typed_word_is_one_step() {
    let mut d = doc("");
    type_str(&mut d, "hello");
    assert!(d.undo().unwrap());
    assert_eq!(d.text(), "");
    assert!(!d.can_undo());
    assert_eq!(d.history().steps().len(), 1);
}

#[test]
fn space_does_not_merge_into_following_word() {
    let mut d = doc("");
    type_str(&mut d, "foo bar");
    d.undo().unwrap();
    assert_eq!(d.text(), "foo ");
}

#[test]
fn backspace_over_word_stores_text_in_order() {
    let mut d = doc("hello");
    d.set_cursor(5);
    backspace(&mut d, 5);
    assert_eq!(d.text(), "");
    d.undo().unwrap();
    assert_eq!(d.text(), "hello");
    let step = &d.history().steps()[0];
    assert_eq!(step.action(), StepAction::Delete);
    assert_eq!(step.text(), Some("hello"));
}

#[test]
fn replace_all_is_one_undo_and_one_redo() {
    let mut d = doc("cat hat bat");
    d.grouped(|d| {
        for at in [0, 4, 8] {
            d.replace(at, at + 1, "r").unwrap();
        }
    });
    assert_eq!(d.text(), "rat rat rat");
    assert!(d.undo().unwrap());
    assert_eq!(d.text(), "cat hat bat");
    assert!(!d.can_undo());
    assert!(d.redo().unwrap());
    assert_eq!(d.text(), "rat rat rat");
    assert!(!d.can_redo());
}

#[test]
fn new_edit_after_undo_invalidates_redo() {
    let mut d = doc("");
    type_str(&mut d, "first second");
    d.undo().unwrap();
    assert!(d.can_redo());
    type_str(&mut d, "x");
    assert!(!d.can_redo());
    assert!(!d.redo().unwrap());
    assert_eq!(d.text(), "first x");
    d.undo().unwrap();
    d.undo().unwrap();
    assert_eq!(d.text(), "");
    // "second" never comes back.
    while d.redo().unwrap() {}
    assert_eq!(d.text(), "first x");
}

#[test]
fn lock_suppresses_recording_until_unlock() {
    let mut d = doc("");
    d.history_mut().lock();
    d.insert(0, "bulk load").unwrap();
    assert!(!d.can_undo());
    assert!(!d.can_redo());
    d.history_mut().unlock();
    type_str(&mut d, "!");
    assert!(d.can_undo());
    d.undo().unwrap();
    // The unrecorded text survives: only "!" was history.
    assert_eq!(d.text(), "bulk load");
    assert!(!d.can_undo());
}

#[test]
fn abc_concrete_scenario() {
    let mut d = doc("");
    d.insert(0, "a").unwrap();
    d.insert(1, "b").unwrap();
    d.insert(2, "c").unwrap();
    assert!(d.can_undo());
    assert!(d.undo().unwrap());
    assert_eq!(d.text(), "");
    assert!(!d.can_undo());
    assert!(d.can_redo());
    let step = &d.history().steps()[0];
    assert_eq!(step.range(), 0..3);
    assert_eq!(step.text(), Some("abc"));
    assert!(d.redo().unwrap());
    assert_eq!(d.text(), "abc");
    assert!(!d.can_redo());
}

#[test]
fn paste_replacing_selection_undoes_together() {
    let mut d = doc("keep OLD keep");
    d.user_action(|d| {
        d.delete(5, 8).unwrap();
        d.insert(5, "NEW TEXT").unwrap();
    });
    assert_eq!(d.text(), "keep NEW TEXT keep");
    d.undo().unwrap();
    assert_eq!(d.text(), "keep OLD keep");
}

#[test]
fn channel_observer_tracks_menu_state() {
    let mut d = doc("");
    let (sink, rx) = history_channel();
    d.connect(sink);
    type_str(&mut d, "ab");
    d.undo().unwrap();
    d.redo().unwrap();
    let events: Vec<HistoryEvent> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![
            HistoryEvent::CanUndo(true),
            HistoryEvent::CanUndo(false),
            HistoryEvent::CanRedo(true),
            HistoryEvent::CanUndo(true),
            HistoryEvent::CanRedo(false),
        ]
    );
}

#[test]
fn bounded_history_forgets_oldest() {
    let mut d = Document::with_limits(
        Buffer::from_text("bounded", ""),
        HistoryLimits {
            max_steps: 3,
            split_words: true,
        },
    );
    type_str(&mut d, "a b c d e ");
    let mut undos = 0;
    while d.undo().unwrap() {
        undos += 1;
    }
    assert_eq!(undos, 3);
    assert_eq!(d.text(), "a b ");
}

#[test]
fn telemetry_counts_committed_and_undone_steps() {
    let before = telemetry_snapshot();
    let mut d = doc("");
    type_str(&mut d, "one two");
    d.undo().unwrap();
    let after = telemetry_snapshot();
    assert!(after.steps_committed >= before.steps_committed + 2);
    assert!(after.steps_undone > before.steps_undone);
}

#[test]
fn reload_clears_history() {
    let mut d = doc("draft");
    type_str(&mut d, "!");
    d.load_text("from disk");
    assert!(!d.can_undo());
    assert!(!d.undo().unwrap());
    assert_eq!(d.text(), "from disk");
}

#[test]
fn user_action_containing_replace_undoes_at_once() {
    let mut d = doc("hello world");
    d.user_action(|d| {
        d.replace(0, 5, "HELLO").unwrap();
        d.insert(11, "!").unwrap();
    });
    assert_eq!(d.text(), "HELLO world!");
    assert!(d.undo().unwrap());
    assert_eq!(d.text(), "hello world");
    assert!(!d.can_undo());
    assert!(d.redo().unwrap());
    assert_eq!(d.text(), "HELLO world!");
    assert!(!d.can_redo());
}

#[test]
fn nested_groups_undo_and_redo_as_one() {
    let mut d = doc("one two three");
    d.grouped(|d| {
        d.replace(0, 3, "1").unwrap();
        d.grouped(|d| {
            assert_eq!(d.history().group_depth(), 2);
            d.replace(2, 5, "2").unwrap();
        });
        // Inner end_group does not commit the group.
        assert_eq!(d.history().group_depth(), 1);
        d.replace(4, 9, "3").unwrap();
    });
    assert_eq!(d.text(), "1 2 3");
    assert_eq!(d.history().group_depth(), 0);
    assert!(d.undo().unwrap());
    assert_eq!(d.text(), "one two three");
    assert!(!d.can_undo());
    assert!(d.redo().unwrap());
    assert_eq!(d.text(), "1 2 3");
    assert!(!d.can_redo());
}
