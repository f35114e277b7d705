//! Property-based tests for history replay (invertibility and undo/redo round trips).

use core_state::Document;
use core_text::Buffer;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Type(char),
    Paste(String),
    Backspace,
    DeleteForward,
    Move(usize),
    ReplaceAll(char, String),
    Undo,
    Redo,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let ch = prop::sample::select(vec!['a', 'b', 'z', ' ', '\t', '\n', 'é', '字']);
    prop_oneof![
        6 => ch.clone().prop_map(Op::Type),
        1 => "[a-c \n]{2,6}".prop_map(Op::Paste),
        2 => Just(Op::Backspace),
        1 => Just(Op::DeleteForward),
        1 => (0usize..64).prop_map(Op::Move),
        1 => (ch, "[xy]{0,3}").prop_map(|(c, s)| Op::ReplaceAll(c, s)),
        1 => Just(Op::Undo),
        1 => Just(Op::Redo),
    ]
}

/// Drive the document the way a front end would: each op is one user action.
fn apply(doc: &mut Document, op: &Op) {
    match op {
        Op::Type(c) => doc.user_action(|d| {
            let at = d.cursor();
            d.insert(at, &c.to_string()).unwrap();
        }),
        Op::Paste(s) => doc.user_action(|d| {
            let at = d.cursor();
            d.insert(at, s).unwrap();
        }),
        Op::Backspace => doc.user_action(|d| {
            let at = d.cursor();
            if at > 0 {
                d.delete(at - 1, at).unwrap();
            }
        }),
        Op::DeleteForward => doc.user_action(|d| {
            let at = d.cursor();
            if at < d.len_chars() {
                d.delete(at, at + 1).unwrap();
            }
        }),
        Op::Move(n) => {
            let len = doc.len_chars();
            doc.set_cursor(n % (len + 1));
        }
        Op::ReplaceAll(find, with) => {
            let hits: Vec<usize> = doc
                .text()
                .chars()
                .enumerate()
                .filter(|(_, c)| c == find)
                .map(|(i, _)| i)
                .collect();
            let shift = with.chars().count() as isize - 1;
            doc.grouped(|d| {
                for (n, hit) in hits.iter().enumerate() {
                    let at = (*hit as isize + shift * n as isize) as usize;
                    d.replace(at, at + 1, with).unwrap();
                }
            });
        }
        Op::Undo => {
            doc.undo().unwrap();
        }
        Op::Redo => {
            doc.redo().unwrap();
        }
    }
}

proptest! {
    // Undoing until nothing is left restores the initial text.
    #[test]
    fn undo_all_restores_initial(initial in "[a-c \n]{0,12}", ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut doc = Document::new(Buffer::from_text("p", &initial));
        for op in &ops {
            apply(&mut doc, op);
        }
        let mut guard = 0;
        while doc.can_undo() {
            prop_assert!(doc.undo().unwrap());
            guard += 1;
            prop_assert!(guard <= ops.len() * 8 + 1, "undo did not terminate");
        }
        prop_assert_eq!(doc.text(), initial);
    }

    // At every reachable position, undo followed by redo is the identity.
    #[test]
    fn undo_redo_round_trip(initial in "[a-c ]{0,8}", ops in prop::collection::vec(op_strategy(), 1..30)) {
        let mut doc = Document::new(Buffer::from_text("p", &initial));
        for op in &ops {
            apply(&mut doc, op);
        }
        while doc.can_undo() {
            let before = doc.text();
            prop_assert!(doc.undo().unwrap());
            let undone = doc.text();
            prop_assert!(doc.can_redo());
            prop_assert!(doc.redo().unwrap());
            prop_assert_eq!(doc.text(), before);
            prop_assert!(doc.undo().unwrap());
            prop_assert_eq!(doc.text(), undone);
        }
    }

    // Redo all the way forward after undoing everything reproduces the final text.
    #[test]
    fn redo_all_reproduces_final(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let mut doc = Document::new(Buffer::from_text("p", ""));
        for op in &ops {
            apply(&mut doc, op);
        }
        // Undo ops may have left redoable steps; the tip of history is the reference.
        while doc.can_redo() {
            doc.redo().unwrap();
        }
        let last = doc.text();
        while doc.can_undo() {
            doc.undo().unwrap();
        }
        while doc.can_redo() {
            doc.redo().unwrap();
        }
        prop_assert_eq!(doc.text(), last);
        prop_assert!(!doc.can_redo());
    }
}
