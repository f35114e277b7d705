//! Edit script parsing.
//!
//! One command per line; blank lines and `#` comments are skipped. Parsing
//! never touches a document; [`execute`] runs the parsed commands.
//!
//! ```text
//! type hello\n        # one user action per character
//! paste some text     # one multi-character insert
//! backspace 3
//! replace-all foo bar
//! undo
//! print
//! ```
//!
//! Text arguments accept the escapes `\n`, `\t`, `\s` (space) and `\\`.

use crate::{Action, ActionObserver, EditKind, MotionKind, dispatch};
use anyhow::Context;
use core_state::Document;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    Action(Action),
    /// Emit the current text.
    Print,
    /// Emit cursor and history availability.
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("line {line}: unknown command `{command}`")]
    UnknownCommand { line: usize, command: String },
    #[error("line {line}: `{command}` needs an argument")]
    MissingArgument { line: usize, command: String },
    #[error("line {line}: `{value}` is not a valid count or offset")]
    InvalidNumber { line: usize, value: String },
}

/// Parse a whole script. Lines are numbered from 1.
pub fn parse_script(source: &str) -> Result<Vec<(usize, ScriptCommand)>, ScriptError> {
    let mut out = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        if let Some(cmd) = parse_line(idx + 1, raw)? {
            out.push((idx + 1, cmd));
        }
    }
    Ok(out)
}

/// Parse one line; `Ok(None)` for blanks and comments.
pub fn parse_line(line: usize, raw: &str) -> Result<Option<ScriptCommand>, ScriptError> {
    let s = raw.trim_end_matches('\r').trim_start();
    if s.is_empty() || s.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = match s.char_indices().find(|(_, c)| c.is_whitespace()) {
        Some((i, sep)) => (&s[..i], &s[i + sep.len_utf8()..]),
        None => (s, ""),
    };
    let missing = || ScriptError::MissingArgument {
        line,
        command: word.to_string(),
    };

    let cmd = match word {
        "type" | "paste" => {
            if rest.is_empty() {
                return Err(missing());
            }
            let text = unescape(rest);
            let kind = if word == "type" {
                EditKind::Type(text)
            } else {
                EditKind::Paste(text)
            };
            ScriptCommand::Action(Action::Edit(kind))
        }
        "backspace" => edit(EditKind::Backspace(count(line, rest)?)),
        "delete" => edit(EditKind::DeleteForward(count(line, rest)?)),
        "move" => {
            let arg = rest.trim();
            if arg.is_empty() {
                return Err(missing());
            }
            motion(MotionKind::To(number(line, arg)?))
        }
        "left" => motion(MotionKind::Left(count(line, rest)?)),
        "right" => motion(MotionKind::Right(count(line, rest)?)),
        "home" => motion(MotionKind::LineStart),
        "end" => motion(MotionKind::LineEnd),
        "top" => motion(MotionKind::BufferStart),
        "bottom" => motion(MotionKind::BufferEnd),
        "replace-all" => {
            let mut args = rest.split_whitespace();
            let find = args.next().map(unescape).ok_or_else(missing)?;
            let replacement = args.next().map(unescape).unwrap_or_default();
            ScriptCommand::Action(Action::ReplaceAll { find, replacement })
        }
        "undo" => ScriptCommand::Action(Action::Undo {
            count: count(line, rest)?,
        }),
        "redo" => ScriptCommand::Action(Action::Redo {
            count: count(line, rest)?,
        }),
        "clear-history" => ScriptCommand::Action(Action::ClearHistory),
        "reload" => ScriptCommand::Action(Action::Reload),
        "write" => {
            let arg = rest.trim();
            let target = (!arg.is_empty()).then(|| PathBuf::from(arg));
            ScriptCommand::Action(Action::Write(target))
        }
        "print" => ScriptCommand::Print,
        "status" => ScriptCommand::Status,
        other => {
            return Err(ScriptError::UnknownCommand {
                line,
                command: other.to_string(),
            });
        }
    };
    Ok(Some(cmd))
}

/// Counts reported after a script run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptSummary {
    pub actions: usize,
    pub changed: usize,
}

/// Run parsed commands against `doc`. `print` and `status` write to `out`.
pub fn execute(
    commands: &[(usize, ScriptCommand)],
    doc: &mut Document,
    observers: &[Box<dyn ActionObserver>],
    out: &mut dyn Write,
) -> anyhow::Result<ScriptSummary> {
    let mut summary = ScriptSummary::default();
    for (line, cmd) in commands {
        match cmd {
            ScriptCommand::Action(action) => {
                let result = dispatch(action.clone(), doc, observers)
                    .with_context(|| format!("line {line}"))?;
                summary.actions += 1;
                if result.dirty {
                    summary.changed += 1;
                }
            }
            ScriptCommand::Print => {
                writeln!(out, "{}", doc.text()).context("writing script output")?;
            }
            ScriptCommand::Status => {
                let history = doc.history();
                writeln!(
                    out,
                    "cursor={} can_undo={} can_redo={} steps={} needle={}",
                    doc.cursor(),
                    doc.can_undo(),
                    doc.can_redo(),
                    history.steps().len(),
                    history.needle()
                )
                .context("writing script output")?;
            }
        }
    }
    tracing::debug!(target: "actions.dispatch", actions = summary.actions, changed = summary.changed, "script_finished");
    Ok(summary)
}

fn edit(kind: EditKind) -> ScriptCommand {
    ScriptCommand::Action(Action::Edit(kind))
}

fn motion(kind: MotionKind) -> ScriptCommand {
    ScriptCommand::Action(Action::Motion(kind))
}

/// Optional repeat count, 1 when absent.
fn count(line: usize, rest: &str) -> Result<usize, ScriptError> {
    let arg = rest.trim();
    if arg.is_empty() {
        Ok(1)
    } else {
        number(line, arg)
    }
}

fn number(line: usize, arg: &str) -> Result<usize, ScriptError> {
    arg.parse().map_err(|_| ScriptError::InvalidNumber {
        line,
        value: arg.to_string(),
    })
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('s') => out.push(' '),
            Some('\\') => out.push('\\'),
            // Unknown escapes stay literal.
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
