//! Rewind entrypoint: open a file, run an edit script against it, emit the result.
use anyhow::{Context, Result};
use clap::Parser;
use core_actions::{ScriptSummary, execute, io_ops, parse_script};
use core_config::{Config, HistoryConfig, load_from};
use core_events::{HistoryEvent, telemetry_snapshot};
use core_state::{Document, HistoryLimits};
use core_text::Buffer;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

const DEFAULT_LOG_FILE: &str = "rewind.log";

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "rewind", version, about = "Scripted text editing with undo/redo history")]
struct Args {
    /// File to edit. Without it the script runs against an empty document.
    pub path: Option<PathBuf>,
    /// Edit script to run (one command per line). Read from stdin when omitted.
    #[arg(long = "script")]
    pub script: Option<PathBuf>,
    /// Configuration file path (overrides discovery of `rewind.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Write the final text here instead of printing it.
    #[arg(long = "output")]
    pub output: Option<PathBuf>,
    /// Log file (truncated on startup).
    #[arg(long = "log-file", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn configure_logging(&mut self, log_path: &Path) -> Result<()> {
        if log_path.exists() {
            let _ = std::fs::remove_file(log_path);
        }
        let dir = match log_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let file_name = log_path
            .file_name()
            .context("log file path has no file name")?;

        let file_appender = tracing_appender::rolling::never(dir, file_name);
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .with_ansi(false)
            .try_init()
        {
            Ok(_) => {
                self.log_guard = Some(guard);
            }
            Err(_err) => {
                // A global subscriber is already installed; the guard drops here.
            }
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

fn history_limits(cfg: &HistoryConfig) -> HistoryLimits {
    HistoryLimits {
        max_steps: cfg.max_steps,
        split_words: cfg.split_words,
    }
}

/// Open `path` if it exists; a missing file starts an empty document that
/// will be saved under that name.
fn load_document(path: Option<&Path>, limits: HistoryLimits) -> Result<Document> {
    let Some(path) = path else {
        return Ok(Document::with_limits(Buffer::new("untitled"), limits));
    };
    if path.exists() {
        return io_ops::open_document(path, limits);
    }
    warn!(target: "io", path = %path.display(), "file_missing_new_document");
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .to_string();
    let mut doc = Document::with_limits(Buffer::new(name), limits);
    doc.file_name = Some(path.to_path_buf());
    Ok(doc)
}

fn read_script(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p)
            .with_context(|| format!("reading script {}", p.display())),
        None => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .context("reading script from stdin")?;
            Ok(source)
        }
    }
}

/// Run `source` against `doc`, writing `print`/`status` output to `out`.
fn run_script(doc: &mut Document, source: &str, out: &mut dyn Write) -> Result<ScriptSummary> {
    let commands = parse_script(source)?;
    info!(target: "runtime", commands = commands.len(), "script_parsed");
    execute(&commands, doc, &[], out)
}

fn emit_result(doc: &mut Document, output: Option<&Path>, out: &mut dyn Write) -> Result<()> {
    match output {
        Some(path) => {
            io_ops::write_file(doc, Some(path))?;
        }
        None => {
            out.write_all(io_ops::serialize(doc).as_bytes())
                .context("writing result")?;
            out.flush().context("flushing result")?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut startup = AppStartup::new();
    startup.configure_logging(&args.log_file)?;
    AppStartup::install_panic_hook();
    info!(target: "runtime", "startup");

    let config: Config = load_from(args.config.clone())?;
    let limits = history_limits(config.history());
    info!(
        target: "runtime",
        config_path = config.path.as_ref().map(|p| p.display().to_string()),
        max_steps = limits.max_steps,
        split_words = limits.split_words,
        "config_applied"
    );

    let mut doc = load_document(args.path.as_deref(), limits)?;
    doc.connect(|ev: &HistoryEvent| {
        tracing::debug!(target: "events", event = ?ev, "history_availability");
    });

    let source = read_script(args.script.as_deref())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = run_script(&mut doc, &source, &mut out)?;
    emit_result(&mut doc, args.output.as_deref(), &mut out)?;

    let telemetry = telemetry_snapshot();
    info!(
        target: "runtime",
        actions = summary.actions,
        changed = summary.changed,
        steps_committed = telemetry.steps_committed,
        steps_undone = telemetry.steps_undone,
        steps_redone = telemetry.steps_redone,
        "shutdown"
    );
    Ok(())
}
