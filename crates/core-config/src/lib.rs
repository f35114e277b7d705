//! Configuration loading and parsing.
//!
//! Parses `rewind.toml` (or an override path supplied by the binary):
//!
//! ```toml
//! [history]
//! max_steps = 0        # 0 keeps every step
//! split_words = true   # word/whitespace transitions start a new undo step
//! ```
//!
//! Unknown fields are ignored so older binaries tolerate newer files. A file
//! that fails to parse falls back to defaults with a warning; a missing file
//! is not an error.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, io, path::PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "rewind.toml";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Upper bound on committed steps; 0 means unbounded.
    #[serde(default)]
    pub max_steps: usize,
    #[serde(default = "HistoryConfig::default_split_words")]
    pub split_words: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_steps: 0,
            split_words: Self::default_split_words(),
        }
    }
}

impl HistoryConfig {
    const fn default_split_words() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub path: Option<PathBuf>,
    pub file: ConfigFile, // parsed (or default) data
}

impl Config {
    pub fn history(&self) -> &HistoryConfig {
        &self.file.history
    }
}

/// Best-effort config path: `rewind.toml` in the working directory, then the
/// platform config dir (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("rewind").join(CONFIG_FILE_NAME);
    }
    local
}

/// Parse configuration from a TOML string.
pub fn parse(content: &str) -> Result<ConfigFile> {
    toml::from_str::<ConfigFile>(content).context("invalid rewind configuration")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(target: "config", path = %path.display(), "config_absent_using_defaults");
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("reading config {}", path.display()));
        }
    };
    match parse(&content) {
        Ok(file) => {
            info!(
                target: "config",
                path = %path.display(),
                max_steps = file.history.max_steps,
                split_words = file.history.split_words,
                "config_loaded"
            );
            Ok(Config {
                raw: Some(content),
                path: Some(path),
                file,
            })
        }
        Err(e) => {
            // Resilience: a broken file should not keep the editor from starting.
            warn!(target: "config", path = %path.display(), error = %format!("{e:#}"), "config_parse_failed");
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert_eq!(cfg.history().max_steps, 0);
        assert!(cfg.history().split_words);
        assert!(cfg.raw.is_none());
    }

    #[test]
    fn parses_history_section() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[history]\nmax_steps = 25\nsplit_words = false\n").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.history().max_steps, 25);
        assert!(!cfg.history().split_words);
        assert_eq!(cfg.path.as_deref(), Some(tmp.path()));
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let file = parse("[history]\nmax_steps = 3\n").unwrap();
        assert_eq!(file.history.max_steps, 3);
        assert!(file.history.split_words);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let file = parse("[history]\nsplit_words = false\n[editor]\ntheme = \"dark\"\n").unwrap();
        assert!(!file.history.split_words);
    }

    #[test]
    fn parse_error_falls_back_to_defaults_and_warns() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[history]\nmax_steps = \"many\"\n").unwrap();
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        let cfg = with_default(subscriber, || {
            load_from(Some(tmp.path().to_path_buf())).unwrap()
        });

        assert_eq!(cfg.history(), &HistoryConfig::default());
        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("WARN config:"));
        assert!(log_output.contains("config_parse_failed"));
    }
}
