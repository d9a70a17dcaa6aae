//! Diagnostic logging collaborator.
//!
//! Components receive an `Arc<dyn Logger>` instead of reaching for a global.
//! `DiagnosticLog` forwards every event to `tracing` and, when enabled, appends
//! one human-readable line per event to a log file that is never read back.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{debug, error, info, warn};

use crate::utils::ensure_parent_directory;

/// Severity of a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Log,
    Debug,
    Warn,
    Error,
}

impl LogLevel {
    /// Short tag used in the log file prefix.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Debug => "dbg",
            Self::Warn => "wrn",
            Self::Error => "err",
        }
    }
}

/// Sink for diagnostic events.
///
/// Implementors only provide `record`; the level helpers forward to it.
pub trait Logger: Send + Sync {
    fn record(&self, level: LogLevel, message: &str, extra: Option<&Value>);

    fn log(&self, message: &str, extra: Option<&Value>) {
        self.record(LogLevel::Log, message, extra);
    }

    fn debug(&self, message: &str, extra: Option<&Value>) {
        self.record(LogLevel::Debug, message, extra);
    }

    fn warn(&self, message: &str, extra: Option<&Value>) {
        self.record(LogLevel::Warn, message, extra);
    }

    fn error(&self, message: &str, extra: Option<&Value>) {
        self.record(LogLevel::Error, message, extra);
    }
}

/// Logger that forwards to `tracing` and optionally appends to a file.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    file: Option<PathBuf>,
}

impl DiagnosticLog {
    /// Creates a logger that only forwards to `tracing`.
    pub fn tracing_only() -> Self {
        Self { file: None }
    }

    /// Creates a logger that also appends to `path`, creating its directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn with_file(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        ensure_parent_directory(&path)?;
        Ok(Self { file: Some(path) })
    }

    /// Path of the log file, if file output is enabled.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    fn append(&self, path: &Path, line: &str) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "{line}"));

        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "failed to append to diagnostic log");
        }
    }
}

impl Logger for DiagnosticLog {
    fn record(&self, level: LogLevel, message: &str, extra: Option<&Value>) {
        let extra_json = extra.map(Value::to_string).unwrap_or_default();

        match level {
            LogLevel::Log => info!(extra = %extra_json, "{message}"),
            LogLevel::Debug => debug!(extra = %extra_json, "{message}"),
            LogLevel::Warn => warn!(extra = %extra_json, "{message}"),
            LogLevel::Error => error!(extra = %extra_json, "{message}"),
        }

        if let Some(path) = &self.file {
            let line = format_line(&timestamp_now(), level, message, extra);
            self.append(path, &line);
        }
    }
}

fn timestamp_now() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_default()
}

/// Renders one log file line: `[timestamp] [autotag][lvl] message {extra}`.
pub fn format_line(timestamp: &str, level: LogLevel, message: &str, extra: Option<&Value>) -> String {
    match extra {
        Some(extra) => format!("[{timestamp}] [autotag][{}] {message} {extra}", level.tag()),
        None => format!("[{timestamp}] [autotag][{}] {message}", level.tag()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[test]
    fn format_line_with_and_without_extra() {
        let extra = json!({"tags": ["rust"]});
        assert_eq!(
            format_line("2024-01-02 03:04:05", LogLevel::Warn, "careful", Some(&extra)),
            r#"[2024-01-02 03:04:05] [autotag][wrn] careful {"tags":["rust"]}"#
        );
        assert_eq!(
            format_line("2024-01-02 03:04:05", LogLevel::Log, "hello", None),
            "[2024-01-02 03:04:05] [autotag][log] hello"
        );
    }

    #[test]
    fn level_tags() {
        assert_eq!(LogLevel::Log.tag(), "log");
        assert_eq!(LogLevel::Debug.tag(), "dbg");
        assert_eq!(LogLevel::Warn.tag(), "wrn");
        assert_eq!(LogLevel::Error.tag(), "err");
    }

    #[test]
    fn file_logger_appends_one_line_per_event() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs").join("autotag.log");
        let logger = DiagnosticLog::with_file(&path).unwrap();

        logger.log("first", None);
        logger.error("second", Some(&json!({"code": "x"})));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] [autotag][log] first"));
        assert!(lines[1].ends_with(r#"] [autotag][err] second {"code":"x"}"#));
    }

    #[test]
    fn timestamp_has_expected_shape() {
        let ts = timestamp_now();
        assert_eq!(ts.len(), "2024-01-02 03:04:05".len());
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], " ");
    }

    #[test]
    fn tracing_only_logger_writes_no_file() {
        let logger = DiagnosticLog::tracing_only();
        assert!(logger.file().is_none());
        logger.debug("nothing on disk", None);
    }

    #[test]
    fn default_methods_forward_to_record() {
        struct Capture(Mutex<Vec<LogLevel>>);
        impl Logger for Capture {
            fn record(&self, level: LogLevel, _message: &str, _extra: Option<&Value>) {
                self.0.lock().unwrap().push(level);
            }
        }

        let capture = Capture(Mutex::new(Vec::new()));
        capture.log("a", None);
        capture.debug("b", None);
        capture.warn("c", None);
        capture.error("d", None);

        assert_eq!(
            *capture.0.lock().unwrap(),
            vec![LogLevel::Log, LogLevel::Debug, LogLevel::Warn, LogLevel::Error]
        );
    }
}
