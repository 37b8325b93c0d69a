//! Structured operational logging: one JSONL line per state transition,
//! fatal error, degraded collector path, or transport failure.
//!
//! Kept independent of [`crate::telemetry::output`]: that module writes the
//! telemetry/alert wire records the agent exists to produce, this one writes
//! diagnostics about the agent's own behavior. Falls back to stderr when the
//! primary log path can't be opened, mirroring the degradation chain this
//! codebase already uses for its append-only logs, but with the file and
//! stderr tiers only — there is no wire contract here that needs rotation or
//! a RAM-backed fallback tier.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use serde::Serialize;

/// Severity of a logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// Kinds of event the agent logs about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StateTransition,
    CollectorDegraded,
    TransportFailure,
    FatalError,
    ShutdownSaveFailure,
}

/// One operational log line.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub ts: String,
    pub event: EventKind,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl LogEntry {
    #[must_use]
    pub fn new(event: EventKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            message: message.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }
}

/// Writes [`LogEntry`] lines to a primary file, falling back to stderr if the
/// primary path can't be opened or a write fails.
pub struct Logger {
    file: Option<File>,
}

impl Logger {
    /// Open `path` for appending. If opening fails, the logger silently
    /// degrades to stderr-only — logging must never be able to crash the
    /// agent.
    #[must_use]
    pub fn open(path: Option<PathBuf>) -> Self {
        let file = path.and_then(|p| OpenOptions::new().create(true).append(true).open(p).ok());
        Self { file }
    }

    /// A logger that always writes to stderr.
    #[must_use]
    pub fn stderr_only() -> Self {
        Self { file: None }
    }

    /// Write one entry. Never panics or returns an error: a failure to log
    /// falls back to stderr, and a failure to write to stderr is discarded.
    pub fn log(&mut self, entry: &LogEntry) {
        let Ok(line) = serde_json::to_string(entry) else {
            let _ = writeln!(io::stderr(), "[AEG-LOG] failed to serialize log entry");
            return;
        };

        if let Some(file) = self.file.as_mut() {
            if writeln!(file, "{line}").is_ok() {
                return;
            }
        }
        let _ = writeln!(io::stderr(), "{line}");
    }

    pub fn info(&mut self, event: EventKind, message: impl Into<String>) {
        self.log(&LogEntry::new(event, Severity::Info, message));
    }

    pub fn warn(&mut self, event: EventKind, message: impl Into<String>) {
        self.log(&LogEntry::new(event, Severity::Warn, message));
    }

    pub fn error(&mut self, event: EventKind, message: impl Into<String>, code: &'static str) {
        self.log(&LogEntry::new(event, Severity::Error, message).with_code(code));
    }
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
