//! JSON-lines event log for API activity.
//!
//! Every call to [`EventLogger::log`] appends exactly one JSON object followed
//! by a newline. The object always carries the envelope keys `timestamp`,
//! `level`, `logger` and `message`. A [`LogPayload::Structured`] payload has
//! all of its keys merged into the object and leaves `message` empty.
//!
//! ```json
//! {"timestamp":"2025-01-01T10:00:00.000000Z","level":"INFO","logger":"sanrio_api","message":"","event":"request_completed","status_code":200}
//! ```
//!
//! This log is separate from the `tracing` diagnostics set up in
//! [`crate::logging`]; it is the audit stream of the API.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Default event log location.
pub const DEFAULT_LOG_PATH: &str = "/app/logs/api.log";

/// Default value of the `logger` envelope key.
pub const DEFAULT_LOGGER_NAME: &str = "sanrio_api";

/// Severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

/// What an event carries: free text, or fields to merge into the envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum LogPayload {
    Text(String),
    Structured(Map<String, Value>),
}

impl LogPayload {
    /// Wrap a JSON value; objects become [`LogPayload::Structured`], anything
    /// else is logged as its JSON text.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => LogPayload::Structured(fields),
            Value::String(text) => LogPayload::Text(text),
            other => LogPayload::Text(other.to_string()),
        }
    }
}

impl From<&str> for LogPayload {
    fn from(text: &str) -> Self {
        LogPayload::Text(text.to_string())
    }
}

impl From<String> for LogPayload {
    fn from(text: String) -> Self {
        LogPayload::Text(text)
    }
}

impl From<Map<String, Value>> for LogPayload {
    fn from(fields: Map<String, Value>) -> Self {
        LogPayload::Structured(fields)
    }
}

impl From<Value> for LogPayload {
    fn from(value: Value) -> Self {
        LogPayload::from_value(value)
    }
}

/// Render one event as a single JSON line (without the trailing newline).
pub fn render_event(
    logger: &str,
    level: LogLevel,
    payload: &LogPayload,
    at: DateTime<Utc>,
) -> String {
    let mut record = Map::new();
    record.insert(
        "timestamp".into(),
        Value::String(at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()),
    );
    record.insert("level".into(), Value::String(level.as_str().into()));
    record.insert("logger".into(), Value::String(logger.into()));

    match payload {
        LogPayload::Text(text) => {
            record.insert("message".into(), Value::String(text.clone()));
        }
        LogPayload::Structured(fields) => {
            for (key, value) in fields {
                record.insert(key.clone(), value.clone());
            }
            record.insert("message".into(), Value::String(String::new()));
        }
    }

    Value::Object(record).to_string()
}

/// Append-only JSON-lines event sink.
///
/// Created once at startup and shared behind an `Arc`. Lines from concurrent
/// requests never interleave; their relative order is unspecified.
#[derive(Debug)]
pub struct EventLogger {
    name: String,
    path: PathBuf,
    file: Mutex<File>,
}

impl EventLogger {
    /// Open (or create) the log file in append mode, creating parent
    /// directories as needed.
    pub fn open(path: impl AsRef<Path>, name: impl Into<String>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            name: name.into(),
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event. Write failures are reported via `tracing` and
    /// otherwise ignored so that logging never fails a request.
    pub fn log(&self, level: LogLevel, payload: impl Into<LogPayload>) {
        let mut line = render_event(&self.name, level, &payload.into(), Utc::now());
        tracing::debug!(target: "sanrio::events", level = level.as_str(), "{}", line);
        line.push('\n');

        let mut file = match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(err) = file.write_all(line.as_bytes()) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to write event log");
        }
    }

    pub fn info(&self, payload: impl Into<LogPayload>) {
        self.log(LogLevel::Info, payload);
    }

    pub fn warning(&self, payload: impl Into<LogPayload>) {
        self.log(LogLevel::Warning, payload);
    }

    pub fn error(&self, payload: impl Into<LogPayload>) {
        self.log(LogLevel::Error, payload);
    }
}
