//! The log line model shared by every stage of the viewer.
//!
//! Sources hand over [`RawLine`]s, loosely-typed payloads already folded into a
//! fixed shape. The [`LineBuffer`](crate::buffer::LineBuffer) turns them into
//! [`LogLine`]s by stamping a sequence number; after that a line is never mutated.

use crate::ansi;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::SystemTime;

/// Severity carried by a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Warn,
    Error,
    Verbose,
}

impl LogLevel {
    /// Map a free-form level name onto the four known levels.
    ///
    /// Deploy logs use `debug|log|step|success|error`, container streams use the
    /// short names; anything unrecognized is `Info`.
    pub fn parse_lenient(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "error" | "err" | "fatal" | "critical" => LogLevel::Error,
            "warn" | "warning" => LogLevel::Warn,
            "verbose" | "debug" | "trace" => LogLevel::Verbose,
            _ => LogLevel::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Verbose => "verbose",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized line as delivered by a source, before it has a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawLine {
    pub level: LogLevel,
    /// Source-side time in epoch milliseconds, when the payload carries one
    pub timestamp: Option<i64>,
    pub text: String,
}

impl RawLine {
    pub fn new(level: LogLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: None,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, text)
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Fold an arbitrary transport payload into a line.
    ///
    /// Accepted shapes:
    /// - `"text"`
    /// - `[level, time, text]`, `[level, text]` or `[text]`
    /// - `{ "level": .., "time": .., "text" | "line" | "message": .. }`
    /// - `{ "data": <any of the above> }`
    ///
    /// Nothing is rejected: missing text becomes `""` and unknown levels become `Info`.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::from_array(items),
            Value::Object(map) => Self::from_object(map),
            other => Self::info(value_text(Some(other))),
        }
    }

    fn from_array(items: &[Value]) -> Self {
        match items {
            [] => Self::default(),
            [text] => Self::info(value_text(Some(text))),
            [level, text] => Self::new(value_level(Some(level)), value_text(Some(text))),
            [level, time, text, ..] => Self {
                level: value_level(Some(level)),
                timestamp: value_time(Some(time)),
                text: value_text(Some(text)),
            },
        }
    }

    fn from_object(map: &Map<String, Value>) -> Self {
        let text = ["text", "line", "message", "msg"]
            .iter()
            .find_map(|key| map.get(*key));

        if text.is_none() {
            if let Some(inner) = map.get("data") {
                return Self::from_value(inner);
            }
        }

        Self {
            level: value_level(map.get("level")),
            timestamp: value_time(map.get("time").or_else(|| map.get("timestamp"))),
            text: value_text(text),
        }
    }
}

fn value_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn value_level(value: Option<&Value>) -> LogLevel {
    value
        .and_then(Value::as_str)
        .map(LogLevel::parse_lenient)
        .unwrap_or_default()
}

fn value_time(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A buffered log line. Created once by the line buffer, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    /// Position in the session's total order, gapless until the buffer resets
    pub sequence: u64,
    pub level: LogLevel,
    /// Raw content; may contain escape codes
    pub text: String,
    pub timestamp: Option<i64>,
    /// Local arrival time
    pub received_at: SystemTime,
    search_key: String,
}

impl LogLine {
    pub(crate) fn from_raw(sequence: u64, raw: RawLine, received_at: SystemTime) -> Self {
        let search_key = ansi::search_key(&raw.text);
        Self {
            sequence,
            level: raw.level,
            text: raw.text,
            timestamp: raw.timestamp,
            received_at,
            search_key,
        }
    }

    /// Uppercased text with escape codes removed.
    pub fn search_key(&self) -> &str {
        &self.search_key
    }

    /// Whether the line contains an already normalized query.
    pub fn matches(&self, normalized_query: &str) -> bool {
        self.search_key.contains(normalized_query)
    }
}
