use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::observer::{ActionRecord, Operation, PerformanceRecord};
use crate::request::CallContext;

/// Which of the two log files an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Actions,
    Performance,
}

impl LogKind {
    pub const ALL: [LogKind; 2] = [LogKind::Actions, LogKind::Performance];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Actions => "user-actions.log",
            Self::Performance => "performance.log",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Actions => "actions",
            Self::Performance => "performance",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of `user-actions.log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEntry {
    pub timestamp: DateTime<Utc>,
    pub action: Operation,
    #[serde(default)]
    pub context: CallContext,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl From<&ActionRecord> for ActionEntry {
    fn from(record: &ActionRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            action: record.operation,
            context: record.context.clone(),
            details: record.details.clone(),
        }
    }
}

/// One line of `performance.log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
    pub duration_ms: f64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub context: CallContext,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl From<&PerformanceRecord> for PerformanceEntry {
    fn from(record: &PerformanceRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            operation: record.operation,
            duration_ms: record.duration.as_secs_f64() * 1000.0,
            success: record.success,
            error: record.error.clone(),
            context: record.context.clone(),
            details: record.details.clone(),
        }
    }
}

/// An entry read back from either file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogEntry {
    Action(ActionEntry),
    Performance(PerformanceEntry),
}

impl LogEntry {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Action(entry) => entry.timestamp,
            Self::Performance(entry) => entry.timestamp,
        }
    }
}

/// Inclusive time window. Open bounds are unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| timestamp >= start)
            && self.end.map_or(true, |end| timestamp <= end)
    }
}

/// The tail of a filtered log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogPage {
    /// At most `limit` entries, oldest first.
    pub logs: Vec<LogEntry>,
    /// Entries inside the range before the limit was applied.
    pub total: usize,
    pub limit: usize,
}
