use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Local};

/// Keys are unique across every history in the process
static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Severity of a history record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form context attached to a record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryMeta {
    /// Object the event relates to
    pub pl_name: Option<String>,
    /// Source line the event relates to
    pub line: Option<u32>,
    /// Anything else worth showing next to the message
    pub extra: Option<String>,
}

impl HistoryMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pl_name(mut self, pl_name: impl Into<String>) -> Self {
        self.pl_name = Some(pl_name.into());
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }
}

/// One entry of the debug history
#[derive(Debug, Clone, PartialEq)]
pub struct DebugHistoryRecord {
    pub key: u64,
    pub timestamp: DateTime<Local>,
    pub meta: HistoryMeta,
    pub message: String,
    pub severity: Severity,
}

impl fmt::Display for DebugHistoryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.severity,
            self.message
        )?;
        match (&self.meta.pl_name, self.meta.line) {
            (Some(name), Some(line)) => write!(f, " ({}:{})", name, line),
            (Some(name), None) => write!(f, " ({})", name),
            (None, Some(line)) => write!(f, " (line {})", line),
            (None, None) => Ok(()),
        }
    }
}

/// Append-only event log of one debug session
#[derive(Debug, Clone, Default)]
pub struct DebugHistory {
    records: Vec<DebugHistoryRecord>,
}

impl DebugHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record stamped with the current time
    pub fn add_history(&mut self, meta: HistoryMeta, message: impl Into<String>, severity: Severity) -> u64 {
        let key = NEXT_KEY.fetch_add(1, Ordering::Relaxed);
        self.records.push(DebugHistoryRecord {
            key,
            timestamp: Local::now(),
            meta,
            message: message.into(),
            severity,
        });
        key
    }

    pub fn records(&self) -> &[DebugHistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records with [`Severity::Error`]
    pub fn errors(&self) -> impl Iterator<Item = &DebugHistoryRecord> {
        self.records.iter().filter(|r| r.severity == Severity::Error)
    }

    pub fn get_start_time(&self) -> Option<DateTime<Local>> {
        self.records.first().map(|r| r.timestamp)
    }

    pub fn get_end_time(&self) -> Option<DateTime<Local>> {
        self.records.last().map(|r| r.timestamp)
    }

    /// Time between the first and last record
    pub fn duration(&self) -> Option<Duration> {
        Some(self.get_end_time()? - self.get_start_time()?)
    }
}
