//! Persistent audit trail of repository calls.
//!
//! `JsonLinesLog` is an `OperationObserver` that appends one JSON object per
//! line to `user-actions.log` (successful calls) and `performance.log`
//! (timings of every call), and reads them back for inspection.

mod entry;
mod journal;
mod stats;

pub use entry::{ActionEntry, LogEntry, LogKind, LogPage, PerformanceEntry, TimeRange};
pub use journal::{JsonLinesLog, PruneReport};
pub use stats::{LogStats, OperationTiming};
