//! JSON-lines journal behind a writer thread.
//!
//! Callers only enqueue. All file mutations (appends, flushes, pruning) run
//! on the writer thread in submission order, so a prune never races with an
//! append. Reads go straight to disk after a flush.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use super::entry::{ActionEntry, LogEntry, LogKind, LogPage, PerformanceEntry, TimeRange};
use super::stats::LogStats;
use crate::error::{RepositoryError, Result};
use crate::observer::{ActionRecord, OperationObserver, PerformanceRecord};

/// Lines removed by one prune.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneReport {
    pub actions_removed: usize,
    pub performance_removed: usize,
}

enum Command {
    Append { kind: LogKind, line: String },
    Flush(oneshot::Sender<()>),
    Prune {
        cutoff: DateTime<Utc>,
        reply: oneshot::Sender<Result<PruneReport>>,
    },
}

/// Observer that appends every record to `user-actions.log` or
/// `performance.log` in one directory.
///
/// `flush`, `read`, `stats` and `prune` block the calling thread and must
/// not be called from inside an async runtime.
pub struct JsonLinesLog {
    dir: PathBuf,
    sender: Mutex<Option<mpsc::UnboundedSender<Command>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for JsonLinesLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesLog")
            .field("dir", &self.dir)
            .finish()
    }
}

impl JsonLinesLog {
    /// Creates `dir` if needed and starts the writer thread.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let writer = Writer::new(dir.clone());
        let handle = thread::Builder::new()
            .name("itemdeck-audit".to_string())
            .spawn(move || writer.run(receiver))?;

        log::info!("audit log opened dir={}", dir.display());

        Ok(Self {
            dir,
            sender: Mutex::new(Some(sender)),
            writer: Mutex::new(Some(handle)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, kind: LogKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Blocks until everything enqueued before this call is on disk.
    pub fn flush(&self) -> Result<()> {
        let (reply, done) = oneshot::channel();
        self.send(Command::Flush(reply))?;
        done.blocking_recv()
            .map_err(|_| RepositoryError::Internal("audit writer dropped flush".to_string()))
    }

    /// The last `limit` entries of one file inside `range`. Lines that do
    /// not parse are skipped.
    pub fn read(&self, kind: LogKind, range: TimeRange, limit: usize) -> Result<LogPage> {
        self.flush()?;
        let mut logs: Vec<LogEntry> = match kind {
            LogKind::Actions => read_entries::<ActionEntry>(&self.path(kind))?
                .into_iter()
                .map(LogEntry::Action)
                .collect(),
            LogKind::Performance => read_entries::<PerformanceEntry>(&self.path(kind))?
                .into_iter()
                .map(LogEntry::Performance)
                .collect(),
        };
        logs.retain(|entry| range.contains(entry.timestamp()));

        let total = logs.len();
        logs.drain(..total.saturating_sub(limit));
        Ok(LogPage { logs, total, limit })
    }

    /// Counts and timings per operation inside `range`.
    pub fn stats(&self, range: TimeRange) -> Result<LogStats> {
        self.flush()?;
        let mut actions = read_entries::<ActionEntry>(&self.path(LogKind::Actions))?;
        actions.retain(|entry| range.contains(entry.timestamp));
        let mut timings = read_entries::<PerformanceEntry>(&self.path(LogKind::Performance))?;
        timings.retain(|entry| range.contains(entry.timestamp));
        Ok(LogStats::compute(range, &actions, &timings))
    }

    /// Drops entries older than `retention` from both files.
    pub fn prune(&self, retention: chrono::Duration) -> Result<PruneReport> {
        self.prune_before(Utc::now() - retention)
    }

    /// Drops entries stamped at or before `cutoff` from both files.
    pub fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<PruneReport> {
        let (reply, done) = oneshot::channel();
        self.send(Command::Prune { cutoff, reply })?;
        let report = done
            .blocking_recv()
            .map_err(|_| RepositoryError::Internal("audit writer dropped prune".to_string()))??;
        log::info!(
            "audit log pruned cutoff={} actions_removed={} performance_removed={}",
            cutoff.to_rfc3339(),
            report.actions_removed,
            report.performance_removed
        );
        Ok(report)
    }

    fn enqueue<T: Serialize>(&self, kind: LogKind, entry: &T) {
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(error) => {
                log::warn!("audit entry not serializable kind={kind} error={error}");
                return;
            }
        };
        if let Err(error) = self.send(Command::Append { kind, line }) {
            log::warn!("audit entry dropped kind={kind} error={error}");
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        let guard = self.sender.lock();
        let sender = guard
            .as_ref()
            .ok_or_else(|| RepositoryError::Internal("audit log closed".to_string()))?;
        sender
            .send(command)
            .map_err(|_| RepositoryError::Internal("audit writer stopped".to_string()))
    }
}

impl OperationObserver for JsonLinesLog {
    fn on_action(&self, record: &ActionRecord) {
        self.enqueue(LogKind::Actions, &ActionEntry::from(record));
    }

    fn on_performance(&self, record: &PerformanceRecord) {
        self.enqueue(LogKind::Performance, &PerformanceEntry::from(record));
    }
}

impl Drop for JsonLinesLog {
    fn drop(&mut self) {
        // Closing the channel lets the writer drain and exit.
        self.sender.lock().take();
        if let Some(handle) = self.writer.lock().take() {
            if handle.join().is_err() {
                log::warn!("audit writer panicked dir={}", self.dir.display());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Writer thread
// ---------------------------------------------------------------------------

struct Writer {
    dir: PathBuf,
    actions: Option<BufWriter<File>>,
    performance: Option<BufWriter<File>>,
}

impl Writer {
    fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            actions: None,
            performance: None,
        }
    }

    fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = receiver.blocking_recv() {
            self.handle(command);
            while let Ok(command) = receiver.try_recv() {
                self.handle(command);
            }
            self.flush_all();
        }
        self.flush_all();
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Append { kind, line } => {
                if let Err(error) = self.append(kind, &line) {
                    log::warn!("audit write failed kind={kind} error={error}");
                }
            }
            Command::Flush(reply) => {
                self.flush_all();
                let _ = reply.send(());
            }
            Command::Prune { cutoff, reply } => {
                self.flush_all();
                // Handles point at the files about to be replaced.
                self.actions = None;
                self.performance = None;
                let _ = reply.send(prune_files(&self.dir, cutoff));
            }
        }
    }

    fn append(&mut self, kind: LogKind, line: &str) -> std::io::Result<()> {
        let slot = match kind {
            LogKind::Actions => &mut self.actions,
            LogKind::Performance => &mut self.performance,
        };
        if slot.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.dir.join(kind.file_name()))?;
            *slot = Some(BufWriter::new(file));
        }
        if let Some(file) = slot {
            file.write_all(line.as_bytes())?;
            file.write_all(b"\n")?;
        }
        Ok(())
    }

    fn flush_all(&mut self) {
        for (kind, slot) in [
            (LogKind::Actions, &mut self.actions),
            (LogKind::Performance, &mut self.performance),
        ] {
            if let Some(file) = slot {
                if let Err(error) = file.flush() {
                    log::warn!("audit flush failed kind={kind} error={error}");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(error.into()),
    };
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

fn read_entries<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    Ok(read_lines(path)?
        .iter()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

#[derive(Deserialize)]
struct Stamp {
    timestamp: DateTime<Utc>,
}

/// Rewrites both files keeping lines stamped after `cutoff`. Unparseable
/// lines are dropped as well.
fn prune_files(dir: &Path, cutoff: DateTime<Utc>) -> Result<PruneReport> {
    let mut report = PruneReport::default();
    for kind in LogKind::ALL {
        let path = dir.join(kind.file_name());
        if !path.exists() {
            continue;
        }
        let lines = read_lines(&path)?;
        let before = lines.len();
        let kept: Vec<&String> = lines
            .iter()
            .filter(|line| {
                serde_json::from_str::<Stamp>(line).is_ok_and(|stamp| stamp.timestamp > cutoff)
            })
            .collect();

        let tmp = path.with_extension("log.tmp");
        {
            let mut out = BufWriter::new(File::create(&tmp)?);
            for line in &kept {
                out.write_all(line.as_bytes())?;
                out.write_all(b"\n")?;
            }
            out.flush()?;
        }
        fs::rename(&tmp, &path)?;

        let removed = before - kept.len();
        match kind {
            LogKind::Actions => report.actions_removed = removed,
            LogKind::Performance => report.performance_removed = removed,
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::Operation;
    use crate::request::CallContext;
    use chrono::TimeZone;
    use std::time::Duration;
    use tempfile::tempdir;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, day, 12, 0, 0).unwrap()
    }

    fn action(operation: Operation, timestamp: DateTime<Utc>) -> ActionRecord {
        ActionRecord {
            timestamp,
            operation,
            context: CallContext::new("127.0.0.1", "tests"),
            details: serde_json::json!({ "page": 1 }),
        }
    }

    fn timing(operation: Operation, millis: u64, success: bool) -> PerformanceRecord {
        PerformanceRecord {
            timestamp: at(10),
            operation,
            context: CallContext::default(),
            duration: Duration::from_millis(millis),
            success,
            error: (!success).then(|| "Unknown item: 7".to_string()),
            details: serde_json::json!({}),
        }
    }

    #[test]
    fn records_land_in_their_files() {
        let dir = tempdir().expect("tempdir");
        let journal = JsonLinesLog::open(dir.path().join("logs")).unwrap();

        journal.on_action(&action(Operation::ListItems, at(1)));
        journal.on_performance(&timing(Operation::ListItems, 4, true));
        journal.flush().unwrap();

        let actions = fs::read_to_string(journal.path(LogKind::Actions)).unwrap();
        assert_eq!(actions.lines().count(), 1);
        let line: serde_json::Value = serde_json::from_str(actions.trim()).unwrap();
        assert_eq!(line["action"], "listItems");
        assert_eq!(line["context"]["userAgent"], "tests");

        let timings = fs::read_to_string(journal.path(LogKind::Performance)).unwrap();
        let line: serde_json::Value = serde_json::from_str(timings.trim()).unwrap();
        assert_eq!(line["operation"], "listItems");
        assert_eq!(line["durationMs"], 4.0);
    }

    #[test]
    fn read_filters_range_and_keeps_tail() {
        let dir = tempdir().expect("tempdir");
        let journal = JsonLinesLog::open(dir.path()).unwrap();
        for day in 1..=6 {
            journal.on_action(&action(Operation::GetSnapshot, at(day)));
        }

        let page = journal
            .read(LogKind::Actions, TimeRange::new(Some(at(2)), Some(at(5))), 2)
            .unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.limit, 2);
        let stamps: Vec<DateTime<Utc>> = page.logs.iter().map(LogEntry::timestamp).collect();
        assert_eq!(stamps, vec![at(4), at(5)]);

        let everything = journal.read(LogKind::Actions, TimeRange::all(), 100).unwrap();
        assert_eq!(everything.logs.len(), 6);
    }

    #[test]
    fn read_skips_malformed_lines() {
        let dir = tempdir().expect("tempdir");
        let journal = JsonLinesLog::open(dir.path()).unwrap();
        journal.on_action(&action(Operation::ListItems, at(1)));
        journal.flush().unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(journal.path(LogKind::Actions))
            .unwrap();
        writeln!(file, "{{ truncated").unwrap();
        drop(file);
        journal.on_action(&action(Operation::ListItems, at(2)));

        let page = journal.read(LogKind::Actions, TimeRange::all(), 10).unwrap();
        assert_eq!(page.total, 2);
    }

    #[test]
    fn missing_files_read_as_empty() {
        let dir = tempdir().expect("tempdir");
        let journal = JsonLinesLog::open(dir.path()).unwrap();
        let page = journal.read(LogKind::Performance, TimeRange::all(), 10).unwrap();
        assert!(page.logs.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(journal.stats(TimeRange::all()).unwrap().total_operations, 0);
    }

    #[test]
    fn stats_cover_both_files() {
        let dir = tempdir().expect("tempdir");
        let journal = JsonLinesLog::open(dir.path()).unwrap();
        journal.on_action(&action(Operation::RelocateItem, at(1)));
        journal.on_performance(&timing(Operation::RelocateItem, 2, true));
        journal.on_performance(&timing(Operation::RelocateItem, 8, false));

        let stats = journal.stats(TimeRange::all()).unwrap();
        assert_eq!(stats.actions["relocateItem"], 1);
        let relocate = &stats.performance["relocateItem"];
        assert_eq!(relocate.count, 2);
        assert_eq!(relocate.failures, 1);
        assert_eq!(relocate.avg_ms, 5.0);
    }

    #[test]
    fn prune_drops_old_entries() {
        let dir = tempdir().expect("tempdir");
        let journal = JsonLinesLog::open(dir.path()).unwrap();
        for day in 1..=4 {
            journal.on_action(&action(Operation::ListItems, at(day)));
        }
        journal.on_performance(&timing(Operation::ListItems, 1, true));

        let report = journal.prune_before(at(2)).unwrap();
        assert_eq!(report.actions_removed, 2);
        assert_eq!(report.performance_removed, 0);

        // Appends after a prune go to the rewritten file.
        journal.on_action(&action(Operation::ListItems, at(5)));
        let page = journal.read(LogKind::Actions, TimeRange::all(), 10).unwrap();
        let stamps: Vec<DateTime<Utc>> = page.logs.iter().map(LogEntry::timestamp).collect();
        assert_eq!(stamps, vec![at(3), at(4), at(5)]);
    }

    #[test]
    fn drop_writes_pending_entries() {
        let dir = tempdir().expect("tempdir");
        let path = {
            let journal = JsonLinesLog::open(dir.path()).unwrap();
            for day in 1..=3 {
                journal.on_action(&action(Operation::SetSelection, at(day)));
            }
            journal.path(LogKind::Actions)
        };
        let contents = fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 3);
    }
}
