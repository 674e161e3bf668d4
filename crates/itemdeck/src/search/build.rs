//! Index build state and progress tracking.

use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Index build state.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum IndexBuildState {
    Idle = 0,
    Building = 1,
    Ready = 2,
    Error = 3,
}

impl IndexBuildState {
    /// Loads the state from an atomic.
    pub fn load(atomic: &AtomicU8) -> Self {
        match atomic.load(Ordering::Acquire) {
            1 => Self::Building,
            2 => Self::Ready,
            3 => Self::Error,
            _ => Self::Idle,
        }
    }

    /// Stores the state into an atomic.
    pub fn store(self, atomic: &AtomicU8) {
        atomic.store(self as u8, Ordering::Release);
    }

    /// Returns the state as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }
}

/// Progress tracking for the index build.
#[derive(Debug, Default)]
pub struct IndexBuildProgress {
    pub indexed_items: AtomicUsize,
    pub started_at: AtomicU64,
    pub finished_at: AtomicU64,
}

impl IndexBuildProgress {
    /// Resets progress for a new build.
    pub fn reset_for_build(&self, started_at: u64) {
        self.indexed_items.store(0, Ordering::Relaxed);
        self.started_at.store(started_at, Ordering::Relaxed);
        self.finished_at.store(0, Ordering::Relaxed);
    }

    /// Records that `count` more ids were indexed.
    pub fn add_indexed(&self, count: usize) {
        self.indexed_items.fetch_add(count, Ordering::Relaxed);
    }

    /// Marks the build finished at `finished_at`.
    pub fn finish(&self, finished_at: u64) {
        self.finished_at.store(finished_at, Ordering::Relaxed);
    }

    /// Takes a snapshot of the progress values.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            indexed_items: self.indexed_items.load(Ordering::Relaxed),
            started_at: zero_to_none(self.started_at.load(Ordering::Relaxed)),
            finished_at: zero_to_none(self.finished_at.load(Ordering::Relaxed)),
        }
    }
}

/// A snapshot of build progress values.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub indexed_items: usize,
    pub started_at: Option<u64>,
    pub finished_at: Option<u64>,
}

/// Returns the current Unix timestamp in seconds.
pub fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_secs())
        .unwrap_or(0)
}

/// Converts 0 to None for optional timestamps.
fn zero_to_none(value: u64) -> Option<u64> {
    if value == 0 {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_atomic() {
        let atomic = AtomicU8::new(0);
        assert_eq!(IndexBuildState::load(&atomic), IndexBuildState::Idle);
        for state in [
            IndexBuildState::Building,
            IndexBuildState::Ready,
            IndexBuildState::Error,
            IndexBuildState::Idle,
        ] {
            state.store(&atomic);
            assert_eq!(IndexBuildState::load(&atomic), state);
        }
    }

    #[test]
    fn progress_reset_and_snapshot() {
        let progress = IndexBuildProgress::default();
        let empty = progress.snapshot();
        assert_eq!(empty.indexed_items, 0);
        assert_eq!(empty.started_at, None);

        progress.reset_for_build(100);
        progress.add_indexed(10);
        progress.add_indexed(5);
        let running = progress.snapshot();
        assert_eq!(running.indexed_items, 15);
        assert_eq!(running.started_at, Some(100));
        assert_eq!(running.finished_at, None);

        progress.finish(105);
        assert_eq!(progress.snapshot().finished_at, Some(105));
    }
}
