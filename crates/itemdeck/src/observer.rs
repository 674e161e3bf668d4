//! Call-completion and timing hooks.
//!
//! Observers are fire-and-forget: they run after an operation has produced
//! its result, a panicking observer is caught and logged, and nothing an
//! observer does can change what the caller gets back.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::request::CallContext;

/// The externally visible repository operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    ListItems,
    RelocateItem,
    SetSelection,
    GetSnapshot,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListItems => "listItems",
            Self::RelocateItem => "relocateItem",
            Self::SetSelection => "setSelection",
            Self::GetSnapshot => "getSnapshot",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successfully completed call.
#[derive(Debug, Clone)]
pub struct ActionRecord {
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
    pub context: CallContext,
    /// Operation-specific fields (arguments and result summary).
    pub details: serde_json::Value,
}

/// Timing of a call, successful or not.
#[derive(Debug, Clone)]
pub struct PerformanceRecord {
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
    pub context: CallContext,
    pub duration: Duration,
    pub success: bool,
    pub error: Option<String>,
    /// Operation arguments.
    pub details: serde_json::Value,
}

/// Receives records after each repository call.
///
/// Implementations must return quickly; anything slow belongs on a queue.
pub trait OperationObserver: Send + Sync {
    fn on_action(&self, _record: &ActionRecord) {}

    fn on_performance(&self, _record: &PerformanceRecord) {}
}

/// The registered observers of one repository.
#[derive(Default)]
pub struct ObserverSet {
    observers: RwLock<Vec<Arc<dyn OperationObserver>>>,
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("len", &self.len())
            .finish()
    }
}

impl ObserverSet {
    pub fn add(&self, observer: Arc<dyn OperationObserver>) {
        self.observers.write().push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    pub(crate) fn notify_action(&self, record: &ActionRecord) {
        for observer in self.snapshot() {
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_action(record)));
            if outcome.is_err() {
                log::warn!(
                    "observer panicked handling action operation={}",
                    record.operation
                );
            }
        }
    }

    pub(crate) fn notify_performance(&self, record: &PerformanceRecord) {
        for observer in self.snapshot() {
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_performance(record)));
            if outcome.is_err() {
                log::warn!(
                    "observer panicked handling timing operation={}",
                    record.operation
                );
            }
        }
    }

    /// Clones the list so callbacks run without holding the lock.
    fn snapshot(&self) -> Vec<Arc<dyn OperationObserver>> {
        self.observers.read().clone()
    }
}
