use std::collections::BTreeMap;

use serde::Serialize;

use super::entry::{ActionEntry, PerformanceEntry, TimeRange};

/// Duration figures of one operation, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationTiming {
    pub count: usize,
    pub failures: usize,
    pub total_ms: f64,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl OperationTiming {
    fn first(entry: &PerformanceEntry) -> Self {
        Self {
            count: 1,
            failures: usize::from(!entry.success),
            total_ms: entry.duration_ms,
            avg_ms: entry.duration_ms,
            min_ms: entry.duration_ms,
            max_ms: entry.duration_ms,
        }
    }

    fn record(&mut self, entry: &PerformanceEntry) {
        self.count += 1;
        self.failures += usize::from(!entry.success);
        self.total_ms += entry.duration_ms;
        self.avg_ms = self.total_ms / self.count as f64;
        self.min_ms = self.min_ms.min(entry.duration_ms);
        self.max_ms = self.max_ms.max(entry.duration_ms);
    }
}

/// Aggregates over both log files for one time range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    pub period: TimeRange,
    pub total_actions: usize,
    pub total_operations: usize,
    /// Successful calls per operation name.
    pub actions: BTreeMap<String, usize>,
    /// Timings per operation name, failed calls included.
    pub performance: BTreeMap<String, OperationTiming>,
}

impl LogStats {
    pub(crate) fn compute(
        period: TimeRange,
        actions: &[ActionEntry],
        timings: &[PerformanceEntry],
    ) -> Self {
        let mut action_counts = BTreeMap::new();
        for entry in actions {
            *action_counts
                .entry(entry.action.as_str().to_string())
                .or_insert(0) += 1;
        }

        let mut performance: BTreeMap<String, OperationTiming> = BTreeMap::new();
        for entry in timings {
            performance
                .entry(entry.operation.as_str().to_string())
                .and_modify(|timing| timing.record(entry))
                .or_insert_with(|| OperationTiming::first(entry));
        }

        Self {
            period,
            total_actions: actions.len(),
            total_operations: timings.len(),
            actions: action_counts,
            performance,
        }
    }
}
