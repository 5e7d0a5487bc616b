//! Process-wide pipeline counters.

use evpipe_sdk::objects::{CounterName, MetricsSnapshot};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Registry of the pipeline's monotonically increasing counters.
///
/// Cloning is cheap and every clone shares the same counters. Updates are
/// atomic but carry no ordering guarantee relative to each other.
#[derive(Debug, Clone, Default)]
pub struct MetricsRegistry {
    counters: Arc<[AtomicU64; CounterName::ALL.len()]>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one to `counter`.
    pub fn increment(&self, counter: CounterName) {
        self.counters[counter.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, counter: CounterName) -> u64 {
        self.counters[counter.index()].load(Ordering::Relaxed)
    }

    /// Read every counter. Values are read one by one, so a snapshot taken
    /// while records are in flight may mix before/after states.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_in: self.get(CounterName::RecordsIn),
            records_unmarshalled: self.get(CounterName::RecordsUnmarshalled),
            records_unmarshall_failure: self.get(CounterName::RecordsUnmarshallFailure),
            records_filtered: self.get(CounterName::RecordsFiltered),
            records_processed: self.get(CounterName::RecordsProcessed),
            records_processing_failure: self.get(CounterName::RecordsProcessingFailure),
            records_out: self.get(CounterName::RecordsOut),
            records_failed: self.get(CounterName::RecordsFailed),
            unexpected_failures: self.get(CounterName::UnexpectedFailures),
        }
    }
}
