//! Application state shared across all request handlers.

use evpipe_core::events::RawRecordSender;
use evpipe_core::metrics::MetricsRegistry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Counters shared with the pipeline.
    pub metrics: MetricsRegistry,
    /// Inbound side of the raw record channel.
    pub record_tx: RawRecordSender,
    /// The only topic the ingest endpoint accepts.
    pub topic: Arc<str>,
    next_offset: Arc<AtomicU64>,
}

impl AppState {
    /// Create a new AppState feeding `record_tx`.
    pub fn new(metrics: MetricsRegistry, record_tx: RawRecordSender, topic: impl Into<Arc<str>>) -> Self {
        Self {
            metrics,
            record_tx,
            topic: topic.into(),
            next_offset: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Hand out the next record offset. Offsets increase monotonically per process.
    pub fn next_offset(&self) -> u64 {
        self.next_offset.fetch_add(1, Ordering::Relaxed)
    }
}
