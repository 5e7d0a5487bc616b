//! ErrorSink: terminal handler for records that cannot proceed.
//!
//! Every failed record ends here exactly once. The sink counts the failure
//! on the counter that belongs to the failing stage and leaves a debug-level
//! diagnostic. Records are never retried or re-enqueued.

use crate::metrics::MetricsRegistry;
use crate::pipeline::PipelineError;
use evpipe_sdk::objects::CounterName;
use tracing::{debug, error};

/// A record diverted from the pipeline.
#[derive(Debug)]
pub struct DeadLetter {
    /// Offset of the inbound record.
    pub offset: u64,
    /// Id of the decoded event, if decoding got that far.
    pub event_id: Option<i64>,
    /// Why the record stopped.
    pub error: PipelineError,
}

/// Central failure handler shared by all stages.
#[derive(Debug, Clone)]
pub struct ErrorSink {
    metrics: MetricsRegistry,
}

impl ErrorSink {
    pub fn new(metrics: MetricsRegistry) -> Self {
        Self { metrics }
    }

    /// Record a dead letter.
    pub fn handle(&self, dead_letter: &DeadLetter) {
        let counter = failure_counter(&dead_letter.error);
        self.metrics.increment(counter);

        if let PipelineError::Unexpected(_) = dead_letter.error {
            error!(
                offset = dead_letter.offset,
                error = %dead_letter.error,
                "Unexpected pipeline failure"
            );
        }

        debug!(
            offset = dead_letter.offset,
            event_id = dead_letter.event_id,
            stage = dead_letter.error.stage().map(tracing::field::display),
            counter = %counter,
            error = %dead_letter.error,
            "Record dead-lettered"
        );
    }
}

/// Counter incremented for a failure. Each failure counts exactly once.
pub fn failure_counter(error: &PipelineError) -> CounterName {
    match error {
        PipelineError::Decode(_) => CounterName::RecordsUnmarshallFailure,
        PipelineError::Processing(_) => CounterName::RecordsProcessingFailure,
        PipelineError::Delivery(_) => CounterName::RecordsFailed,
        PipelineError::Unexpected(_) => CounterName::UnexpectedFailures,
    }
}
