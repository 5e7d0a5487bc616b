//! The three-stage record pipeline.
//!
//! ```text
//! Received -> Decoded -> Filtered -> Processed -> Delivered
//!                 \-> Dropped (ineligible)
//! any non-terminal state -> Failed (ErrorSink)
//! ```
//!
//! Each stage returns a `Result`; the pipeline checks it before moving on
//! and hands failures to the `ErrorSink`. A run never affects another
//! record's run except through the shared rate limiter and counters.

use crate::config::ExternalServiceConfig;
use crate::events::{RawRecord, Stage};
use crate::metrics::MetricsRegistry;
use crate::processors::delivery::{DeliveryError, DeliveryStage, EventSink};
use crate::processors::error_sink::{DeadLetter, ErrorSink};
use crate::processors::transform::{ProcessingError, TransformStage};
use crate::processors::DecodeStage;
use crate::throttle::RateLimiter;
use evpipe_sdk::codec::DecodeError;
use kanau::processor::Processor;
use thiserror::Error;
use tracing::trace;

/// Why a record left the pipeline early.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("processing failed: {0}")]
    Processing(#[from] ProcessingError),

    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    /// A failure no stage anticipated, such as a panicking run.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl PipelineError {
    /// The stage that failed, or `None` for unexpected failures.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Decode(_) => Some(Stage::Decode),
            PipelineError::Processing(_) => Some(Stage::Transform),
            PipelineError::Delivery(_) => Some(Stage::Delivery),
            PipelineError::Unexpected(_) => None,
        }
    }
}

/// Terminal state of one record.
#[derive(Debug)]
pub enum PipelineOutcome {
    Delivered,
    /// The event was not eligible. Not a failure.
    FilteredOut,
    Failed(PipelineError),
}

impl PipelineOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, PipelineOutcome::Delivered)
    }
}

/// Decode, transform and deliver records.
pub struct Pipeline<S: EventSink> {
    decode: DecodeStage,
    transform: TransformStage,
    delivery: DeliveryStage<S>,
    error_sink: ErrorSink,
    metrics: MetricsRegistry,
}

impl<S: EventSink> Pipeline<S> {
    /// Create a pipeline delivering through `sink`.
    ///
    /// # Arguments
    ///
    /// * `sink` - Outbound transport
    /// * `limiter` - Admission gate for deliveries
    /// * `external_service` - Target URL and timeout
    /// * `metrics` - Counter registry shared by every stage
    pub fn new(
        sink: S,
        limiter: RateLimiter,
        external_service: &ExternalServiceConfig,
        metrics: MetricsRegistry,
    ) -> Self {
        Self {
            decode: DecodeStage::new(metrics.clone()),
            transform: TransformStage::new(metrics.clone()),
            delivery: DeliveryStage::new(sink, limiter, external_service, metrics.clone()),
            error_sink: ErrorSink::new(metrics.clone()),
            metrics,
        }
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    pub fn error_sink(&self) -> &ErrorSink {
        &self.error_sink
    }

    pub fn sink(&self) -> &S {
        self.delivery.sink()
    }

    /// Run one record to a terminal state.
    #[tracing::instrument(skip_all, name = "Pipeline", fields(offset = record.offset))]
    pub async fn run(&self, record: RawRecord) -> PipelineOutcome {
        let offset = record.offset;
        let mut event_id = None;

        let result = self.advance(record, &mut event_id).await;
        match result {
            Ok(outcome) => outcome,
            Err(error) => {
                let dead_letter = DeadLetter {
                    offset,
                    event_id,
                    error,
                };
                self.error_sink.handle(&dead_letter);
                PipelineOutcome::Failed(dead_letter.error)
            }
        }
    }

    async fn advance(
        &self,
        record: RawRecord,
        event_id: &mut Option<i64>,
    ) -> Result<PipelineOutcome, PipelineError> {
        // Received -> Decoded
        let event = self.decode.process(record).await?;
        *event_id = Some(event.id);
        trace!(event_id = event.id, "Decoded");

        // Decoded -> Filtered -> Processed, or Dropped
        let Some(payload) = self.transform.process(event).await? else {
            trace!("Dropped ineligible event");
            return Ok(PipelineOutcome::FilteredOut);
        };

        // Processed -> Delivered
        self.delivery.process(payload).await?;
        trace!("Delivered");
        Ok(PipelineOutcome::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::delivery::tests::{RecordingSink, target};
    use evpipe_sdk::codec;
    use evpipe_sdk::objects::{Event, MetricsSnapshot};
    use std::num::NonZeroU32;
    use std::time::Duration;

    fn pipeline(sink: RecordingSink) -> Pipeline<RecordingSink> {
        Pipeline::new(
            sink,
            RateLimiter::new(NonZeroU32::new(100).unwrap(), Duration::from_millis(10)),
            &target(),
            MetricsRegistry::new(),
        )
    }

    fn record(event: &Event) -> RawRecord {
        RawRecord::new(0, codec::encode(event))
    }

    fn test_event() -> Event {
        Event::new(42, "test").with_property("value", "test-value")
    }

    #[tokio::test]
    async fn test_eligible_event_is_delivered() {
        let pipeline = pipeline(RecordingSink::default());

        let outcome = pipeline.run(record(&test_event())).await;

        assert!(outcome.is_delivered());
        let requests = pipeline.sink().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body, r#"{"value":"test-value"}"#);
        assert_eq!(
            pipeline.metrics().snapshot(),
            MetricsSnapshot {
                records_in: 1,
                records_unmarshalled: 1,
                records_filtered: 1,
                records_processed: 1,
                records_out: 1,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_bytes_are_dead_lettered() {
        let pipeline = pipeline(RecordingSink::default());

        let outcome = pipeline.run(RawRecord::new(0, vec![0u8, 1, 2])).await;

        assert!(matches!(
            outcome,
            PipelineOutcome::Failed(PipelineError::Decode(_))
        ));
        assert!(pipeline.sink().requests().is_empty());
        assert_eq!(
            pipeline.metrics().snapshot(),
            MetricsSnapshot {
                records_in: 1,
                records_unmarshall_failure: 1,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn test_bytes_after_a_complete_record_are_ignored() {
        let pipeline = pipeline(RecordingSink::default());
        let mut bytes = codec::encode(&test_event()).to_vec();
        bytes.push(0x07);

        let outcome = pipeline.run(RawRecord::new(0, bytes)).await;

        assert!(outcome.is_delivered());
        assert_eq!(pipeline.sink().requests()[0].body, r#"{"value":"test-value"}"#);
        assert_eq!(pipeline.metrics().snapshot().records_unmarshall_failure, 0);
    }

    #[tokio::test]
    async fn test_single_byte_is_dead_lettered() {
        let pipeline = pipeline(RecordingSink::default());
        let outcome = pipeline.run(RawRecord::new(0, vec![42u8])).await;
        assert!(matches!(outcome, PipelineOutcome::Failed(ref e) if e.stage() == Some(Stage::Decode)));
        assert_eq!(pipeline.metrics().snapshot().records_unmarshall_failure, 1);
    }

    #[tokio::test]
    async fn test_ineligible_event_is_dropped_silently() {
        let pipeline = pipeline(RecordingSink::default());

        let outcome = pipeline.run(record(&Event::new(1, "other"))).await;

        assert!(matches!(outcome, PipelineOutcome::FilteredOut));
        assert!(pipeline.sink().requests().is_empty());
        assert_eq!(
            pipeline.metrics().snapshot(),
            MetricsSnapshot {
                records_in: 1,
                records_unmarshalled: 1,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn test_failure_property_is_dead_lettered_in_transform() {
        let pipeline = pipeline(RecordingSink::default());
        let event = Event::new(42, "test").with_property("failure", "true");

        let outcome = pipeline.run(record(&event)).await;

        assert!(matches!(
            outcome,
            PipelineOutcome::Failed(PipelineError::Processing(ProcessingError::FailureRequested))
        ));
        assert!(pipeline.sink().requests().is_empty());
        assert_eq!(
            pipeline.metrics().snapshot(),
            MetricsSnapshot {
                records_in: 1,
                records_unmarshalled: 1,
                records_filtered: 1,
                records_processing_failure: 1,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn test_sink_rejection_is_dead_lettered_in_delivery() {
        let pipeline = pipeline(RecordingSink::rejecting(401));

        let outcome = pipeline.run(record(&test_event())).await;

        match outcome {
            PipelineOutcome::Failed(error) => assert_eq!(error.stage(), Some(Stage::Delivery)),
            other => panic!("unexpected outcome: {other:?}"),
        }
        // the sink saw the request, but nothing counts as delivered
        assert_eq!(pipeline.sink().requests().len(), 1);
        assert_eq!(
            pipeline.metrics().snapshot(),
            MetricsSnapshot {
                records_in: 1,
                records_unmarshalled: 1,
                records_filtered: 1,
                records_processed: 1,
                records_failed: 1,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn test_failures_do_not_affect_later_records() {
        let pipeline = pipeline(RecordingSink::default());

        pipeline.run(RawRecord::new(0, vec![1u8])).await;
        pipeline
            .run(record(&Event::new(1, "test").with_property("failure", "x")))
            .await;
        let outcome = pipeline.run(record(&test_event())).await;

        assert!(outcome.is_delivered());
        let snapshot = pipeline.metrics().snapshot();
        assert_eq!(snapshot.records_in, 3);
        assert_eq!(snapshot.records_out, 1);
        assert_eq!(snapshot.total_failures(), 2);
    }
}
