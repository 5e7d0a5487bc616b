//! DecodeStage processor.
//!
//! Turns a `RawRecord` into an `Event`:
//! - Counts every record entering the pipeline (`recordsIn`)
//! - Decodes the payload with the binary codec
//! - Counts successful decodes (`recordsUnmarshalled`)
//!
//! Decode failures are returned to the caller, which routes them to the
//! `ErrorSink`.

use crate::events::RawRecord;
use crate::metrics::MetricsRegistry;
use evpipe_sdk::codec::{self, DecodeError};
use evpipe_sdk::objects::{CounterName, Event};
use kanau::processor::Processor;

/// First pipeline stage: raw bytes to `Event`.
#[derive(Debug, Clone)]
pub struct DecodeStage {
    metrics: MetricsRegistry,
}

impl DecodeStage {
    pub fn new(metrics: MetricsRegistry) -> Self {
        Self { metrics }
    }
}

impl Processor<RawRecord> for DecodeStage {
    type Output = Event;
    type Error = DecodeError;
    #[tracing::instrument(skip_all, err(level = "debug"), name = "Stage:Decode", fields(offset = record.offset))]
    async fn process(&self, record: RawRecord) -> Result<Event, DecodeError> {
        self.metrics.increment(CounterName::RecordsIn);
        let event = codec::decode(&record.payload)?;
        self.metrics.increment(CounterName::RecordsUnmarshalled);
        Ok(event)
    }
}
