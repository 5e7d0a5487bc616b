//! TransformStage processor.
//!
//! The TransformStage is responsible for:
//! - Dropping events whose type is not eligible (silently, no failure)
//! - Counting eligible events (`recordsFiltered`)
//! - Failing events that carry the `failure` property, an injection hook
//!   for operational testing
//! - Serializing the properties of every other eligible event to a JSON
//!   object and counting it (`recordsProcessed`)

use crate::metrics::MetricsRegistry;
use evpipe_sdk::objects::{CounterName, Event};
use kanau::processor::Processor;
use thiserror::Error;

/// Only events of this type are delivered. Exact, case-sensitive match.
pub const ELIGIBLE_EVENT_TYPE: &str = "test";

/// Property key that makes an eligible event fail in this stage.
pub const FAILURE_PROPERTY: &str = "failure";

/// Errors raised while transforming an eligible event.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The event asked to fail through the `failure` property.
    #[error("failure event!")]
    FailureRequested,

    /// Payload serialization error
    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The outbound body derived from an eligible event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedPayload {
    /// Id of the event the body was derived from.
    pub event_id: i64,
    /// JSON object of the event's properties.
    pub body: String,
}

/// Second pipeline stage: eligibility filter plus JSON transformation.
///
/// Returns `Ok(None)` for events that are filtered out.
#[derive(Debug, Clone)]
pub struct TransformStage {
    metrics: MetricsRegistry,
}

impl TransformStage {
    pub fn new(metrics: MetricsRegistry) -> Self {
        Self { metrics }
    }

    /// Whether the event passes the filter.
    pub fn is_eligible(event: &Event) -> bool {
        event.event_type == ELIGIBLE_EVENT_TYPE
    }

    fn transform(event: &Event) -> Result<TransformedPayload, ProcessingError> {
        if event.properties.contains_key(FAILURE_PROPERTY) {
            return Err(ProcessingError::FailureRequested);
        }
        Ok(TransformedPayload {
            event_id: event.id,
            body: serde_json::to_string(&event.properties)?,
        })
    }
}

impl Processor<Event> for TransformStage {
    type Output = Option<TransformedPayload>;
    type Error = ProcessingError;
    #[tracing::instrument(skip_all, err(level = "debug"), name = "Stage:Transform", fields(event_id = event.id))]
    async fn process(&self, event: Event) -> Result<Option<TransformedPayload>, ProcessingError> {
        if !Self::is_eligible(&event) {
            return Ok(None);
        }
        self.metrics.increment(CounterName::RecordsFiltered);

        let payload = Self::transform(&event)?;
        self.metrics.increment(CounterName::RecordsProcessed);
        Ok(Some(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> (TransformStage, MetricsRegistry) {
        let metrics = MetricsRegistry::new();
        (TransformStage::new(metrics.clone()), metrics)
    }

    #[tokio::test]
    async fn test_eligible_event_becomes_json_body() {
        let (stage, metrics) = stage();
        let event = Event::new(42, "test").with_property("value", "test-value");

        let payload = stage.process(event).await.unwrap().unwrap();

        assert_eq!(payload.event_id, 42);
        assert_eq!(payload.body, r#"{"value":"test-value"}"#);
        assert_eq!(metrics.get(CounterName::RecordsFiltered), 1);
        assert_eq!(metrics.get(CounterName::RecordsProcessed), 1);
    }

    #[tokio::test]
    async fn test_empty_properties_serialize_to_empty_object() {
        let (stage, _) = stage();
        let payload = stage.process(Event::new(1, "test")).await.unwrap().unwrap();
        assert_eq!(payload.body, "{}");
    }

    #[tokio::test]
    async fn test_json_escapes_special_characters() {
        let (stage, _) = stage();
        let event = Event::new(1, "test").with_property("quote\"", "line\nbreak");
        let payload = stage.process(event).await.unwrap().unwrap();
        assert_eq!(payload.body, r#"{"quote\"":"line\nbreak"}"#);
    }

    #[tokio::test]
    async fn test_ineligible_types_are_dropped_silently() {
        let (stage, metrics) = stage();
        for event_type in ["Test", "TEST", "test ", "", "other"] {
            let out = stage.process(Event::new(1, event_type)).await.unwrap();
            assert!(out.is_none(), "{event_type:?} should be filtered out");
        }
        assert_eq!(metrics.snapshot().records_filtered, 0);
        assert_eq!(metrics.snapshot().total_failures(), 0);
    }

    #[tokio::test]
    async fn test_failure_property_fails_after_filter() {
        let (stage, metrics) = stage();
        let event = Event::new(42, "test").with_property("failure", "");

        let err = stage.process(event).await.unwrap_err();

        assert!(matches!(err, ProcessingError::FailureRequested));
        assert_eq!(err.to_string(), "failure event!");
        assert_eq!(metrics.get(CounterName::RecordsFiltered), 1);
        assert_eq!(metrics.get(CounterName::RecordsProcessed), 0);
    }

    #[tokio::test]
    async fn test_failure_property_on_ineligible_event_is_ignored() {
        let (stage, _) = stage();
        let event = Event::new(1, "other").with_property("failure", "true");
        assert!(stage.process(event).await.unwrap().is_none());
    }
}
