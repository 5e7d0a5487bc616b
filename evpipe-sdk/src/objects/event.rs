//! The event record carried through the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A decoded event.
///
/// Events are never mutated after decoding. Stages derive new values
/// (such as the outbound JSON payload) instead of editing the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Opaque identifier assigned by the producer.
    pub id: i64,
    /// Discriminator used for eligibility decisions.
    #[serde(rename = "type")]
    pub event_type: String,
    /// String-keyed string properties. Kept sorted so that serialized
    /// forms are deterministic.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Event {
    pub fn new(id: i64, event_type: impl Into<String>) -> Self {
        Self {
            id,
            event_type: event_type.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Add a property, replacing any previous value under the same key.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_field_is_renamed_in_json() {
        let event = Event::new(42, "test").with_property("value", "test-value");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"id":42,"type":"test","properties":{"value":"test-value"}}"#
        );
    }

    #[test]
    fn test_with_property_replaces_existing_key() {
        let event = Event::new(1, "test")
            .with_property("k", "a")
            .with_property("k", "b");
        assert_eq!(event.properties.len(), 1);
        assert_eq!(event.properties["k"], "b");
    }
}
