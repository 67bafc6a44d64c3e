//! Application events
//!
//! An [`Event`] is a JSON object delivered by the host framework. The
//! adapter reads fields out of incoming events (through the configured
//! address and value expressions) and emits output events that carry the
//! device response payload together with the call parameters that produced
//! it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single application event: an ordered JSON object of named fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    fields: Map<String, Value>,
}

impl Event {
    /// Create an empty event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an event from a JSON value. Returns `None` if the value is not
    /// an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Look up a field by dotted path, e.g. `"meter.address"`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.fields.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Set a top-level field, replacing any existing value.
    pub fn insert<S: Into<String>>(&mut self, field: S, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the event has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consume the event, yielding its JSON representation.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Build the output event for a successful transport call.
///
/// The response payload is merged with the originating call parameters
/// (under `params`) so downstream consumers can trace every reading back to
/// the request that produced it. A UTC timestamp is stamped on at emit time.
pub fn output_event(payload: Value, params: Value) -> Event {
    let mut event = Event::new();
    if let Value::Object(fields) = payload {
        for (field, value) in fields {
            event.insert(field, value);
        }
    }
    event.insert("params", params);
    event.insert("ts", Value::String(Utc::now().to_rfc3339()));
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_lookup() {
        let event = Event::from_value(json!({
            "register": 42,
            "meter": { "address": 7, "unit": "kWh" }
        }))
        .unwrap();

        assert_eq!(event.get("register"), Some(&json!(42)));
        assert_eq!(event.get("meter.address"), Some(&json!(7)));
        assert_eq!(event.get("meter.unit"), Some(&json!("kWh")));
        assert_eq!(event.get("missing"), None);
        assert_eq!(event.get("meter.missing"), None);
        assert_eq!(event.get("register.nested"), None);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Event::from_value(json!([1, 2, 3])).is_none());
        assert!(Event::from_value(json!("scalar")).is_none());
        assert!(Event::from_value(json!({})).is_some());
    }

    #[test]
    fn test_output_event_merges_payload_and_params() {
        let out = output_event(
            json!({ "values": [1, 2, 3] }),
            json!({ "address": 0, "count": 3 }),
        );

        assert_eq!(out.get("values"), Some(&json!([1, 2, 3])));
        assert_eq!(out.get("params.address"), Some(&json!(0)));
        assert_eq!(out.get("params.count"), Some(&json!(3)));
        assert!(out.get("ts").is_some());
    }

    #[test]
    fn test_serde_transparent() {
        let event = Event::from_value(json!({ "a": 1 })).unwrap();
        let round: Event = serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(round, event);
    }
}
