use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::EventError;
use crate::kind::EventKind;

/// Event payload: field name to JSON value.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// An immutable event flowing between steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  kind: EventKind,
  data: Payload,
}

impl Event {
  pub fn new(kind: impl Into<EventKind>, data: Payload) -> Self {
    Self {
      kind: kind.into(),
      data,
    }
  }

  /// Wrap a run payload in a Start event.
  pub fn start(data: Payload) -> Self {
    Self::new(EventKind::Start, data)
  }

  /// Build a Stop event whose payload becomes the run result.
  pub fn stop(data: Payload) -> Self {
    Self::new(EventKind::Stop, data)
  }

  /// Build an event from a typed schema.
  pub fn from_typed<T: TypedEvent>(event: &T) -> Result<Self, EventError> {
    let kind = T::kind();
    let value = serde_json::to_value(event).map_err(|source| EventError::InvalidPayload {
      kind: kind.clone(),
      source,
    })?;
    match value {
      serde_json::Value::Object(data) => Ok(Self { kind, data }),
      _ => Err(EventError::NotAnObject { kind }),
    }
  }

  /// Decode this event into its typed schema.
  ///
  /// Fails if the kind tag does not match `T::KIND`.
  pub fn parse<T: TypedEvent>(&self) -> Result<T, EventError> {
    let expected = T::kind();
    if self.kind != expected {
      return Err(EventError::KindMismatch {
        expected,
        actual: self.kind.clone(),
      });
    }
    serde_json::from_value(serde_json::Value::Object(self.data.clone())).map_err(|source| {
      EventError::InvalidPayload {
        kind: self.kind.clone(),
        source,
      }
    })
  }

  pub fn kind(&self) -> &EventKind {
    &self.kind
  }

  pub fn data(&self) -> &Payload {
    &self.data
  }

  /// Get a payload field. Explicit `null` counts as absent.
  pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
    self.data.get(field).filter(|v| !v.is_null())
  }

  /// Get a payload field as a string slice.
  pub fn get_str(&self, field: &str) -> Option<&str> {
    self.get(field).and_then(|v| v.as_str())
  }

  /// Whether the payload carries a non-null value for `field`.
  pub fn has(&self, field: &str) -> bool {
    self.get(field).is_some()
  }

  pub fn into_data(self) -> Payload {
    self.data
  }
}

/// A user-defined event kind with a fixed schema.
pub trait TypedEvent: Serialize + DeserializeOwned {
  /// Wire name of the kind. Must not be `"start"` or `"stop"`.
  const KIND: &'static str;

  fn kind() -> EventKind {
    EventKind::custom(Self::KIND)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[derive(Debug, PartialEq, Serialize, Deserialize)]
  struct Scored {
    nodes: Vec<f32>,
  }

  impl TypedEvent for Scored {
    const KIND: &'static str = "scored";
  }

  #[derive(Serialize, Deserialize)]
  struct Bare(u32);

  impl TypedEvent for Bare {
    const KIND: &'static str = "bare";
  }

  fn payload(value: serde_json::Value) -> Payload {
    value.as_object().cloned().unwrap()
  }

  #[test]
  fn test_null_fields_count_as_absent() {
    let event = Event::start(payload(json!({ "dirname": "data", "query": null })));

    assert!(event.has("dirname"));
    assert!(!event.has("query"));
    assert!(!event.has("index"));
    assert_eq!(event.get_str("dirname"), Some("data"));
  }

  #[test]
  fn test_typed_event_conversion() {
    let event = Event::from_typed(&Scored {
      nodes: vec![0.5, 0.25],
    })
    .unwrap();

    assert_eq!(event.kind(), &EventKind::custom("scored"));
    assert_eq!(event.data()["nodes"], json!([0.5, 0.25]));
    assert_eq!(
      event.parse::<Scored>().unwrap(),
      Scored {
        nodes: vec![0.5, 0.25]
      }
    );
  }

  #[test]
  fn test_parse_rejects_wrong_kind() {
    let event = Event::stop(payload(json!({ "nodes": [] })));
    let err = event.parse::<Scored>().unwrap_err();
    assert!(matches!(err, EventError::KindMismatch { .. }));
  }

  #[test]
  fn test_non_object_schema_is_rejected() {
    let err = Event::from_typed(&Bare(3)).unwrap_err();
    assert!(matches!(err, EventError::NotAnObject { .. }));
  }
}
