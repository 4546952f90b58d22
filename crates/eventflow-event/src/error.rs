use thiserror::Error;

use crate::kind::EventKind;

#[derive(Debug, Error)]
pub enum EventError {
  #[error("expected event of kind '{expected}', got '{actual}'")]
  KindMismatch {
    expected: EventKind,
    actual: EventKind,
  },

  #[error("event payload for '{kind}' must serialize to a JSON object")]
  NotAnObject { kind: EventKind },

  #[error("invalid payload for event '{kind}': {source}")]
  InvalidPayload {
    kind: EventKind,
    #[source]
    source: serde_json::Error,
  },
}
