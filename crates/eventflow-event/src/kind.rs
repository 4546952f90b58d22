use std::fmt;

use serde::{Deserialize, Serialize};

/// Discriminator of an [`Event`](crate::Event).
///
/// Serialized as a plain string. The names `"start"` and `"stop"` always map
/// to the sentinel kinds, so a custom kind can never shadow them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
  Start,
  Stop,
  Custom(String),
}

impl EventKind {
  pub fn custom(name: impl Into<String>) -> Self {
    Self::from(name.into())
  }

  pub fn as_str(&self) -> &str {
    match self {
      EventKind::Start => "start",
      EventKind::Stop => "stop",
      EventKind::Custom(name) => name,
    }
  }

  pub fn is_stop(&self) -> bool {
    matches!(self, EventKind::Stop)
  }
}

impl From<String> for EventKind {
  fn from(name: String) -> Self {
    match name.as_str() {
      "start" => EventKind::Start,
      "stop" => EventKind::Stop,
      _ => EventKind::Custom(name),
    }
  }
}

impl From<&str> for EventKind {
  fn from(name: &str) -> Self {
    Self::from(name.to_string())
  }
}

impl From<EventKind> for String {
  fn from(kind: EventKind) -> Self {
    match kind {
      EventKind::Custom(name) => name,
      other => other.as_str().to_string(),
    }
  }
}

impl fmt::Display for EventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
