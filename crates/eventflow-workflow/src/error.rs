use eventflow_context::ContextError;
use eventflow_event::{EventError, EventKind};
use thiserror::Error;

/// The declared steps do not compose into a runnable graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
  #[error("no step accepts the start event")]
  NoStartStep,

  #[error("duplicate step name: {0}")]
  DuplicateStep(String),

  #[error("step '{step}' accepts the stop event, which ends the run and is never dispatched")]
  StopConsumed { step: String },

  #[error("step '{step}' declares the start event as an output")]
  EmitsStart { step: String },

  #[error("step '{step}' declares output '{kind}' but no step accepts it")]
  UnconsumedEvent { step: String, kind: EventKind },

  #[error("no path leads from the start event to a stop event")]
  NoPathToStop,

  #[error("step '{step}' only emits events from which no stop event is reachable")]
  NoStopReachable { step: String },
}

/// Failure raised by a step body.
#[derive(Debug, Error)]
pub enum StepError {
  #[error("missing required field '{field}'")]
  MissingField { field: String },

  #[error(transparent)]
  Context(#[from] ContextError),

  #[error(transparent)]
  Event(#[from] EventError),

  #[error("{0}")]
  Message(String),

  #[error(transparent)]
  Other(Box<dyn std::error::Error + Send + Sync>),
}

impl StepError {
  pub fn missing_field(field: impl Into<String>) -> Self {
    Self::MissingField {
      field: field.into(),
    }
  }

  pub fn msg(message: impl Into<String>) -> Self {
    Self::Message(message.into())
  }

  /// Wrap an external-service failure.
  pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Other(Box::new(err))
  }
}
