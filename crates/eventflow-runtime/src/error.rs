//! Run error types.

use eventflow_event::EventKind;
use eventflow_workflow::StepError;

/// Errors that end a workflow run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
  /// A step body returned an error.
  #[error("step '{step}' failed handling '{kind}' event: {source}")]
  StepExecution {
    step: String,
    kind: EventKind,
    #[source]
    source: StepError,
  },

  /// A step body panicked.
  #[error("step '{step}' panicked handling '{kind}' event: {message}")]
  StepPanicked {
    step: String,
    kind: EventKind,
    message: String,
  },

  /// A step returned an event kind it did not declare.
  #[error("step '{step}' emitted undeclared event '{emitted}' while handling '{kind}'")]
  UndeclaredEvent {
    step: String,
    kind: EventKind,
    emitted: EventKind,
  },

  /// The work queue drained without a stop event.
  #[error("run ended without a stop event after {invocations} step invocations")]
  NoTermination { invocations: usize },

  /// The run exceeded its configured deadline.
  #[error("run exceeded its deadline of {timeout_ms}ms")]
  Timeout { timeout_ms: u64 },

  /// The run exceeded its configured invocation budget.
  #[error("run exceeded the limit of {limit} step invocations")]
  InvocationLimitExceeded { limit: usize },

  /// The caller cancelled the run.
  #[error("run cancelled")]
  Cancelled,
}

impl RunError {
  /// Name of the step responsible, if the failure came from a step.
  pub fn step(&self) -> Option<&str> {
    match self {
      RunError::StepExecution { step, .. }
      | RunError::StepPanicked { step, .. }
      | RunError::UndeclaredEvent { step, .. } => Some(step),
      _ => None,
    }
  }
}
