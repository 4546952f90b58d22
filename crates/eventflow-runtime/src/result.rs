//! Run result types.

use eventflow_event::Payload;
use serde::{Deserialize, Serialize};

/// Result of a completed workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
  /// Unique run ID.
  pub run_id: String,
  /// Payload of the stop event that ended the run.
  pub output: Payload,
  /// Number of step invocations dispatched.
  pub invocations: usize,
}
