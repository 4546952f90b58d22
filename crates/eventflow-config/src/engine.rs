use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Limits applied to every workflow run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Overall run deadline. Unbounded if not set.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,

  /// Upper bound on step invocations per run, guarding against event loops
  /// that never produce a stop event.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_step_invocations: Option<usize>,
}

impl EngineConfig {
  pub fn timeout(&self) -> Option<Duration> {
    self.timeout_ms.map(Duration::from_millis)
  }

  pub(crate) fn validate(&self) -> Result<(), ConfigError> {
    if self.max_step_invocations == Some(0) {
      return Err(ConfigError::Invalid {
        field: "engine.max_step_invocations",
        message: "must be at least 1".to_string(),
      });
    }
    Ok(())
  }
}
