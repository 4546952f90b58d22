//! Eventflow Config
//!
//! Serializable configuration for eventflow. Every field has a default, so an
//! empty JSON object is a valid configuration file.
//!
//! # Example
//!
//! ```json
//! {
//!   "engine": { "timeout_ms": 30000, "max_step_invocations": 64 },
//!   "rag": { "similarity_top_k": 2, "rerank_top_n": 3 }
//! }
//! ```

mod engine;
mod error;
mod rag;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use engine::EngineConfig;
pub use error::ConfigError;
pub use rag::RagConfig;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub engine: EngineConfig,
  pub rag: RagConfig,
}

impl Config {
  /// Parse a configuration from JSON text.
  pub fn from_json(json: &str) -> Result<Self, ConfigError> {
    let config: Config = serde_json::from_str(json).map_err(ConfigError::Parse)?;
    config.validate()?;
    Ok(config)
  }

  /// Load a configuration file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json(&content)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    self.engine.validate()?;
    self.rag.validate()
  }
}
