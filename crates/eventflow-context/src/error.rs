use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
  /// The run that owned this context has ended.
  #[error("context for run '{run_id}' has been torn down")]
  Closed { run_id: String },

  #[error("failed to encode value for key '{key}': {source}")]
  Encode {
    key: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to decode value for key '{key}': {source}")]
  Decode {
    key: String,
    #[source]
    source: serde_json::Error,
  },
}
