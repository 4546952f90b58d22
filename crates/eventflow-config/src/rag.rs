use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings for the ingest/retrieve/rerank/synthesize pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
  /// Number of chunks returned by retrieval.
  pub similarity_top_k: usize,

  /// Number of chunks kept after reranking.
  pub rerank_top_n: usize,

  /// Maximum chunk length in characters.
  pub chunk_size: usize,

  /// File extensions picked up by the directory loader.
  pub extensions: Vec<String>,
}

impl Default for RagConfig {
  fn default() -> Self {
    Self {
      similarity_top_k: 2,
      rerank_top_n: 3,
      chunk_size: 1024,
      extensions: vec!["txt".to_string(), "md".to_string()],
    }
  }
}

impl RagConfig {
  pub(crate) fn validate(&self) -> Result<(), ConfigError> {
    let positive = [
      ("rag.similarity_top_k", self.similarity_top_k),
      ("rag.rerank_top_n", self.rerank_top_n),
      ("rag.chunk_size", self.chunk_size),
    ];
    for (field, value) in positive {
      if value == 0 {
        return Err(ConfigError::Invalid {
          field,
          message: "must be at least 1".to_string(),
        });
      }
    }
    Ok(())
  }
}
