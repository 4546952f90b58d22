use serde::{Deserialize, Serialize};

/// A piece of a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
  /// Stable identifier, `<path under the loaded directory>#<ordinal>`.
  pub id: String,
  /// Path of the source document.
  pub source: String,
  pub text: String,
}

/// A chunk with a relevance score; higher is more relevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
  pub chunk: Chunk,
  pub score: f32,
}

/// A searchable collection of chunks.
///
/// Serializable so it can travel as a run result and come back as the
/// payload of a later query run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
  pub chunks: Vec<Chunk>,
}

impl Index {
  pub fn len(&self) -> usize {
    self.chunks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.chunks.is_empty()
  }
}
