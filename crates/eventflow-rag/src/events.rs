use eventflow_event::TypedEvent;
use serde::{Deserialize, Serialize};

use crate::types::ScoredChunk;

/// Chunks returned by retrieval, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrieverEvent {
  pub nodes: Vec<ScoredChunk>,
}

impl TypedEvent for RetrieverEvent {
  const KIND: &'static str = "retriever";
}

/// Chunks kept by the reranker, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankEvent {
  pub nodes: Vec<ScoredChunk>,
}

impl TypedEvent for RerankEvent {
  const KIND: &'static str = "rerank";
}
