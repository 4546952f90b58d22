use std::collections::HashSet;

use crate::keyword::tokenize;
use crate::services::{Reranker, ServiceFuture};
use crate::types::ScoredChunk;

/// Rescores chunks by the share of distinct query terms they contain.
///
/// Chunks covering none of the query are dropped. Ties keep the retrieval
/// order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermCoverageReranker;

impl TermCoverageReranker {
  fn coverage(terms: &HashSet<String>, text: &str) -> f32 {
    if terms.is_empty() {
      return 0.0;
    }
    let present: HashSet<String> = tokenize(text).into_iter().collect();
    let hits = terms.iter().filter(|term| present.contains(*term)).count();
    hits as f32 / terms.len() as f32
  }
}

impl Reranker for TermCoverageReranker {
  fn rerank<'a>(
    &'a self,
    query: &'a str,
    nodes: Vec<ScoredChunk>,
    top_n: usize,
  ) -> ServiceFuture<'a, Vec<ScoredChunk>> {
    Box::pin(async move {
      let terms: HashSet<String> = tokenize(query).into_iter().collect();
      let mut rescored: Vec<ScoredChunk> = nodes
        .into_iter()
        .map(|node| ScoredChunk {
          score: Self::coverage(&terms, &node.chunk.text),
          chunk: node.chunk,
        })
        .filter(|node| node.score > 0.0)
        .collect();
      rescored.sort_by(|a, b| b.score.total_cmp(&a.score));
      rescored.truncate(top_n);
      Ok(rescored)
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::Chunk;

  fn node(id: &str, text: &str, score: f32) -> ScoredChunk {
    ScoredChunk {
      chunk: Chunk {
        id: id.to_string(),
        source: "doc.md".to_string(),
        text: text.to_string(),
      },
      score,
    }
  }

  #[tokio::test]
  async fn test_rerank_orders_by_coverage_and_truncates() {
    let nodes = vec![
      node("partial", "llama models", 0.9),
      node("full", "llama was trained on tokens", 0.1),
      node("none", "unrelated", 0.5),
    ];

    let out = TermCoverageReranker
      .rerank("llama trained tokens", nodes, 3)
      .await
      .unwrap();

    let ids: Vec<_> = out.iter().map(|n| n.chunk.id.as_str()).collect();
    assert_eq!(ids, vec!["full", "partial"]);
    assert_eq!(out[0].score, 1.0);
  }

  #[tokio::test]
  async fn test_rerank_respects_top_n() {
    let nodes = vec![node("a", "llama", 1.0), node("b", "llama", 1.0)];
    let out = TermCoverageReranker.rerank("llama", nodes, 1).await.unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].chunk.id, "a");
  }
}
