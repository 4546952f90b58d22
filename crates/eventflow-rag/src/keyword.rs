use std::collections::{HashMap, HashSet};

use crate::services::{Indexer, ServiceFuture};
use crate::types::{Chunk, Index, ScoredChunk};

const STOPWORDS: &[&str] = &[
  "a", "an", "and", "are", "as", "at", "be", "by", "did", "do", "does", "for", "from", "how", "in",
  "is", "it", "of", "on", "or", "that", "the", "this", "to", "was", "were", "what", "when", "which",
  "who", "why", "with",
];

/// Lowercased alphanumeric terms of `text`, stopwords removed.
pub fn tokenize(text: &str) -> Vec<String> {
  text
    .split(|c: char| !c.is_alphanumeric())
    .filter(|word| !word.is_empty())
    .map(str::to_lowercase)
    .filter(|word| !STOPWORDS.contains(&word.as_str()))
    .collect()
}

/// TF-IDF keyword scoring over the chunks of an [`Index`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordIndexer;

impl KeywordIndexer {
  fn score(index: &Index, query: &str, top_k: usize) -> Vec<ScoredChunk> {
    let terms: HashSet<String> = tokenize(query).into_iter().collect();
    if terms.is_empty() || top_k == 0 {
      return Vec::new();
    }

    let docs: Vec<Vec<String>> = index.chunks.iter().map(|c| tokenize(&c.text)).collect();
    let total = docs.len() as f32;

    let mut doc_freq: HashMap<&str, usize> = HashMap::new();
    for doc in &docs {
      let unique: HashSet<&str> = doc.iter().map(String::as_str).collect();
      for term in unique {
        if terms.contains(term) {
          *doc_freq.entry(term).or_default() += 1;
        }
      }
    }

    let mut scored: Vec<(usize, f32)> = docs
      .iter()
      .enumerate()
      .filter_map(|(idx, doc)| {
        if doc.is_empty() {
          return None;
        }
        let score: f32 = doc
          .iter()
          .filter_map(|term| doc_freq.get(term.as_str()))
          .map(|&df| (1.0 + total / df as f32).ln())
          .sum();
        (score > 0.0).then(|| (idx, score / (doc.len() as f32).sqrt()))
      })
      .collect();

    // Stable sort keeps index order among equal scores.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
      .into_iter()
      .take(top_k)
      .map(|(idx, score)| ScoredChunk {
        chunk: index.chunks[idx].clone(),
        score,
      })
      .collect()
  }
}

impl Indexer for KeywordIndexer {
  fn build(&self, chunks: Vec<Chunk>) -> ServiceFuture<'_, Index> {
    Box::pin(async move {
      let chunks = chunks
        .into_iter()
        .filter(|chunk| !chunk.text.trim().is_empty())
        .collect();
      Ok(Index { chunks })
    })
  }

  fn retrieve<'a>(
    &'a self,
    index: &'a Index,
    query: &'a str,
    top_k: usize,
  ) -> ServiceFuture<'a, Vec<ScoredChunk>> {
    Box::pin(async move { Ok(Self::score(index, query, top_k)) })
  }
}
