use std::collections::HashSet;

use futures::StreamExt;

use crate::keyword::tokenize;
use crate::services::{FragmentStream, Synthesizer};
use crate::types::ScoredChunk;

/// Answers with the context sentences that mention the query's terms,
/// emitted one sentence per fragment.
#[derive(Debug, Clone)]
pub struct ExtractiveSynthesizer {
  /// Upper bound on sentences in one answer.
  pub max_sentences: usize,
  /// Returned when no sentence matches.
  pub fallback: String,
}

impl Default for ExtractiveSynthesizer {
  fn default() -> Self {
    Self {
      max_sentences: 5,
      fallback: "No relevant context found.".to_string(),
    }
  }
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
  text
    .split_inclusive(['.', '!', '?', '\n'])
    .map(str::trim)
    .filter(|s| !s.is_empty())
}

impl Synthesizer for ExtractiveSynthesizer {
  fn synthesize(&self, query: String, nodes: Vec<ScoredChunk>) -> FragmentStream {
    let terms: HashSet<String> = tokenize(&query).into_iter().collect();

    let mut picked: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    'nodes: for node in &nodes {
      for sentence in sentences(&node.chunk.text) {
        if picked.len() >= self.max_sentences {
          break 'nodes;
        }
        let relevant = tokenize(sentence).iter().any(|t| terms.contains(t));
        if relevant && seen.insert(sentence.to_string()) {
          picked.push(sentence.to_string());
        }
      }
    }

    if picked.is_empty() {
      picked.push(self.fallback.clone());
    }

    let last = picked.len() - 1;
    futures::stream::iter(picked.into_iter().enumerate().map(move |(i, sentence)| {
      if i < last {
        Ok(format!("{sentence} "))
      } else {
        Ok(sentence)
      }
    }))
    .boxed()
  }
}
