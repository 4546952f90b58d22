use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use eventflow_config::RagConfig;
use futures::stream::BoxStream;

use crate::error::ServiceError;
use crate::keyword::KeywordIndexer;
use crate::loader::DirectoryLoader;
use crate::rerank::TermCoverageReranker;
use crate::synth::ExtractiveSynthesizer;
use crate::types::{Chunk, Index, ScoredChunk};

/// Boxed future returned by the service traits.
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ServiceError>> + Send + 'a>>;

/// Lazily produced answer text. Finite; ends when the answer is complete.
pub type FragmentStream = BoxStream<'static, Result<String, ServiceError>>;

/// Reads a directory of documents into chunks.
pub trait DocumentLoader: Send + Sync {
  fn load<'a>(&'a self, dir: &'a Path) -> ServiceFuture<'a, Vec<Chunk>>;
}

/// Builds a searchable index and answers similarity queries against it.
pub trait Indexer: Send + Sync {
  fn build(&self, chunks: Vec<Chunk>) -> ServiceFuture<'_, Index>;

  /// At most `top_k` chunks, best first.
  fn retrieve<'a>(
    &'a self,
    index: &'a Index,
    query: &'a str,
    top_k: usize,
  ) -> ServiceFuture<'a, Vec<ScoredChunk>>;
}

/// Reorders retrieved chunks by relevance to the query, keeping the best.
pub trait Reranker: Send + Sync {
  /// At most `top_n` chunks, best first.
  fn rerank<'a>(
    &'a self,
    query: &'a str,
    nodes: Vec<ScoredChunk>,
    top_n: usize,
  ) -> ServiceFuture<'a, Vec<ScoredChunk>>;
}

/// Produces an answer to the query from the given context chunks.
pub trait Synthesizer: Send + Sync {
  fn synthesize(&self, query: String, nodes: Vec<ScoredChunk>) -> FragmentStream;
}

/// The services a retrieval workflow calls into.
#[derive(Clone)]
pub struct RagServices {
  pub loader: Arc<dyn DocumentLoader>,
  pub indexer: Arc<dyn Indexer>,
  pub reranker: Arc<dyn Reranker>,
  pub synthesizer: Arc<dyn Synthesizer>,
}

impl RagServices {
  /// Offline keyword-based services.
  pub fn keyword(config: &RagConfig) -> Self {
    Self {
      loader: Arc::new(DirectoryLoader::new(
        config.extensions.clone(),
        config.chunk_size,
      )),
      indexer: Arc::new(KeywordIndexer),
      reranker: Arc::new(TermCoverageReranker),
      synthesizer: Arc::new(ExtractiveSynthesizer::default()),
    }
  }

  pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
    self.reranker = reranker;
    self
  }

  pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
    self.synthesizer = synthesizer;
    self
  }
}

impl std::fmt::Debug for RagServices {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RagServices").finish_non_exhaustive()
  }
}
