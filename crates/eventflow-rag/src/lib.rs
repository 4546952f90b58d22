//! Eventflow RAG
//!
//! A retrieval-augmented generation pipeline with a reranking stage, built
//! as an eventflow workflow of four steps:
//!
//! ```text
//!   Start{dirname}        ──► ingest     ──► Stop{index}
//!   Start{query, index}   ──► retrieve   ──► RetrieverEvent ──► rerank
//!                                               RerankEvent ◄──┘
//!                             synthesize ◄──────────┘ ──► Stop{response, sources}
//! ```
//!
//! Both `ingest` and `retrieve` accept the start event; each returns no
//! event when its payload field is absent, so the caller selects a branch
//! by which fields it sends. `retrieve` stores the query in the run context,
//! where `rerank` and `synthesize` read it back.
//!
//! The heavy lifting happens behind four service traits ([`DocumentLoader`],
//! [`Indexer`], [`Reranker`], [`Synthesizer`]). The implementations shipped
//! here are small keyword-based stand-ins so the pipeline runs offline.

mod error;
mod events;
mod keyword;
mod loader;
mod pipeline;
mod rerank;
mod services;
mod synth;
mod types;

pub use error::ServiceError;
pub use events::{RerankEvent, RetrieverEvent};
pub use keyword::{KeywordIndexer, tokenize};
pub use loader::DirectoryLoader;
pub use pipeline::{fields, rag_workflow};
pub use rerank::TermCoverageReranker;
pub use services::{
  DocumentLoader, FragmentStream, Indexer, RagServices, Reranker, ServiceFuture, Synthesizer,
};
pub use synth::ExtractiveSynthesizer;
pub use types::{Chunk, Index, ScoredChunk};
