//! End-to-end runs of the retrieval workflow on the engine.

use std::path::Path;
use std::sync::{Arc, Mutex};

use eventflow_config::RagConfig;
use eventflow_event::Payload;
use eventflow_rag::{
  FragmentStream, Index, RagServices, Reranker, ScoredChunk, ServiceError, ServiceFuture,
  Synthesizer, TermCoverageReranker, fields, rag_workflow,
};
use eventflow_runtime::{EngineConfig, RunError, WorkflowEngine};
use eventflow_workflow::StepError;
use futures::StreamExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Records the query every rerank call sees, then defers to the real reranker.
#[derive(Default)]
struct RecordingReranker {
  queries: Mutex<Vec<String>>,
}

impl Reranker for RecordingReranker {
  fn rerank<'a>(
    &'a self,
    query: &'a str,
    nodes: Vec<ScoredChunk>,
    top_n: usize,
  ) -> ServiceFuture<'a, Vec<ScoredChunk>> {
    self.queries.lock().unwrap().push(query.to_string());
    TermCoverageReranker.rerank(query, nodes, top_n)
  }
}

/// Yields one fragment, then fails mid-answer.
struct FailingSynthesizer;

impl Synthesizer for FailingSynthesizer {
  fn synthesize(&self, _query: String, _nodes: Vec<ScoredChunk>) -> FragmentStream {
    futures::stream::iter([
      Ok("partial".to_string()),
      Err(ServiceError::failed("synthesizer", "model unavailable")),
    ])
    .boxed()
  }
}

fn payload(value: serde_json::Value) -> Payload {
  value.as_object().cloned().expect("payload must be an object")
}

async fn write_corpus(dir: &Path) {
  tokio::fs::write(
    dir.join("llama2.txt"),
    "Llama 2 was trained on two trillion tokens of publicly available data.\n\n\
     Fine-tuning used over one million human annotations.",
  )
  .await
  .unwrap();
  tokio::fs::write(dir.join("paris.md"), "Paris is the capital of France.")
    .await
    .unwrap();
}

fn engine(services: RagServices, config: RagConfig) -> WorkflowEngine {
  let workflow = rag_workflow(services, config).unwrap();
  WorkflowEngine::new(workflow, EngineConfig::default())
}

async fn ingest(engine: &WorkflowEngine, dir: &Path) -> serde_json::Value {
  let result = engine
    .run(payload(json!({ "dirname": dir.to_str().unwrap() })))
    .await
    .unwrap();
  result.output[fields::INDEX].clone()
}

#[tokio::test]
async fn test_ingest_then_query_answers_from_corpus() {
  let dir = tempfile::tempdir().unwrap();
  write_corpus(dir.path()).await;

  let config = RagConfig::default();
  let recorder = Arc::new(RecordingReranker::default());
  let services = RagServices::keyword(&config).with_reranker(recorder.clone());
  let engine = engine(services, config);

  let index = ingest(&engine, dir.path()).await;
  let parsed: Index = serde_json::from_value(index.clone()).unwrap();
  assert_eq!(parsed.len(), 2);

  let question = "How was Llama 2 trained?";
  let result = engine
    .run(payload(json!({ "query": question, "index": index })))
    .await
    .unwrap();

  let response = result.output[fields::RESPONSE].as_str().unwrap();
  assert!(!response.is_empty());
  assert!(response.contains("trained on two trillion tokens"));

  let sources = result.output[fields::SOURCES].as_array().unwrap();
  assert_eq!(sources[0]["id"], "llama2.txt#0");

  // ingest (no dirname), retrieve, rerank, synthesize
  assert_eq!(result.invocations, 4);
  assert_eq!(*recorder.queries.lock().unwrap(), vec![question.to_string()]);
}

#[tokio::test]
async fn test_query_streams_fragments_matching_response() {
  let dir = tempfile::tempdir().unwrap();
  write_corpus(dir.path()).await;

  let config = RagConfig::default();
  let engine = engine(RagServices::keyword(&config), config);
  let index = ingest(&engine, dir.path()).await;

  let mut run = engine.start(
    payload(json!({ "query": "llama tokens annotations", "index": index })),
    CancellationToken::new(),
  );
  let mut stream = run.events().unwrap();
  let result = run.wait().await.unwrap();

  let mut streamed = String::new();
  while let Some(event) = stream.recv().await {
    assert_eq!(event.kind().as_str(), fields::RESPONSE_DELTA);
    streamed.push_str(event.get_str(fields::DELTA).unwrap());
  }
  assert_eq!(streamed, result.output[fields::RESPONSE].as_str().unwrap());
}

#[tokio::test]
async fn test_start_without_known_fields_does_not_terminate() {
  let config = RagConfig::default();
  let engine = engine(RagServices::keyword(&config), config);

  let err = engine.run(payload(json!({ "unrelated": 1 }))).await.unwrap_err();
  assert!(matches!(err, RunError::NoTermination { invocations: 2 }));
}

#[tokio::test]
async fn test_query_without_index_fails_in_retrieve() {
  let config = RagConfig::default();
  let engine = engine(RagServices::keyword(&config), config);

  let err = engine
    .run(payload(json!({ "query": "anything" })))
    .await
    .unwrap_err();
  assert_eq!(err.step(), Some("retrieve"));
  assert!(matches!(
    err,
    RunError::StepExecution {
      source: StepError::MissingField { .. },
      ..
    }
  ));
}

#[tokio::test]
async fn test_ingest_of_empty_directory_fails() {
  let dir = tempfile::tempdir().unwrap();
  let config = RagConfig::default();
  let engine = engine(RagServices::keyword(&config), config);

  let err = engine
    .run(payload(json!({ "dirname": dir.path().to_str().unwrap() })))
    .await
    .unwrap_err();
  assert_eq!(err.step(), Some("ingest"));
}

#[tokio::test]
async fn test_synthesizer_failure_fails_run_after_streaming() {
  let dir = tempfile::tempdir().unwrap();
  write_corpus(dir.path()).await;

  let config = RagConfig::default();
  let services = RagServices::keyword(&config).with_synthesizer(Arc::new(FailingSynthesizer));
  let engine = engine(services, config);
  let index = ingest(&engine, dir.path()).await;

  let mut run = engine.start(
    payload(json!({ "query": "llama trained", "index": index })),
    CancellationToken::new(),
  );
  let mut stream = run.events().unwrap();
  let err = run.wait().await.unwrap_err();

  assert_eq!(err.step(), Some("synthesize"));
  assert!(err.to_string().contains("model unavailable"));
  let first = stream.recv().await.unwrap();
  assert_eq!(first.get_str(fields::DELTA), Some("partial"));
  assert!(stream.recv().await.is_none());
}

#[tokio::test]
async fn test_malformed_index_fails_in_retrieve() {
  let config = RagConfig::default();
  let engine = engine(RagServices::keyword(&config), config);

  let err = engine
    .run(payload(json!({ "query": "anything", "index": "not an index" })))
    .await
    .unwrap_err();
  assert_eq!(err.step(), Some("retrieve"));
  assert!(matches!(
    err,
    RunError::StepExecution {
      source: StepError::Message(_),
      ..
    }
  ));
}
