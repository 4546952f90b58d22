use std::path::PathBuf;
use std::sync::Arc;

use eventflow_config::RagConfig;
use eventflow_context::SharedContext;
use eventflow_event::{Event, EventKind, Payload, TypedEvent};
use eventflow_workflow::{GraphError, StepError, Workflow};
use futures::StreamExt;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::events::{RerankEvent, RetrieverEvent};
use crate::services::RagServices;
use crate::types::{Index, ScoredChunk};

/// Payload fields and context keys used by the retrieval workflow.
pub mod fields {
  /// Start field selecting the ingest branch: directory to load.
  pub const DIRNAME: &str = "dirname";
  /// Start field selecting the query branch, and the context key it is
  /// stored under.
  pub const QUERY: &str = "query";
  /// Stop field of the ingest branch; start field of the query branch.
  pub const INDEX: &str = "index";
  /// Stop field holding the full answer text.
  pub const RESPONSE: &str = "response";
  /// Stop field listing the chunks the answer was built from.
  pub const SOURCES: &str = "sources";
  /// Kind of the events streamed while the answer is produced.
  pub const RESPONSE_DELTA: &str = "response_delta";
  /// Field of a streamed event holding one answer fragment.
  pub const DELTA: &str = "delta";
}

/// Build the ingest/retrieve/rerank/synthesize workflow over `services`.
///
/// Start with `{dirname}` to build an index; the run stops with `{index}`.
/// Start with `{query, index}` to answer a question; the run stops with
/// `{response, sources}` and streams each answer fragment as a
/// `response_delta` event while it is produced.
pub fn rag_workflow(services: RagServices, config: RagConfig) -> Result<Workflow, GraphError> {
  let services = Arc::new(services);
  let config = Arc::new(config);

  let ingest = {
    let services = Arc::clone(&services);
    move |_ctx: SharedContext, event: Event| {
      let services = Arc::clone(&services);
      async move {
        let Some(dirname) = event.get_str(fields::DIRNAME) else {
          return Ok(None);
        };
        let dir = PathBuf::from(dirname);
        let chunks = services.loader.load(&dir).await.map_err(StepError::other)?;
        let index = services.indexer.build(chunks).await.map_err(StepError::other)?;
        info!(dir = %dir.display(), chunks = index.len(), "index built");

        let mut out = Payload::new();
        out.insert(fields::INDEX.to_string(), to_value(&index)?);
        Ok(Some(Event::stop(out)))
      }
    }
  };

  let retrieve = {
    let services = Arc::clone(&services);
    let config = Arc::clone(&config);
    move |ctx: SharedContext, event: Event| {
      let services = Arc::clone(&services);
      let config = Arc::clone(&config);
      async move {
        let Some(query) = event.get_str(fields::QUERY) else {
          return Ok(None);
        };
        let index: Index = match event.get(fields::INDEX) {
          Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| StepError::msg(format!("invalid '{}' field: {e}", fields::INDEX)))?,
          None => return Err(StepError::missing_field(fields::INDEX)),
        };

        ctx.set(fields::QUERY, json!(query)).await?;
        let nodes = services
          .indexer
          .retrieve(&index, query, config.similarity_top_k)
          .await
          .map_err(StepError::other)?;
        debug!(retrieved = nodes.len(), "retrieved nodes");

        Ok(Some(Event::from_typed(&RetrieverEvent { nodes })?))
      }
    }
  };

  let rerank = {
    let services = Arc::clone(&services);
    let config = Arc::clone(&config);
    move |ctx: SharedContext, event: Event| {
      let services = Arc::clone(&services);
      let config = Arc::clone(&config);
      async move {
        let RetrieverEvent { nodes } = event.parse()?;
        let query = context_query(&ctx).await?;
        let nodes = services
          .reranker
          .rerank(&query, nodes, config.rerank_top_n)
          .await
          .map_err(StepError::other)?;
        debug!(kept = nodes.len(), "reranked nodes");

        Ok(Some(Event::from_typed(&RerankEvent { nodes })?))
      }
    }
  };

  let synthesize = {
    let services = Arc::clone(&services);
    move |ctx: SharedContext, event: Event| {
      let services = Arc::clone(&services);
      async move {
        let RerankEvent { nodes } = event.parse()?;
        let query = context_query(&ctx).await?;
        let sources = sources(&nodes);

        let mut fragments = services.synthesizer.synthesize(query, nodes);
        let mut response = String::new();
        while let Some(fragment) = fragments.next().await {
          let fragment = fragment.map_err(StepError::other)?;
          let mut delta = Payload::new();
          delta.insert(fields::DELTA.to_string(), json!(fragment));
          ctx.write_event_to_stream(Event::new(fields::RESPONSE_DELTA, delta))?;
          response.push_str(&fragment);
        }

        let mut out = Payload::new();
        out.insert(fields::RESPONSE.to_string(), json!(response));
        out.insert(fields::SOURCES.to_string(), sources);
        Ok(Some(Event::stop(out)))
      }
    }
  };

  Workflow::builder("rag")
    .step("ingest", EventKind::Start, [EventKind::Stop], ingest)
    .step(
      "retrieve",
      EventKind::Start,
      [EventKind::custom(RetrieverEvent::KIND)],
      retrieve,
    )
    .step(
      "rerank",
      RetrieverEvent::KIND,
      [EventKind::custom(RerankEvent::KIND)],
      rerank,
    )
    .step("synthesize", RerankEvent::KIND, [EventKind::Stop], synthesize)
    .build()
}

async fn context_query(ctx: &SharedContext) -> Result<String, StepError> {
  ctx
    .get_as::<String>(fields::QUERY)
    .await?
    .ok_or_else(|| StepError::missing_field(fields::QUERY))
}

fn sources(nodes: &[ScoredChunk]) -> Value {
  nodes
    .iter()
    .map(|node| {
      json!({
        "id": node.chunk.id,
        "source": node.chunk.source,
        "score": node.score,
      })
    })
    .collect()
}

fn to_value(index: &Index) -> Result<Value, StepError> {
  serde_json::to_value(index).map_err(StepError::other)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn workflow() -> Workflow {
    let config = RagConfig::default();
    rag_workflow(RagServices::keyword(&config), config).unwrap()
  }

  #[test]
  fn test_rag_workflow_is_valid() {
    let workflow = workflow();

    assert_eq!(workflow.name(), "rag");
    assert_eq!(workflow.steps().len(), 4);

    let entries: Vec<_> = workflow
      .graph()
      .entry_steps()
      .iter()
      .filter_map(|&idx| workflow.step(idx))
      .map(|step| step.name())
      .collect();
    assert_eq!(entries, vec!["ingest", "retrieve"]);
  }

  #[test]
  fn test_rag_steps_declare_their_outputs() {
    let workflow = workflow();

    let retrieve = workflow.get_step("retrieve").unwrap();
    assert!(retrieve.declares(&EventKind::custom(RetrieverEvent::KIND)));

    let synthesize = workflow.get_step("synthesize").unwrap();
    assert_eq!(synthesize.accepts(), &EventKind::custom(RerankEvent::KIND));
    assert!(synthesize.declares(&EventKind::Stop));
  }

  #[test]
  fn test_sources_lists_chunk_ids_in_order() {
    let node = |id: &str| ScoredChunk {
      chunk: crate::types::Chunk {
        id: id.to_string(),
        source: "doc.txt".to_string(),
        text: String::new(),
      },
      score: 0.5,
    };

    let value = sources(&[node("a#0"), node("b#1")]);
    let ids: Vec<_> = value
      .as_array()
      .unwrap()
      .iter()
      .map(|s| s["id"].as_str().unwrap())
      .collect();
    assert_eq!(ids, vec!["a#0", "b#1"]);
  }
}
