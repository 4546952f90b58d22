use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use eventflow_context::SharedContext;
use eventflow_event::{Event, EventKind};

use crate::error::StepError;

/// Future returned by a step invocation.
pub type StepFuture = Pin<Box<dyn Future<Output = Result<Option<Event>, StepError>> + Send>>;

/// Type-erased step body.
pub type StepBody = Arc<dyn Fn(SharedContext, Event) -> StepFuture + Send + Sync>;

/// A registered unit of computation.
///
/// `emits` lists every kind the body may return; an empty list means the
/// step only ever returns `None`. Returning `None` is always allowed.
#[derive(Clone)]
pub struct StepDef {
  name: String,
  accepts: EventKind,
  emits: Vec<EventKind>,
  body: StepBody,
}

impl StepDef {
  pub fn new<F, Fut>(
    name: impl Into<String>,
    accepts: impl Into<EventKind>,
    emits: impl IntoIterator<Item = EventKind>,
    body: F,
  ) -> Self
  where
    F: Fn(SharedContext, Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Event>, StepError>> + Send + 'static,
  {
    let mut emits: Vec<EventKind> = emits.into_iter().collect();
    emits.sort();
    emits.dedup();

    Self {
      name: name.into(),
      accepts: accepts.into(),
      emits,
      body: Arc::new(move |ctx, event| Box::pin(body(ctx, event))),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn accepts(&self) -> &EventKind {
    &self.accepts
  }

  pub fn emits(&self) -> &[EventKind] {
    &self.emits
  }

  /// Whether `kind` is among the declared outputs.
  pub fn declares(&self, kind: &EventKind) -> bool {
    self.emits.binary_search(kind).is_ok()
  }

  /// Invoke the body.
  pub fn invoke(&self, ctx: SharedContext, event: Event) -> StepFuture {
    (self.body)(ctx, event)
  }
}

impl std::fmt::Debug for StepDef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("accepts", &self.accepts)
      .field("emits", &self.emits)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use eventflow_event::Payload;
  use tokio_util::sync::CancellationToken;

  #[test]
  fn test_emits_are_sorted_and_deduplicated() {
    let step = StepDef::new(
      "s",
      EventKind::Start,
      [EventKind::Stop, EventKind::custom("b"), EventKind::Stop],
      |_ctx, _event| async { Ok(None) },
    );

    assert_eq!(step.emits(), &[EventKind::Stop, EventKind::custom("b")]);
    assert!(step.declares(&EventKind::Stop));
    assert!(!step.declares(&EventKind::custom("c")));
  }

  #[tokio::test]
  async fn test_invoke_runs_body() {
    let step = StepDef::new("echo", EventKind::Start, [EventKind::Stop], |_ctx, event: Event| async move {
      Ok(Some(Event::stop(event.into_data())))
    });

    let (ctx, _stream) = SharedContext::new("run", CancellationToken::new());
    let mut data = Payload::new();
    data.insert("x".to_string(), serde_json::json!(1));

    let out = step.invoke(ctx, Event::start(data)).await.unwrap().unwrap();
    assert!(out.kind().is_stop());
    assert_eq!(out.data()["x"], serde_json::json!(1));
  }
}
