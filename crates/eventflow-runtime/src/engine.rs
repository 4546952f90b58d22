//! Workflow engine.
//!
//! The [`WorkflowEngine`] owns a validated workflow and executes it once per
//! [`run`](WorkflowEngine::run). Each dispatch round spawns one task per
//! (event, accepting step) pair and processes completions as they arrive.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;

use eventflow_config::EngineConfig;
use eventflow_context::{EventStream, SharedContext};
use eventflow_event::{Event, EventKind, Payload};
use eventflow_workflow::{StepDef, StepError, Workflow};
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::RunError;
use crate::events::{NoopNotifier, RunEvent, RunNotifier};
use crate::result::RunResult;
use crate::state::RunState;

/// Handle for a spawned step invocation; yields its slot in the round.
type StepHandle = JoinHandle<(usize, StepOutcome)>;

/// How a single step invocation ended.
enum StepOutcome {
  Finished(Result<Option<Event>, StepError>),
  Panicked(String),
  Cancelled,
}

/// One dispatched invocation within a round.
struct Invocation {
  step: StepDef,
  kind: EventKind,
  output: Option<Event>,
}

/// What woke the dispatch loop.
enum Wake {
  Completed(Option<Result<(usize, StepOutcome), JoinError>>),
  Deadline,
  Cancelled,
}

/// The workflow execution engine.
///
/// Generic over `N: RunNotifier` to allow different notification strategies.
/// Use `WorkflowEngine::new()` for an engine with no-op notifications,
/// or `WorkflowEngine::with_notifier()` to observe runs.
pub struct WorkflowEngine<N: RunNotifier = NoopNotifier> {
  workflow: Workflow,
  config: EngineConfig,
  notifier: N,
}

impl WorkflowEngine<NoopNotifier> {
  /// Create a new engine with no-op notifications.
  pub fn new(workflow: Workflow, config: EngineConfig) -> Self {
    Self::with_notifier(workflow, config, NoopNotifier)
  }
}

impl<N: RunNotifier> WorkflowEngine<N> {
  /// Create a new engine with a custom notifier.
  pub fn with_notifier(workflow: Workflow, config: EngineConfig, notifier: N) -> Self {
    Self {
      workflow,
      config,
      notifier,
    }
  }

  pub fn workflow(&self) -> &Workflow {
    &self.workflow
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Prepare a run without starting it.
  ///
  /// The run's cancellation token is a child of `cancel`, so cancelling
  /// `cancel` aborts the run while the engine's own cancellation of
  /// abandoned steps never propagates back to the caller.
  pub fn start(&self, payload: Payload, cancel: CancellationToken) -> Run<'_, N> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let run_cancel = cancel.child_token();
    let (ctx, stream) = SharedContext::new(run_id.clone(), run_cancel.clone());
    let (state, _) = watch::channel(RunState::Created);

    Run {
      engine: self,
      run_id,
      payload,
      cancel: run_cancel,
      ctx,
      stream: Some(stream),
      state,
    }
  }

  /// Execute one run with the given start payload.
  pub async fn run(&self, payload: Payload) -> Result<RunResult, RunError> {
    self.start(payload, CancellationToken::new()).wait().await
  }

  /// Execute one run that aborts when `cancel` fires.
  pub async fn run_with_cancel(
    &self,
    payload: Payload,
    cancel: CancellationToken,
  ) -> Result<RunResult, RunError> {
    self.start(payload, cancel).wait().await
  }
}

/// A single workflow run.
///
/// Call `.wait()` to execute it. Grab [`state`](Run::state) and
/// [`events`](Run::events) first if you need them.
pub struct Run<'a, N: RunNotifier> {
  engine: &'a WorkflowEngine<N>,
  run_id: String,
  payload: Payload,
  cancel: CancellationToken,
  ctx: SharedContext,
  stream: Option<EventStream>,
  state: watch::Sender<RunState>,
}

impl<'a, N: RunNotifier> Run<'a, N> {
  pub fn run_id(&self) -> &str {
    &self.run_id
  }

  /// Watch the run's lifecycle state.
  pub fn state(&self) -> watch::Receiver<RunState> {
    self.state.subscribe()
  }

  /// Take the stream of events steps write with `write_event_to_stream`.
  ///
  /// Returns `None` after the first call.
  pub fn events(&mut self) -> Option<EventStream> {
    self.stream.take()
  }

  /// Execute the run to completion.
  #[instrument(
    name = "workflow_run",
    skip(self),
    fields(
      workflow = %self.engine.workflow.name(),
      run_id = %self.run_id,
    )
  )]
  pub async fn wait(mut self) -> Result<RunResult, RunError> {
    let payload = std::mem::take(&mut self.payload);

    self.transition(RunState::Running);
    info!(
      run_id = %self.run_id,
      fields = ?payload.keys().collect::<Vec<_>>(),
      "run_started"
    );
    debug!(
      run_id = %self.run_id,
      payload = %serde_json::Value::Object(payload.clone()),
      "start payload"
    );
    self.engine.notifier.notify(RunEvent::RunStarted {
      run_id: self.run_id.clone(),
      workflow: self.engine.workflow.name().to_string(),
    });

    let outcome = self.drive(payload).await;

    // No invocation is in flight past this point
    self.cancel.cancel();
    self.ctx.teardown().await;

    match outcome {
      Ok((stop, invocations)) => {
        let output = stop.into_data();
        info!(run_id = %self.run_id, invocations, "run_completed");
        self.engine.notifier.notify(RunEvent::RunCompleted {
          run_id: self.run_id.clone(),
        });
        self.transition(RunState::Completed(output.clone()));
        Ok(RunResult {
          run_id: self.run_id.clone(),
          output,
          invocations,
        })
      }
      Err(e) => {
        error!(run_id = %self.run_id, error = %e, "run_failed");
        self.engine.notifier.notify(RunEvent::RunFailed {
          run_id: self.run_id.clone(),
          error: e.to_string(),
        });
        self.transition(RunState::Failed(e.to_string()));
        Err(e)
      }
    }
  }

  /// Dispatch rounds until a stop event or a failure.
  async fn drive(&self, payload: Payload) -> Result<(Event, usize), RunError> {
    let config = &self.engine.config;
    let deadline = config.timeout().map(|timeout| Instant::now() + timeout);
    let mut queue = VecDeque::from([Event::start(payload)]);
    let mut invocations = 0usize;

    loop {
      if self.cancel.is_cancelled() {
        warn!(run_id = %self.run_id, "run cancelled");
        return Err(RunError::Cancelled);
      }
      if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
        warn!(run_id = %self.run_id, "run timed out");
        return Err(self.timeout_error());
      }
      if queue.is_empty() {
        warn!(run_id = %self.run_id, invocations, "queue drained without a stop event");
        return Err(RunError::NoTermination { invocations });
      }

      let mut round: Vec<Invocation> = Vec::new();
      let mut tasks: FuturesUnordered<StepHandle> = FuturesUnordered::new();

      for event in queue.drain(..) {
        for (_, step) in self.engine.workflow.steps_for(event.kind()) {
          if let Some(limit) = config.max_step_invocations {
            if invocations >= limit {
              warn!(run_id = %self.run_id, limit, "invocation limit reached");
              self.abandon(&mut tasks).await;
              return Err(RunError::InvocationLimitExceeded { limit });
            }
          }
          invocations += 1;

          let slot = round.len();
          round.push(Invocation {
            step: step.clone(),
            kind: event.kind().clone(),
            output: None,
          });

          debug!(run_id = %self.run_id, step = %step.name(), kind = %event.kind(), "step_started");
          self.engine.notifier.notify(RunEvent::StepStarted {
            run_id: self.run_id.clone(),
            step: step.name().to_string(),
            kind: event.kind().clone(),
          });

          let step = step.clone();
          let ctx = self.ctx.clone();
          let event = event.clone();
          let cancel = self.cancel.clone();
          tasks.push(tokio::spawn(async move {
            (slot, run_step(step, ctx, event, cancel).await)
          }));
        }
      }

      loop {
        let wake = tokio::select! {
          next = tasks.next() => Wake::Completed(next),
          _ = sleep_until(deadline) => Wake::Deadline,
          _ = self.cancel.cancelled() => Wake::Cancelled,
        };

        let (slot, outcome) = match wake {
          Wake::Completed(None) => break,
          Wake::Completed(Some(Ok(done))) => done,
          Wake::Completed(Some(Err(e))) => {
            // Step panics are caught inside the task; this is a runtime shutdown
            error!(run_id = %self.run_id, error = %e, "step task join error");
            self.abandon(&mut tasks).await;
            return Err(RunError::Cancelled);
          }
          Wake::Deadline => {
            warn!(run_id = %self.run_id, "run timed out during step execution");
            self.abandon(&mut tasks).await;
            return Err(self.timeout_error());
          }
          Wake::Cancelled => {
            warn!(run_id = %self.run_id, "run cancelled during step execution");
            self.abandon(&mut tasks).await;
            return Err(RunError::Cancelled);
          }
        };

        let invocation = &mut round[slot];
        let step_name = invocation.step.name().to_string();

        match outcome {
          StepOutcome::Cancelled => {}
          StepOutcome::Panicked(message) => {
            let err = RunError::StepPanicked {
              step: step_name,
              kind: invocation.kind.clone(),
              message,
            };
            return Err(self.step_failed(&mut tasks, err).await);
          }
          StepOutcome::Finished(Err(source)) => {
            let err = RunError::StepExecution {
              step: step_name,
              kind: invocation.kind.clone(),
              source,
            };
            return Err(self.step_failed(&mut tasks, err).await);
          }
          StepOutcome::Finished(Ok(None)) => {
            debug!(run_id = %self.run_id, step = %step_name, "step_completed without event");
            self.engine.notifier.notify(RunEvent::StepCompleted {
              run_id: self.run_id.clone(),
              step: step_name,
              emitted: None,
            });
          }
          StepOutcome::Finished(Ok(Some(event))) => {
            let emitted = event.kind().clone();
            if !emitted.is_stop() && !invocation.step.declares(&emitted) {
              let err = RunError::UndeclaredEvent {
                step: step_name,
                kind: invocation.kind.clone(),
                emitted,
              };
              return Err(self.step_failed(&mut tasks, err).await);
            }

            debug!(run_id = %self.run_id, step = %step_name, emitted = %emitted, "step_completed");
            self.engine.notifier.notify(RunEvent::StepCompleted {
              run_id: self.run_id.clone(),
              step: step_name.clone(),
              emitted: Some(emitted.clone()),
            });

            if emitted.is_stop() {
              info!(run_id = %self.run_id, step = %step_name, "stop event received");
              self.abandon(&mut tasks).await;
              return Ok((event, invocations));
            }
            invocation.output = Some(event);
          }
        }
      }

      queue.extend(round.into_iter().filter_map(|invocation| invocation.output));
    }
  }

  /// Report a step failure, then abandon the rest of the round.
  async fn step_failed(
    &self,
    tasks: &mut FuturesUnordered<StepHandle>,
    err: RunError,
  ) -> RunError {
    error!(run_id = %self.run_id, step = ?err.step(), error = %err, "step_failed");
    self.engine.notifier.notify(RunEvent::StepFailed {
      run_id: self.run_id.clone(),
      step: err.step().unwrap_or_default().to_string(),
      error: err.to_string(),
    });
    self.abandon(tasks).await;
    err
  }

  /// Signal cancellation to in-flight steps and wait for all of them.
  async fn abandon(&self, tasks: &mut FuturesUnordered<StepHandle>) {
    if tasks.is_empty() {
      return;
    }
    debug!(run_id = %self.run_id, in_flight = tasks.len(), "cancelling in-flight steps");
    self.cancel.cancel();
    while tasks.next().await.is_some() {}
  }

  fn timeout_error(&self) -> RunError {
    RunError::Timeout {
      timeout_ms: self.engine.config.timeout_ms.unwrap_or_default(),
    }
  }

  fn transition(&self, next: RunState) {
    self.state.send_if_modified(move |state| state.transition(next));
  }
}

/// A run dropped before it finishes (say, a caller timeout around `wait`)
/// cancels its in-flight steps and ends its event stream.
impl<N: RunNotifier> Drop for Run<'_, N> {
  fn drop(&mut self) {
    self.cancel.cancel();
    self.ctx.close();
  }
}

/// Run a step body until it returns, panics, or the run is cancelled.
///
/// A cancelled body is dropped at its next suspension point.
async fn run_step(
  step: StepDef,
  ctx: SharedContext,
  event: Event,
  cancel: CancellationToken,
) -> StepOutcome {
  let body = AssertUnwindSafe(step.invoke(ctx, event)).catch_unwind();

  tokio::select! {
    biased;
    _ = cancel.cancelled() => StepOutcome::Cancelled,
    result = body => match result {
      Ok(result) => StepOutcome::Finished(result),
      Err(panic) => StepOutcome::Panicked(panic_message(panic.as_ref())),
    },
  }
}

async fn sleep_until(deadline: Option<Instant>) {
  match deadline {
    Some(deadline) => tokio::time::sleep_until(deadline).await,
    None => std::future::pending().await,
  }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(message) = panic.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = panic.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic".to_string()
  }
}
