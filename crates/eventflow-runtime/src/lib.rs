//! Eventflow Runtime
//!
//! This crate provides the workflow engine. A [`WorkflowEngine`] owns one
//! validated [`Workflow`](eventflow_workflow::Workflow) and executes it once
//! per call to [`WorkflowEngine::run`].
//!
//! # Execution model
//!
//! ```text
//!   payload ──► Start event ──► queue
//!                                 │
//!             ┌───────────────────┘
//!             ▼
//!   dispatch round: every queued event × every step accepting its kind
//!             │        (one tokio task per invocation)
//!             ▼
//!   completions ──► Stop?  ──yes──► cancel siblings, drain, return payload
//!             │
//!             └──► other events queued in spawn order ──► next round
//! ```
//!
//! A run fails if a step fails or panics, if the queue empties without a
//! stop event, on timeout, on invocation limit, or on external cancellation.
//! Every exit path cancels in-flight steps and waits for them before the
//! run's [`SharedContext`](eventflow_context::SharedContext) is torn down.
//!
//! # Usage
//!
//! ```ignore
//! let engine = WorkflowEngine::new(workflow, EngineConfig::default());
//!
//! let mut run = engine.start(payload, CancellationToken::new());
//! let mut stream = run.events().unwrap();
//! tokio::spawn(async move {
//!   while let Some(event) = stream.recv().await {
//!     println!("{:?}", event);
//!   }
//! });
//!
//! let result = run.wait().await?;
//! ```

mod engine;
mod error;
mod events;
mod result;
mod state;

pub use engine::{Run, WorkflowEngine};
pub use error::RunError;
pub use events::{ChannelNotifier, NoopNotifier, RunEvent, RunNotifier};
pub use result::RunResult;
pub use state::RunState;

pub use eventflow_config::EngineConfig;
