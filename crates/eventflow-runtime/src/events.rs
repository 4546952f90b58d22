//! Run events and notifiers for observability.
//!
//! Events are emitted during a run so consumers can observe progress,
//! persist state, stream to UIs, etc. They are separate from the workflow
//! events steps exchange.

use eventflow_event::EventKind;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during a workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunEvent {
  /// A run has started.
  RunStarted { run_id: String, workflow: String },

  /// A step invocation was dispatched.
  StepStarted {
    run_id: String,
    step: String,
    kind: EventKind,
  },

  /// A step invocation returned. `emitted` is `None` if it produced no event.
  StepCompleted {
    run_id: String,
    step: String,
    emitted: Option<EventKind>,
  },

  /// A step invocation failed.
  StepFailed {
    run_id: String,
    step: String,
    error: String,
  },

  /// The run ended with a stop event.
  RunCompleted { run_id: String },

  /// The run failed.
  RunFailed { run_id: String, error: String },
}

/// Trait for receiving run events.
///
/// The engine calls `notify` for each event from its dispatch loop, so
/// implementations should not block.
pub trait RunNotifier: Send + Sync {
  fn notify(&self, event: RunEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl RunNotifier for NoopNotifier {
  fn notify(&self, _event: RunEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls dispatch; volume is a handful
  // of events per step invocation.
  sender: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<RunEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with its receiving end.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl RunNotifier for ChannelNotifier {
  fn notify(&self, event: RunEvent) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
