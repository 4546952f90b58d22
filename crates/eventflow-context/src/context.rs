use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use eventflow_event::Event;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::ContextError;
use crate::store::{ContextStore, InMemoryStore};
use crate::stream::EventStream;

/// Per-run shared state handed to every step invocation.
///
/// Cloning is cheap; all clones refer to the same run.
#[derive(Clone)]
pub struct SharedContext {
  inner: Arc<Inner>,
}

struct Inner {
  run_id: String,
  store: Arc<dyn ContextStore>,
  cancel: CancellationToken,
  stream: Mutex<Option<mpsc::UnboundedSender<Event>>>,
  closed: AtomicBool,
}

impl SharedContext {
  /// Create a context backed by an [`InMemoryStore`].
  pub fn new(run_id: impl Into<String>, cancel: CancellationToken) -> (Self, EventStream) {
    Self::with_store(run_id, Arc::new(InMemoryStore::new()), cancel)
  }

  /// Create a context backed by a custom store.
  ///
  /// Returns the context and the read end of the run's event stream.
  pub fn with_store(
    run_id: impl Into<String>,
    store: Arc<dyn ContextStore>,
    cancel: CancellationToken,
  ) -> (Self, EventStream) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let ctx = Self {
      inner: Arc::new(Inner {
        run_id: run_id.into(),
        store,
        cancel,
        stream: Mutex::new(Some(sender)),
        closed: AtomicBool::new(false),
      }),
    };
    (ctx, EventStream::new(receiver))
  }

  pub fn run_id(&self) -> &str {
    &self.inner.run_id
  }

  /// Get the value stored under `key`.
  pub async fn get(&self, key: &str) -> Option<Value> {
    self.inner.store.get(key).await
  }

  /// Get the value stored under `key`, or `default` if absent.
  pub async fn get_or(&self, key: &str, default: Value) -> Value {
    self.get(key).await.unwrap_or(default)
  }

  /// Get and decode the value stored under `key`.
  pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ContextError> {
    match self.get(key).await {
      Some(value) => serde_json::from_value(value)
        .map(Some)
        .map_err(|source| ContextError::Decode {
          key: key.to_string(),
          source,
        }),
      None => Ok(None),
    }
  }

  /// Store `value` under `key`, replacing any previous value.
  ///
  /// Returns once the store reflects the write.
  pub async fn set(&self, key: &str, value: Value) -> Result<(), ContextError> {
    self.ensure_open()?;
    self.inner.store.set(key, value).await;
    Ok(())
  }

  /// Encode and store `value` under `key`.
  pub async fn set_as<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ContextError> {
    let value = serde_json::to_value(value).map_err(|source| ContextError::Encode {
      key: key.to_string(),
      source,
    })?;
    self.set(key, value).await
  }

  pub async fn remove(&self, key: &str) -> Result<Option<Value>, ContextError> {
    self.ensure_open()?;
    Ok(self.inner.store.remove(key).await)
  }

  pub async fn contains(&self, key: &str) -> bool {
    self.get(key).await.is_some()
  }

  /// Copy of all entries currently stored.
  pub async fn snapshot(&self) -> HashMap<String, Value> {
    self.inner.store.snapshot().await
  }

  /// Publish an event on the run's caller-facing stream.
  ///
  /// Streamed events are not dispatched to steps.
  pub fn write_event_to_stream(&self, event: Event) -> Result<(), ContextError> {
    let guard = self
      .inner
      .stream
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    match guard.as_ref() {
      Some(sender) => {
        // Ignore send errors - the caller may not be listening
        let _ = sender.send(event);
        Ok(())
      }
      None => Err(self.closed_error()),
    }
  }

  /// Whether the run has been asked to stop.
  pub fn is_cancelled(&self) -> bool {
    self.inner.cancel.is_cancelled()
  }

  /// Resolves once the run has been asked to stop.
  pub async fn cancelled(&self) {
    self.inner.cancel.cancelled().await
  }

  pub fn is_closed(&self) -> bool {
    self.inner.closed.load(Ordering::Acquire)
  }

  /// End the context's lifetime: clear the store and close the event stream.
  ///
  /// Called by the engine once no step invocation is in flight. Later writes
  /// fail with [`ContextError::Closed`]; reads return nothing.
  pub async fn teardown(&self) {
    if self.close() {
      self.inner.store.clear().await;
    }
  }

  /// Reject further writes and end the event stream without clearing the
  /// store. Returns `false` if the context was already closed.
  ///
  /// Usable where `teardown` cannot be awaited, e.g. from `Drop`.
  pub fn close(&self) -> bool {
    if self.inner.closed.swap(true, Ordering::AcqRel) {
      return false;
    }
    self
      .inner
      .stream
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .take();
    true
  }

  fn ensure_open(&self) -> Result<(), ContextError> {
    if self.is_closed() {
      Err(self.closed_error())
    } else {
      Ok(())
    }
  }

  fn closed_error(&self) -> ContextError {
    ContextError::Closed {
      run_id: self.inner.run_id.clone(),
    }
  }
}

impl std::fmt::Debug for SharedContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SharedContext")
      .field("run_id", &self.inner.run_id)
      .field("closed", &self.is_closed())
      .finish()
  }
}
