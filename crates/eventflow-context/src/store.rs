use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tokio::sync::RwLock;

/// Trait for run-scoped key/value storage.
///
/// The scope is a single run; different runs never share a store.
/// Implementations must make each operation atomic, so that concurrent
/// access to the same key from different steps observes a total order.
///
/// This trait is async to support networked backends.
pub trait ContextStore: Send + Sync {
  /// Get a value by key.
  fn get(&self, key: &str) -> Pin<Box<dyn Future<Output = Option<Value>> + Send + '_>>;

  /// Set a value, replacing any previous one.
  fn set(&self, key: &str, value: Value) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

  /// Remove a value, returning it if present.
  fn remove(&self, key: &str) -> Pin<Box<dyn Future<Output = Option<Value>> + Send + '_>>;

  /// Copy of every stored entry.
  fn snapshot(&self) -> Pin<Box<dyn Future<Output = HashMap<String, Value>> + Send + '_>>;

  /// Drop every entry.
  fn clear(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// In-memory store guarded by a single async `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
  data: RwLock<HashMap<String, Value>>,
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl ContextStore for InMemoryStore {
  fn get(&self, key: &str) -> Pin<Box<dyn Future<Output = Option<Value>> + Send + '_>> {
    let key = key.to_string();
    Box::pin(async move { self.data.read().await.get(&key).cloned() })
  }

  fn set(&self, key: &str, value: Value) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
    let key = key.to_string();
    Box::pin(async move {
      self.data.write().await.insert(key, value);
    })
  }

  fn remove(&self, key: &str) -> Pin<Box<dyn Future<Output = Option<Value>> + Send + '_>> {
    let key = key.to_string();
    Box::pin(async move { self.data.write().await.remove(&key) })
  }

  fn snapshot(&self) -> Pin<Box<dyn Future<Output = HashMap<String, Value>> + Send + '_>> {
    Box::pin(async move { self.data.read().await.clone() })
  }

  fn clear(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
    Box::pin(async move { self.data.write().await.clear() })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[tokio::test]
  async fn test_in_memory_store() {
    let store = InMemoryStore::new();

    assert_eq!(store.get("key").await, None);

    store.set("key", json!("value")).await;
    assert_eq!(store.get("key").await, Some(json!("value")));

    store.set("key", json!({ "updated": true })).await;
    assert_eq!(store.get("key").await, Some(json!({ "updated": true })));

    assert_eq!(store.remove("key").await, Some(json!({ "updated": true })));
    assert_eq!(store.get("key").await, None);
  }

  #[tokio::test]
  async fn test_clear_empties_snapshot() {
    let store = InMemoryStore::new();
    store.set("a", json!(1)).await;
    store.set("b", json!(2)).await;
    assert_eq!(store.snapshot().await.len(), 2);

    store.clear().await;
    assert!(store.snapshot().await.is_empty());
  }
}
