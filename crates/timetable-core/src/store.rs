//! The `KeyValueStore` trait and an in-memory implementation.
//!
//! The trait is implemented by storage backends (e.g.
//! `timetable-store-sqlite`). The cache layer depends on this abstraction, not
//! on any concrete backend.

use std::{
  collections::HashMap,
  convert::Infallible,
  future::Future,
  sync::{Mutex, PoisonError},
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A string-keyed store of whole string values.
///
/// Values are read and written whole; there is no partial or indexed access.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait KeyValueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the value under `key`. Returns `None` if nothing was ever written.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Overwrite the value under `key`.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Overwrite several keys. Backends with transactions write them all or
  /// none; others may stop part way through on failure.
  fn set_many(
    &self,
    entries: Vec<(String, String)>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── In-memory store ─────────────────────────────────────────────────────────

/// A [`KeyValueStore`] held in process memory. Never fails.
#[derive(Debug, Default)]
pub struct MemoryStore {
  slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
    self.slots.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl KeyValueStore for MemoryStore {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
    Ok(self.slots().get(key).cloned())
  }

  async fn set(&self, key: &str, value: String) -> Result<(), Infallible> {
    self.slots().insert(key.to_owned(), value);
    Ok(())
  }

  async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), Infallible> {
    self.slots().extend(entries);
    Ok(())
  }
}

impl<S: KeyValueStore> KeyValueStore for std::sync::Arc<S> {
  type Error = S::Error;

  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a {
    (**self).get(key)
  }

  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a {
    (**self).set(key, value)
  }

  fn set_many(
    &self,
    entries: Vec<(String, String)>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_ {
    (**self).set_many(entries)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn missing_key_reads_none() {
    let store = MemoryStore::new();
    assert_eq!(store.get("nope").await.unwrap(), None);
  }

  #[tokio::test]
  async fn set_overwrites_whole_value() {
    let store = MemoryStore::new();
    store.set("k", "first".into()).await.unwrap();
    store.set("k", "second".into()).await.unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("second"));
  }

  #[tokio::test]
  async fn set_many_writes_every_entry() {
    let store = MemoryStore::new();
    store
      .set_many(vec![("a".into(), "1".into()), ("b".into(), "2".into())])
      .await
      .unwrap();
    assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
    assert_eq!(store.get("b").await.unwrap().as_deref(), Some("2"));
  }
}
