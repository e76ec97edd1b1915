//! In-memory store with failure injection.
//!
//! Clones share the same underlying map, so a test can hand one clone to the
//! code under test and keep another to inspect or sabotage it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::{KeyValueStore, StoreError};

/// Types of failures that can be simulated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreFailure {
    /// Fail every operation.
    All,
    /// Fail `all_keys`, `get` and `multi_get`.
    Reads,
    /// Fail `set` and `remove`.
    Writes,
    /// Fail any operation touching this key.
    OnKey(String),
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    entries: DashMap<String, String>,
    fail_mode: RwLock<Option<StoreFailure>>,
    get_calls: AtomicUsize,
    multi_get_calls: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_failure(&self, failure: Option<StoreFailure>) {
        *self.inner.fail_mode.write().await = failure;
    }

    /// Number of single-key `get` calls served so far.
    pub fn get_calls(&self) -> usize {
        self.inner.get_calls.load(Ordering::Relaxed)
    }

    /// Number of `multi_get` calls served so far.
    pub fn multi_get_calls(&self) -> usize {
        self.inner.multi_get_calls.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    async fn check_read(&self, keys: &[&str]) -> Result<(), StoreError> {
        match &*self.inner.fail_mode.read().await {
            Some(StoreFailure::All | StoreFailure::Reads) => {
                Err(StoreError::Unavailable("simulated read failure".into()))
            }
            Some(StoreFailure::OnKey(bad)) if keys.contains(&bad.as_str()) => Err(
                StoreError::Unavailable(format!("simulated read failure on {bad}")),
            ),
            _ => Ok(()),
        }
    }

    async fn check_write(&self, key: &str) -> Result<(), StoreError> {
        match &*self.inner.fail_mode.read().await {
            Some(StoreFailure::All | StoreFailure::Writes) => {
                Err(StoreError::Unavailable("simulated write failure".into()))
            }
            Some(StoreFailure::OnKey(bad)) if bad == key => Err(StoreError::Unavailable(
                format!("simulated write failure on {bad}"),
            )),
            _ => Ok(()),
        }
    }
}

impl KeyValueStore for MemoryStore {
    async fn all_keys(&self) -> Result<Vec<String>, StoreError> {
        self.check_read(&[]).await?;
        let mut keys: Vec<String> = self.inner.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get_calls.fetch_add(1, Ordering::Relaxed);
        self.check_read(&[key]).await?;
        Ok(self.inner.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.check_write(key).await?;
        self.inner.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check_write(key).await?;
        self.inner.entries.remove(key);
        Ok(())
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>, StoreError> {
        self.inner.multi_get_calls.fetch_add(1, Ordering::Relaxed);
        let borrowed: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.check_read(&borrowed).await?;
        Ok(keys
            .iter()
            .map(|k| (k.clone(), self.inner.entries.get(k).map(|v| v.value().clone())))
            .collect())
    }
}
