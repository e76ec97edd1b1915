//! Flat, string-keyed, string-valued persistence.
//!
//! The store has no transactions and no indexes. Each single operation is
//! atomic with respect to other operations on the same store; nothing spans
//! more than one call.

use std::future::Future;
use std::sync::Arc;

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::{MemoryStore, StoreFailure};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store file is corrupt: {0}")]
    Corrupt(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Abstraction over the device-local key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Every key currently present, in lexicographic order.
    fn all_keys(&self) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Value under `key`, or `None` if it was never set or has been removed.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Read many keys in one call. Pairs come back in request order.
    fn multi_get(
        &self,
        keys: &[String],
    ) -> impl Future<Output = Result<Vec<(String, Option<String>)>, StoreError>> + Send;
}

impl<T: KeyValueStore> KeyValueStore for Arc<T> {
    fn all_keys(&self) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send {
        (**self).all_keys()
    }

    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).remove(key)
    }

    fn multi_get(
        &self,
        keys: &[String],
    ) -> impl Future<Output = Result<Vec<(String, Option<String>)>, StoreError>> + Send {
        (**self).multi_get(keys)
    }
}
