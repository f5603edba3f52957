//! # Outbound Port: Key-Value Storage
//!
//! The interface the log requires from its storage backend.
//!
//! Production: `RocksDbStore`. Testing and single-process clusters:
//! `MemoryKvStore`. Both must honor the atomicity guarantee of
//! [`KeyValueStore::atomic_batch_write`]: either every operation in the
//! batch applies or none does.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum KvStoreError {
    #[error("Database error: {0}")]
    Database(String),
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    Put { key: Vec<u8>, value: Vec<u8> },
}

impl BatchOperation {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Abstract key-value store. Single writer (the finalize path), concurrent
/// readers; implementations provide their own interior synchronization.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvStoreError>;

    fn exists(&self, key: &[u8]) -> Result<bool, KvStoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// Execute an atomic batch write. All or nothing.
    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KvStoreError>;

    /// Key-ordered scan of all pairs whose key starts with `prefix`.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KvStoreError>;
}
