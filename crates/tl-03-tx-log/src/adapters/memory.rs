//! In-memory adapter. Backs tests and single-process replica sets.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::ports::{BatchOperation, KeyValueStore, KvStoreError};

#[derive(Default)]
pub struct MemoryKvStore {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored keys, for assertions.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvStoreError> {
        Ok(self.map.read().get(key).cloned())
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KvStoreError> {
        // Single map lock for the whole batch keeps it atomic.
        let mut map = self.map.write();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    map.insert(key, value);
                }
            }
        }
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KvStoreError> {
        Ok(self
            .map
            .read()
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
