//! RocksDB adapter. Production backend for the transaction log.

use std::path::Path;

use rocksdb::{IteratorMode, WriteBatch, DB};

use crate::ports::{BatchOperation, KeyValueStore, KvStoreError};

pub struct RocksDbStore {
    db: DB,
}

impl RocksDbStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KvStoreError> {
        let db = DB::open_default(path).map_err(|e| KvStoreError::Database(e.to_string()))?;
        Ok(Self { db })
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvStoreError> {
        self.db
            .get(key)
            .map_err(|e| KvStoreError::Database(e.to_string()))
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KvStoreError> {
        let mut batch = WriteBatch::default();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => batch.put(key, value),
            }
        }
        self.db
            .write(batch)
            .map_err(|e| KvStoreError::Database(e.to_string()))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KvStoreError> {
        let mut out = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, rocksdb::Direction::Forward));
        for entry in iter {
            let (key, value) = entry.map_err(|e| KvStoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key.to_vec(), value.to_vec()));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_write_read_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();
        store
            .atomic_batch_write(vec![
                BatchOperation::put(&b"tx:a"[..], &b"envelope"[..]),
                BatchOperation::put(&b"status:a"[..], &b"accepted"[..]),
            ])
            .unwrap();
        assert_eq!(store.get(b"tx:a").unwrap().unwrap(), b"envelope");
        assert_eq!(store.prefix_scan(b"status:").unwrap().len(), 1);
        assert!(store.get(b"tx:missing").unwrap().is_none());
    }
}
