//! The log service: staging, atomic flush, point lookup.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use shared_types::Transaction;

use crate::keys;
use crate::ports::{BatchOperation, KeyValueStore, KvStoreError};

#[derive(Debug, Clone, Error)]
pub enum TxLogError {
    #[error("Log storage failure: {0}")]
    Storage(#[from] KvStoreError),

    #[error("Stored envelope for {0} is unreadable")]
    CorruptEnvelope(String),
}

/// Append-only transaction log over a [`KeyValueStore`].
///
/// `stage_*` collects writes for the block being finalized; `commit_pending`
/// flushes them in one atomic batch. A flush failure must halt the node:
/// continuing would desynchronize this replica from the set.
pub struct TxLog {
    kv: Arc<dyn KeyValueStore>,
    pending: Mutex<Vec<BatchOperation>>,
}

impl TxLog {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Stage one finalized transaction. Returns its id.
    pub fn stage_tx(&self, tx: &Transaction, raw: &[u8]) -> String {
        let tx_id = tx.tx_id();
        let mut pending = self.pending.lock();
        pending.push(BatchOperation::put(keys::tx_key(&tx_id), raw.to_vec()));
        pending.push(BatchOperation::put(
            keys::status_key(&tx_id),
            keys::STATUS_ACCEPTED.as_bytes().to_vec(),
        ));
        tx_id
    }

    /// Stage the block anchor keys.
    pub fn stage_block_meta(&self, height: u64, app_hash: &str) {
        let mut pending = self.pending.lock();
        pending.push(BatchOperation::put(
            keys::LAST_BLOCK_HEIGHT.to_vec(),
            height.to_string().into_bytes(),
        ));
        pending.push(BatchOperation::put(
            keys::LAST_BLOCK_APP_HASH.to_vec(),
            app_hash.as_bytes().to_vec(),
        ));
    }

    /// Atomically flush everything staged since the last flush.
    pub fn commit_pending(&self) -> Result<(), TxLogError> {
        let batch = std::mem::take(&mut *self.pending.lock());
        if batch.is_empty() {
            return Ok(());
        }
        debug!(operations = batch.len(), "flushing log batch");
        self.kv.atomic_batch_write(batch)?;
        Ok(())
    }

    /// Stored envelope for a transaction id, if any.
    pub fn envelope(&self, tx_id: &str) -> Result<Option<Transaction>, TxLogError> {
        match self.kv.get(&keys::tx_key(tx_id))? {
            None => Ok(None),
            Some(raw) => Transaction::decode(&raw)
                .map(Some)
                .map_err(|_| TxLogError::CorruptEnvelope(tx_id.to_string())),
        }
    }

    /// Raw envelope bytes, exactly as stored.
    pub fn raw_envelope(&self, tx_id: &str) -> Result<Option<Vec<u8>>, TxLogError> {
        Ok(self.kv.get(&keys::tx_key(tx_id))?)
    }

    pub fn status(&self, tx_id: &str) -> Result<Option<String>, TxLogError> {
        Ok(self
            .kv
            .get(&keys::status_key(tx_id))?
            .map(|v| String::from_utf8_lossy(&v).into_owned()))
    }

    /// Audit view: envelope plus status.
    pub fn verify(&self, tx_id: &str) -> Result<Option<(Transaction, String)>, TxLogError> {
        let Some(envelope) = self.envelope(tx_id)? else {
            return Ok(None);
        };
        let status = self
            .status(tx_id)?
            .unwrap_or_else(|| keys::STATUS_ACCEPTED.to_string());
        Ok(Some((envelope, status)))
    }

    pub fn last_height(&self) -> Result<Option<u64>, TxLogError> {
        Ok(self
            .kv
            .get(keys::LAST_BLOCK_HEIGHT)?
            .and_then(|v| String::from_utf8_lossy(&v).parse().ok()))
    }

    pub fn last_app_hash(&self) -> Result<Option<String>, TxLogError> {
        Ok(self
            .kv
            .get(keys::LAST_BLOCK_APP_HASH)?
            .map(|v| String::from_utf8_lossy(&v).into_owned()))
    }

    /// Raw lookup of an arbitrary log key, for the audit query surface.
    pub fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TxLogError> {
        Ok(self.kv.get(key)?)
    }

    /// All stored `(tx_id, raw envelope)` pairs in key order. Used by audit
    /// tooling and replica-identity tests.
    pub fn all_envelopes(&self) -> Result<Vec<(String, Vec<u8>)>, TxLogError> {
        Ok(self
            .kv
            .prefix_scan(keys::TX_PREFIX.as_bytes())?
            .into_iter()
            .map(|(k, v)| {
                let key = String::from_utf8_lossy(&k).into_owned();
                (key[keys::TX_PREFIX.len()..].to_string(), v)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use shared_types::{Request, Response};

    use crate::adapters::memory::MemoryKvStore;

    fn sample_tx(request_id: &str) -> Transaction {
        let request = Request {
            method: "POST".into(),
            path: "/session/start".into(),
            headers: BTreeMap::new(),
            body: r#"{"operator_id":"OPR-001"}"#.into(),
            remote_addr: "127.0.0.1:5".into(),
            request_id: request_id.into(),
            timestamp: "2026-01-01T00:00:00Z".into(),
        };
        Transaction::new(
            request,
            Response::json(201, &serde_json::json!({"ok": true})),
            "node-a",
        )
    }

    fn log() -> TxLog {
        TxLog::new(Arc::new(MemoryKvStore::new()))
    }

    #[test]
    fn nothing_is_durable_before_commit() {
        let log = log();
        let tx = sample_tx("aa");
        let raw = tx.encode().unwrap();
        let tx_id = log.stage_tx(&tx, &raw);
        assert!(log.envelope(&tx_id).unwrap().is_none());
        log.commit_pending().unwrap();
        assert_eq!(log.envelope(&tx_id).unwrap().unwrap(), tx);
        assert_eq!(log.status(&tx_id).unwrap().unwrap(), "accepted");
    }

    #[test]
    fn block_meta_round_trips() {
        let log = log();
        log.stage_block_meta(7, "ffff");
        log.commit_pending().unwrap();
        assert_eq!(log.last_height().unwrap(), Some(7));
        assert_eq!(log.last_app_hash().unwrap().unwrap(), "ffff");
    }

    #[test]
    fn verify_returns_envelope_and_status() {
        let log = log();
        let tx = sample_tx("bb");
        let raw = tx.encode().unwrap();
        let tx_id = log.stage_tx(&tx, &raw);
        log.commit_pending().unwrap();
        let (stored, status) = log.verify(&tx_id).unwrap().unwrap();
        assert_eq!(stored, tx);
        assert_eq!(status, "accepted");
        assert!(log.verify("deadbeef").unwrap().is_none());
    }

    #[test]
    fn stored_bytes_are_the_broadcast_bytes() {
        let log = log();
        let tx = sample_tx("cc");
        let raw = tx.encode().unwrap();
        let tx_id = log.stage_tx(&tx, &raw);
        log.commit_pending().unwrap();
        assert_eq!(log.raw_envelope(&tx_id).unwrap().unwrap(), raw);
        let all = log.all_envelopes().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, tx_id);
    }
}
