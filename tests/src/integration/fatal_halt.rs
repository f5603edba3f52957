//! Fatal-halt invariant: a log flush failure after finalization must stop
//! the node. A replica that kept serving with an unflushed log would
//! silently diverge from the rest of the set.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use shared_types::consensus::{Application, ConsensusClient};
use tl_03_tx_log::{BatchOperation, KeyValueStore, KvStoreError};
use tl_04_replicated_executor::engine::LocalConsensusEngine;
use tl_07_web_gateway::{GatewayNode, Layer};

use crate::fixtures::Replica;

/// Log backend whose atomic flush always fails.
struct BrokenKvStore;

impl KeyValueStore for BrokenKvStore {
    fn get(&self, _key: &[u8]) -> Result<Option<Vec<u8>>, KvStoreError> {
        Ok(None)
    }

    fn atomic_batch_write(&self, _operations: Vec<BatchOperation>) -> Result<(), KvStoreError> {
        Err(KvStoreError::Database("write stalled".into()))
    }

    fn prefix_scan(&self, _prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KvStoreError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn log_flush_failure_raises_the_halt_signal() {
    let replica = Replica::l2_with_log_backend("l2-node-0", vec![], Arc::new(BrokenKvStore));
    let engine = Arc::new(LocalConsensusEngine::new(
        "tandem-l2",
        vec![Arc::clone(&replica.executor) as Arc<dyn Application>],
    ));
    engine.init().await;
    let gateway = Arc::new(GatewayNode::new(
        replica.node_id.clone(),
        Layer::L2,
        Arc::clone(&replica.registry),
        Arc::clone(&engine) as Arc<dyn ConsensusClient>,
    ));
    let mut fatal = gateway.subscribe_fatal();
    assert!(gateway.fatal_reason().is_none());

    // The handler succeeds and the proposal is accepted; the flush at
    // commit is what breaks.
    let reply = gateway
        .dispatch(
            "POST",
            "/session/start",
            BTreeMap::new(),
            "127.0.0.1:52000".into(),
            &json!({"operator_id": "OPR-001"}).to_string(),
        )
        .await;
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body["code"], "FATAL");

    // The runtime's shutdown select observes the signal and exits the
    // process; here we observe the same receiver it would.
    fatal.changed().await.unwrap();
    let reason = gateway.fatal_reason().unwrap();
    assert!(reason.contains("write stalled"), "{reason}");
}
