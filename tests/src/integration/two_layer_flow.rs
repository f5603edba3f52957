//! End-to-end two-layer scenarios: the full workflow, failure audit, and
//! replica byte-identity.

use serde_json::{json, Value};

use shared_types::consensus::ConsensusClient;
use tl_02_session_store::SessionStore;

use crate::fixtures::{walk_to_labeled, L1Cluster, L2Node};

#[tokio::test]
async fn full_workflow_commits_on_both_layers() {
    let l1 = L1Cluster::start(4, vec![]).await;
    let l2 = L2Node::start(1, Some(l1.base_url.clone()), false).await;

    let (session_id, package_id) = walk_to_labeled(&l2).await;

    let reply = l2
        .post(
            &format!("/commit/{session_id}"),
            json!({"operator_id": "OPR-001"}),
        )
        .await;
    assert_eq!(reply.status, 202, "commit: {}", reply.body);
    let l1_height = reply.body["body"]["l1"]["BlockHeight"].as_u64().unwrap();
    let l1_tx_hash = reply.body["body"]["l1"]["TxHash"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(l1_height >= 1);

    // The interactivity layer records the terminal state and the durable
    // commitment-layer reference.
    let session = l2.replicas[0].store.session(&session_id).await.unwrap();
    assert!(session.is_committed);
    assert_eq!(session.tx_hash.as_deref(), Some(l1_tx_hash.as_str()));
    let ledger = l2.replicas[0]
        .store
        .ledger_entries(&session_id)
        .await
        .unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].block_height, l1_height);

    // Every commitment-layer replica materialized the identical session.
    for replica in &l1.replicas {
        let session = replica.store.session(&session_id).await.unwrap();
        assert!(session.is_committed, "replica {}", replica.node_id);
        let package = replica.store.package(&package_id).await.unwrap();
        assert_eq!(package.session_id.as_deref(), Some(session_id.as_str()));
    }

    // The referenced L1 transaction decodes back to this session's commit.
    let (envelope, status) = l1.replicas[0].log.verify(&l1_tx_hash).unwrap().unwrap();
    assert_eq!(status, "accepted");
    assert!(envelope.request.path.contains(&session_id));
    let payload: Value = serde_json::from_str(&envelope.request.body).unwrap();
    assert_eq!(payload["package_id"].as_str().unwrap(), package_id);
}

#[tokio::test]
async fn failed_requests_are_still_audited_in_the_block() {
    let l2 = L2Node::start(1, None, false).await;

    let reply = l2
        .post("/session/start", json!({"operator_id": "OPR-ZZZ"}))
        .await;
    assert_eq!(reply.status, 400);
    let error = reply.body["body"]["error"].as_str().unwrap();
    assert!(error.to_lowercase().contains("foreign key"), "{error}");

    // The failing envelope was broadcast and finalized all the same.
    let height = reply.body["meta"]["block_height"].as_u64().unwrap();
    let block = l2.engine.block(height).await.unwrap();
    assert_eq!(block.txs.len(), 1);
    let tx = shared_types::Transaction::decode(&block.txs[0]).unwrap();
    assert_eq!(tx.response.status, 400);
    assert_eq!(tx.request.path, "/session/start");
}

#[tokio::test]
async fn replicas_log_byte_identical_envelopes() {
    // Two interactivity-layer replicas: one executes at the gateway, the
    // other only ever replays. Their logs must agree byte for byte.
    let l2 = L2Node::start(2, None, false).await;

    walk_to_labeled(&l2).await;

    let origin = l2.replicas[0].log.all_envelopes().unwrap();
    let replayer = l2.replicas[1].log.all_envelopes().unwrap();
    assert!(!origin.is_empty());
    assert_eq!(origin, replayer);
    assert_eq!(
        l2.replicas[0].log.last_app_hash().unwrap(),
        l2.replicas[1].log.last_app_hash().unwrap()
    );
    assert_eq!(
        l2.replicas[0].log.last_height().unwrap(),
        l2.replicas[1].log.last_height().unwrap()
    );
}

#[tokio::test]
async fn client_reply_carries_the_containing_block() {
    let l2 = L2Node::start(1, None, false).await;
    let reply = l2
        .post("/session/start", json!({"operator_id": "OPR-002"}))
        .await;
    assert_eq!(reply.status, 201);

    let meta = &reply.body["meta"];
    assert_eq!(meta["status"], "confirmed");
    assert_eq!(meta["response_info"]["status_code"], 201);
    let parsed = meta["block_txs"]["block_transactions"].as_array().unwrap();
    let raw = meta["block_txs"]["block_transactions_b64"].as_array().unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(raw.len(), 1);
    assert_eq!(
        parsed[0]["request"]["request_id"],
        meta["request_id"],
        "block echoes the originating request"
    );
    assert_eq!(reply.body["blockchain_ref"], meta["tx_id"]);
    assert_eq!(reply.body["node_id"], "l2-node-0");
}
