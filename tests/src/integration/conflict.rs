//! Cross-layer idempotence and conflict detection.

use serde_json::json;

use tl_05_commit_bridge::{BridgeError, CommitBridge};

use crate::fixtures::{walk_to_labeled, L1Cluster, L2Node};

/// Rebuild the replication payload the bridge sent for a committed session.
async fn committed_payload(
    l2: &L2Node,
    session_id: &str,
) -> shared_types::CommitReplicationPayload {
    use tl_02_session_store::SessionStore;
    let rollup = l2.replicas[0]
        .store
        .session_rollup(session_id)
        .await
        .unwrap();
    CommitBridge::payload_from_rollup(&rollup, "2026-03-01T00:00:00Z").unwrap()
}

#[tokio::test]
async fn resubmitting_the_same_commit_is_idempotent_at_l1() {
    let l1 = L1Cluster::start(4, vec![]).await;
    let l2 = L2Node::start(1, Some(l1.base_url.clone()), false).await;

    let (session_id, _) = walk_to_labeled(&l2).await;
    let reply = l2
        .post(
            &format!("/commit/{session_id}"),
            json!({"operator_id": "OPR-001"}),
        )
        .await;
    assert_eq!(reply.status, 202);

    // A retry with identical material content (fresh timestamp) lands as
    // already-replicated: same success shape, no new session row.
    let bridge = CommitBridge::new(vec![l1.base_url.clone()]);
    let payload = committed_payload(&l2, &session_id).await;
    let l1_ref = bridge.replicate(&session_id, &payload).await.unwrap();
    assert!(l1_ref.block_height >= 1);

    use tl_02_session_store::SessionStore;
    for replica in &l1.replicas {
        let session = replica.store.session(&session_id).await.unwrap();
        assert!(session.is_committed);
    }
}

#[tokio::test]
async fn divergent_commit_for_the_same_session_is_a_conflict() {
    let l1 = L1Cluster::start(4, vec![]).await;
    let l2 = L2Node::start(1, Some(l1.base_url.clone()), false).await;

    let (session_id, _) = walk_to_labeled(&l2).await;
    let reply = l2
        .post(
            &format!("/commit/{session_id}"),
            json!({"operator_id": "OPR-001"}),
        )
        .await;
    assert_eq!(reply.status, 202);

    // A second commit attempt for the same session id with altered content
    // must be detected on the commitment layer.
    let bridge = CommitBridge::new(vec![l1.base_url.clone()]);
    let mut altered = committed_payload(&l2, &session_id).await;
    altered.destination = "CUSTOMER B".to_string();
    match bridge.replicate(&session_id, &altered).await {
        Err(BridgeError::Rejected { status, .. }) => assert_eq!(status, 409),
        other => panic!("expected a 409 conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn tampered_l1_state_is_surfaced_on_resubmission() {
    let l1 = L1Cluster::start(4, vec![]).await;
    let l2 = L2Node::start(1, Some(l1.base_url.clone()), false).await;

    let (session_id, _) = walk_to_labeled(&l2).await;
    l2.post(
        &format!("/commit/{session_id}"),
        json!({"operator_id": "OPR-001"}),
    )
    .await;

    // Corrupt the resident commitment-layer record on every replica, then
    // resubmit the honest payload: the digests no longer match.
    for replica in &l1.replicas {
        replica.store.overwrite_commit_digest(&session_id, "tampered");
    }
    let bridge = CommitBridge::new(vec![l1.base_url.clone()]);
    let payload = committed_payload(&l2, &session_id).await;
    match bridge.replicate(&session_id, &payload).await {
        Err(BridgeError::Rejected { status, .. }) => assert_eq!(status, 409),
        other => panic!("expected a 409 conflict, got {other:?}"),
    }
}
