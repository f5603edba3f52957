//! Byzantine-fault scenarios: corrupted origins and minority voter faults.

use serde_json::json;

use crate::fixtures::{walk_to_labeled, L1Cluster, L2Node};

#[tokio::test]
async fn byzantine_origin_is_rejected_by_correct_replicas() {
    // Four replicas; the origin gateway corrupts every successful response
    // before broadcast. Three honest replicas replay, diverge, and reject;
    // one self-vote cannot reach the 3-vote threshold.
    let l2 = L2Node::start(4, None, true).await;

    let reply = l2
        .post("/session/start", json!({"operator_id": "OPR-001"}))
        .await;
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body["code"], "CONSENSUS_TIMEOUT");

    // No replica logged the corrupted transaction.
    for replica in &l2.replicas {
        assert!(
            replica.log.all_envelopes().unwrap().is_empty(),
            "replica {} logged a rejected tx",
            replica.node_id
        );
        assert_eq!(replica.log.last_height().unwrap(), None);
    }
}

#[tokio::test]
async fn corrupted_error_responses_do_not_escape_rejection() {
    // The rewrite only touches successful responses; a genuine handler
    // failure replays identically everywhere and still finalizes.
    let l2 = L2Node::start(4, None, true).await;

    let reply = l2
        .post("/session/start", json!({"operator_id": "OPR-ZZZ"}))
        .await;
    assert_eq!(reply.status, 400);
    assert_eq!(reply.body["meta"]["status"], "confirmed");
    for replica in &l2.replicas {
        assert_eq!(replica.log.all_envelopes().unwrap().len(), 1);
    }
}

#[tokio::test]
async fn minority_voter_fault_does_not_block_commitment() {
    // One of four commitment-layer votes is lost; ⌊2n/3⌋+1 = 3 remain.
    let l1 = L1Cluster::start(4, vec![3]).await;
    let l2 = L2Node::start(1, Some(l1.base_url.clone()), false).await;

    let (session_id, _) = walk_to_labeled(&l2).await;
    let reply = l2
        .post(
            &format!("/commit/{session_id}"),
            json!({"operator_id": "OPR-001"}),
        )
        .await;
    assert_eq!(reply.status, 202, "commit: {}", reply.body);

    // The three correct replicas hold byte-identical records.
    let reference = l1.replicas[0].log.all_envelopes().unwrap();
    assert!(!reference.is_empty());
    for replica in &l1.replicas[1..3] {
        assert_eq!(replica.log.all_envelopes().unwrap(), reference);
    }
}

#[tokio::test]
async fn supermajority_fault_fails_the_commit_and_preserves_l2_state() {
    // Two lost votes out of four cannot reach the threshold: the L1 round
    // fails, the bridge surfaces the error, and the session stays
    // un-committed and retryable.
    let l1 = L1Cluster::start(4, vec![1, 2]).await;
    let l2 = L2Node::start(1, Some(l1.base_url.clone()), false).await;

    let (session_id, _) = walk_to_labeled(&l2).await;
    let reply = l2
        .post(
            &format!("/commit/{session_id}"),
            json!({"operator_id": "OPR-001"}),
        )
        .await;
    assert_eq!(reply.status, 500, "commit: {}", reply.body);

    use tl_02_session_store::SessionStore;
    let session = l2.replicas[0].store.session(&session_id).await.unwrap();
    assert!(!session.is_committed);
    assert_eq!(session.tx_hash, None);
}
