//! Commit-gate scenarios: premature, duplicate, and mismatched commits.

use serde_json::json;

use shared_types::consensus::ConsensusClient;
use tl_02_session_store::SessionStore;

use crate::fixtures::{walk_to_labeled, L1Cluster, L2Node};

#[tokio::test]
async fn premature_commit_is_refused_and_state_preserved() {
    let l1 = L1Cluster::start(4, vec![]).await;
    let l2 = L2Node::start(1, Some(l1.base_url.clone()), false).await;

    // Walk only to the validation step.
    let reply = l2.post("/session/test-package", serde_json::Value::Null).await;
    let package_id = reply.body["body"]["package_id"].as_str().unwrap().to_string();
    let reply = l2
        .post("/session/start", json!({"operator_id": "OPR-001"}))
        .await;
    let session_id = reply.body["body"]["id"].as_str().unwrap().to_string();
    l2.get(&format!("/session/{session_id}/scan/{package_id}")).await;
    l2.post(
        &format!("/session/{session_id}/validate"),
        json!({"signature": "any", "package_id": package_id}),
    )
    .await;

    let reply = l2
        .post(
            &format!("/commit/{session_id}"),
            json!({"operator_id": "OPR-001"}),
        )
        .await;
    assert_eq!(reply.status, 409);
    assert!(reply.body["body"]["error"]
        .as_str()
        .unwrap()
        .contains("Package not ready for commit"));

    // Session unchanged on L2, nothing ever reached L1.
    let session = l2.replicas[0].store.session(&session_id).await.unwrap();
    assert!(!session.is_committed);
    assert_eq!(l1.engine.status().await.unwrap().latest_block_height, 0);
}

#[tokio::test]
async fn duplicate_commit_is_refused_without_touching_l1() {
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
    let l1_height_after_first = l1.engine.status().await.unwrap().latest_block_height;

    let reply = l2
        .post(
            &format!("/commit/{session_id}"),
            json!({"operator_id": "OPR-001"}),
        )
        .await;
    assert_eq!(reply.status, 409);
    assert!(reply.body["body"]["error"]
        .as_str()
        .unwrap()
        .contains("already committed"));
    assert_eq!(
        l1.engine.status().await.unwrap().latest_block_height,
        l1_height_after_first
    );
}

#[tokio::test]
async fn operator_mismatch_is_refused_before_the_bridge() {
    let l1 = L1Cluster::start(4, vec![]).await;
    let l2 = L2Node::start(1, Some(l1.base_url.clone()), false).await;

    let (session_id, _) = walk_to_labeled(&l2).await;
    let reply = l2
        .post(
            &format!("/commit/{session_id}"),
            json!({"operator_id": "OPR-002"}),
        )
        .await;
    assert_eq!(reply.status, 409);
    assert!(reply.body["body"]["error"]
        .as_str()
        .unwrap()
        .contains("Operator mismatch"));
    assert_eq!(l1.engine.status().await.unwrap().latest_block_height, 0);
}

#[tokio::test]
async fn failed_qc_terminates_the_workflow() {
    let l2 = L2Node::start(1, None, false).await;

    let reply = l2.post("/session/test-package", serde_json::Value::Null).await;
    let package_id = reply.body["body"]["package_id"].as_str().unwrap().to_string();
    let reply = l2
        .post("/session/start", json!({"operator_id": "OPR-001"}))
        .await;
    let session_id = reply.body["body"]["id"].as_str().unwrap().to_string();
    l2.get(&format!("/session/{session_id}/scan/{package_id}")).await;
    l2.post(
        &format!("/session/{session_id}/validate"),
        json!({"signature": "any", "package_id": package_id}),
    )
    .await;

    let reply = l2
        .post(
            &format!("/session/{session_id}/qc"),
            json!({"passed": false, "issues": ["crushed carton", "moisture damage"]}),
        )
        .await;
    assert_eq!(reply.status, 202);
    assert_eq!(reply.body["body"]["passed"], false);

    // Labeling a failed package is an invalid-state error.
    let reply = l2
        .post(
            &format!("/session/{session_id}/label"),
            json!({"destination": "CUSTOMER A", "priority": "standard", "courier_id": "COU-001"}),
        )
        .await;
    assert_eq!(reply.status, 409);

    let session = l2.replicas[0].store.session(&session_id).await.unwrap();
    assert_eq!(session.status, shared_types::SessionStatus::QcFailed);
}
