//! Audit surface: status lookup, block contents, event search, telemetry.

use serde_json::json;

use crate::fixtures::{L1Cluster, L2Node};

#[tokio::test]
async fn status_lookup_returns_the_broadcast_envelope() {
    let l2 = L2Node::start(1, None, false).await;
    let reply = l2
        .post("/session/start", json!({"operator_id": "OPR-001"}))
        .await;
    assert_eq!(reply.status, 201);
    let tx_id = reply.body["meta"]["tx_id"].as_str().unwrap().to_string();
    let request_id = reply.body["meta"]["request_id"].as_str().unwrap().to_string();

    let status = l2.gateway.status_view(&tx_id).await;
    assert_eq!(status.status, 200);
    assert_eq!(status.body["status"], "accepted");
    assert_eq!(status.body["envelope"]["request"]["request_id"], request_id);
    assert_eq!(
        status.body["envelope"]["response"]["status"],
        reply.body["meta"]["response_info"]["status_code"]
    );

    let miss = l2.gateway.status_view("00ff00ff").await;
    assert_eq!(miss.status, 404);
}

#[tokio::test]
async fn block_lookup_exposes_raw_and_parsed_transactions() {
    let l2 = L2Node::start(1, None, false).await;
    let reply = l2
        .post("/session/start", json!({"operator_id": "OPR-001"}))
        .await;
    let height = reply.body["meta"]["block_height"].as_u64().unwrap();

    let block = l2.gateway.block_view(height).await;
    assert_eq!(block.status, 200);
    assert_eq!(block.body["height"].as_u64().unwrap(), height);
    assert_eq!(block.body["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(block.body["transactions_b64"].as_array().unwrap().len(), 1);

    let missing = l2.gateway.block_view(height + 100).await;
    assert_eq!(missing.status, 404);
}

#[tokio::test]
async fn event_search_finds_transactions_by_request_and_route() {
    use shared_types::consensus::ConsensusClient;

    let l2 = L2Node::start(1, None, false).await;
    let reply = l2
        .post("/session/start", json!({"operator_id": "OPR-001"}))
        .await;
    let tx_id = reply.body["meta"]["tx_id"].as_str().unwrap().to_string();
    let request_id = reply.body["meta"]["request_id"].as_str().unwrap().to_string();
    l2.post("/session/test-package", serde_json::Value::Null).await;

    let hits = l2
        .engine
        .tx_search(&format!("app_tx.request_id='{request_id}'"))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].tx_id, tx_id);

    let hits = l2.engine.tx_search("request.method='POST'").await.unwrap();
    assert_eq!(hits.len(), 2);

    let hits = l2
        .engine
        .tx_search("request.path='/session/test-package'")
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn debug_and_html_pages_serve_over_http() {
    let l1 = L1Cluster::start(4, vec![]).await;
    let client = reqwest::Client::new();

    let debug: serde_json::Value = client
        .get(format!("{}/debug", l1.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(debug["layer"], "l1");
    assert_eq!(debug["node_id"], "l1-node-0");
    assert_eq!(debug["routes"], 1);

    let page = client
        .get(format!("{}/", l1.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(page.status().as_u16(), 200);
    let html = page.text().await.unwrap();
    assert!(html.contains("Tandem-Ledger"));

    // Unrouted paths come back as gateway-local 404s.
    let missing = client
        .post(format!("{}/session/start", l1.base_url))
        .json(&json!({"operator_id": "OPR-001"}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}
