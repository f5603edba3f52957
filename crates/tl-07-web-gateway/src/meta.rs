//! Client-facing response envelope assembly.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use serde_json::{json, Value};

use shared_types::consensus::BlockView;
use shared_types::{Response, Transaction};

/// Parse a response body into its JSON view, falling back to the raw string.
fn body_view(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// Assemble the confirmed-response envelope handed back to the client:
/// the handler body plus the consensus metadata and the full containing
/// block (raw base64 and parsed).
pub fn confirmed_reply(
    node_id: &str,
    tx_id: &str,
    request_id: &str,
    response: &Response,
    height: u64,
    block: Option<&BlockView>,
) -> Value {
    let content_type = response
        .headers
        .get("Content-Type")
        .cloned()
        .unwrap_or_default();

    let (parsed_txs, b64_txs) = match block {
        Some(block) => {
            let mut parsed = Vec::with_capacity(block.txs.len());
            let mut encoded = Vec::with_capacity(block.txs.len());
            for raw in &block.txs {
                encoded.push(B64.encode(raw));
                parsed.push(match Transaction::decode(raw) {
                    Ok(tx) => serde_json::to_value(&tx).unwrap_or(Value::Null),
                    Err(_) => Value::Null,
                });
            }
            (parsed, encoded)
        }
        None => (Vec::new(), Vec::new()),
    };

    json!({
        "body": body_view(&response.body),
        "meta": {
            "tx_id": tx_id,
            "request_id": request_id,
            "status": "confirmed",
            "block_height": height,
            "confirm_time": chrono::Utc::now().to_rfc3339(),
            "response_info": {
                "status_code": response.status,
                "content_type": content_type,
                "body_length": response.body.len(),
            },
            "block_txs": {
                "block_transactions": parsed_txs,
                "block_transactions_b64": b64_txs,
            },
        },
        "blockchain_ref": tx_id,
        "node_id": node_id,
    })
}

/// Gateway-local error body (never broadcast).
pub fn error_reply(message: &str, code: Option<&str>) -> Value {
    match code {
        Some(code) => json!({ "error": message, "code": code }),
        None => json!({ "error": message }),
    }
}
