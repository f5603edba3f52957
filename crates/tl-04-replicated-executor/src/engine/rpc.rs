//! RPC adapter for an external consensus engine.
//!
//! Speaks the standard engine HTTP endpoints (`/broadcast_tx_commit`,
//! `/block`, `/tx_search`, `/status`, `/abci_info`, `/abci_query`). Any
//! engine exposing these with the usual JSON shapes can drive the node.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use serde_json::Value;

use shared_types::consensus::{
    AppInfo, BlockView, BroadcastCommit, ConsensusClient, EngineStatus, QueryResult, TxHit,
};
use shared_types::{EngineError, EngineResult};

pub struct RpcConsensusEngine {
    base_url: String,
    client: reqwest::Client,
}

impl RpcConsensusEngine {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn call(&self, path_and_query: &str) -> EngineResult<Value> {
        let url = format!("{}/{}", self.base_url, path_and_query);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::Rpc(e.to_string()))?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| EngineError::Rpc(e.to_string()))?;
        if let Some(error) = body.get("error") {
            return Err(EngineError::Rpc(error.to_string()));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| EngineError::Rpc("missing result field".to_string()))
    }
}

fn as_u64(value: &Value) -> u64 {
    match value {
        Value::String(s) => s.parse().unwrap_or(0),
        Value::Number(n) => n.as_u64().unwrap_or(0),
        _ => 0,
    }
}

fn as_u32(value: &Value) -> u32 {
    as_u64(value) as u32
}

#[async_trait]
impl ConsensusClient for RpcConsensusEngine {
    async fn broadcast_tx_commit(&self, tx: Vec<u8>) -> EngineResult<BroadcastCommit> {
        let result = self
            .call(&format!("broadcast_tx_commit?tx=0x{}", hex::encode(&tx)))
            .await?;
        let check_code = as_u32(&result["check_tx"]["code"]);
        // Engines differ on the field name for the delivery result.
        let deliver = result
            .get("tx_result")
            .or_else(|| result.get("deliver_tx"))
            .cloned()
            .unwrap_or(Value::Null);
        Ok(BroadcastCommit {
            tx_hash: result["hash"].as_str().unwrap_or_default().to_lowercase(),
            height: as_u64(&result["height"]),
            check_code,
            deliver_code: as_u32(&deliver["code"]),
        })
    }

    async fn block(&self, height: u64) -> EngineResult<BlockView> {
        let result = self.call(&format!("block?height={height}")).await?;
        let header = &result["block"]["header"];
        let mut txs = Vec::new();
        if let Some(raw_txs) = result["block"]["data"]["txs"].as_array() {
            for raw in raw_txs {
                let decoded = B64
                    .decode(raw.as_str().unwrap_or_default())
                    .map_err(|e| EngineError::Rpc(format!("bad tx encoding: {e}")))?;
                txs.push(decoded);
            }
        }
        Ok(BlockView {
            height: as_u64(&header["height"]),
            app_hash: header["app_hash"].as_str().unwrap_or_default().to_string(),
            time: header["time"].as_str().unwrap_or_default().to_string(),
            txs,
        })
    }

    async fn tx_search(&self, query: &str) -> EngineResult<Vec<TxHit>> {
        let result = self
            .call(&format!("tx_search?query=\"{query}\""))
            .await?;
        let mut hits = Vec::new();
        if let Some(entries) = result["txs"].as_array() {
            for entry in entries {
                hits.push(TxHit {
                    tx_id: entry["hash"].as_str().unwrap_or_default().to_lowercase(),
                    height: as_u64(&entry["height"]),
                    index: as_u32(&entry["index"]),
                });
            }
        }
        Ok(hits)
    }

    async fn status(&self) -> EngineResult<EngineStatus> {
        let result = self.call("status").await?;
        Ok(EngineStatus {
            node_id: result["node_info"]["id"].as_str().unwrap_or_default().to_string(),
            latest_block_height: as_u64(&result["sync_info"]["latest_block_height"]),
            latest_app_hash: result["sync_info"]["latest_app_hash"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            catching_up: result["sync_info"]["catching_up"].as_bool().unwrap_or(false),
        })
    }

    async fn abci_info(&self) -> EngineResult<AppInfo> {
        let result = self.call("abci_info").await?;
        let response = &result["response"];
        Ok(AppInfo {
            node_id: response["data"].as_str().unwrap_or_default().to_string(),
            last_block_height: as_u64(&response["last_block_height"]),
            last_block_app_hash: response["last_block_app_hash"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
        })
    }

    async fn abci_query(&self, path: &str) -> EngineResult<QueryResult> {
        let result = self.call(&format!("abci_query?path=\"{path}\"")).await?;
        let response = &result["response"];
        let value = match response["value"].as_str() {
            Some(encoded) if !encoded.is_empty() => B64
                .decode(encoded)
                .map_err(|e| EngineError::Rpc(format!("bad value encoding: {e}")))?,
            _ => Vec::new(),
        };
        Ok(QueryResult {
            code: as_u32(&response["code"]),
            value,
            log: response["log"].as_str().unwrap_or_default().to_string(),
        })
    }
}
