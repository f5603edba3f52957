//! The consensus-backed request pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::RngCore;
use serde_json::json;
use tokio::sync::watch;
use tracing::{error, info, warn};

use shared_types::consensus::ConsensusClient;
use shared_types::{canonical, EngineError, Request, Response, Transaction};
use tl_01_service_registry::ServiceRegistry;

use crate::meta;

const DEFAULT_BROADCAST_TIMEOUT: Duration = Duration::from_secs(10);

/// Which consensus layer this node serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Commitment layer: durable record of committed sessions.
    L1,
    /// Interactivity layer: per-step consensus-backed answers.
    L2,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::L1 => "l1",
            Layer::L2 => "l2",
        }
    }
}

/// What the gateway hands back to the HTTP layer.
#[derive(Debug, Clone)]
pub struct GatewayReply {
    pub status: u16,
    pub body: serde_json::Value,
}

impl GatewayReply {
    fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }
}

pub struct GatewayNode {
    node_id: String,
    layer: Layer,
    registry: Arc<ServiceRegistry>,
    engine: Arc<dyn ConsensusClient>,
    byzantine: bool,
    broadcast_timeout: Duration,
    started_at: Instant,
    /// Raised once on the first fatal application error. The runtime halts
    /// the process when it fires; a desynchronized replica must not keep
    /// serving.
    fatal_tx: watch::Sender<Option<String>>,
}

impl GatewayNode {
    pub fn new(
        node_id: impl Into<String>,
        layer: Layer,
        registry: Arc<ServiceRegistry>,
        engine: Arc<dyn ConsensusClient>,
    ) -> Self {
        let (fatal_tx, _) = watch::channel(None);
        Self {
            node_id: node_id.into(),
            layer,
            registry,
            engine,
            byzantine: false,
            broadcast_timeout: DEFAULT_BROADCAST_TIMEOUT,
            started_at: Instant::now(),
            fatal_tx,
        }
    }

    /// Subscribe to the halt signal. Resolves when a fatal application
    /// error has been recorded.
    pub fn subscribe_fatal(&self) -> watch::Receiver<Option<String>> {
        self.fatal_tx.subscribe()
    }

    /// The recorded fatal reason, if the node has hit one.
    pub fn fatal_reason(&self) -> Option<String> {
        self.fatal_tx.borrow().clone()
    }

    fn raise_fatal(&self, reason: &str) {
        error!(%reason, "fatal application error; node must halt");
        self.fatal_tx.send_replace(Some(reason.to_string()));
    }

    /// Test hook: corrupt every successful response before the envelope is
    /// assembled, so the divergence is visible to replaying replicas.
    pub fn with_byzantine_mode(mut self, enabled: bool) -> Self {
        self.byzantine = enabled;
        self
    }

    pub fn with_broadcast_timeout(mut self, timeout: Duration) -> Self {
        self.broadcast_timeout = timeout;
        self
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    /// Run one client request through local execution and consensus.
    pub async fn dispatch(
        &self,
        method: &str,
        path: &str,
        headers: BTreeMap<String, String>,
        remote_addr: String,
        raw_body: &str,
    ) -> GatewayReply {
        let Some(route) = self.registry.lookup(method, path) else {
            return GatewayReply::new(
                404,
                meta::error_reply(&format!("No route for {method} {path}"), None),
            );
        };

        let mut id_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut id_bytes);
        let request = Request {
            method: method.to_uppercase(),
            path: path.to_string(),
            headers,
            body: canonical::compact_body(raw_body),
            remote_addr,
            request_id: hex::encode(id_bytes),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let mut response = route.handler.handle(&request, &route.params).await;
        if self.byzantine {
            response = byzantine_rewrite(response);
        }

        let tx = Transaction::new(request, response, self.node_id.clone());
        let raw_tx = match tx.encode() {
            Ok(raw) => raw,
            Err(e) => {
                return GatewayReply::new(500, meta::error_reply(&e.to_string(), None));
            }
        };

        let commit = match tokio::time::timeout(
            self.broadcast_timeout,
            self.engine.broadcast_tx_commit(raw_tx),
        )
        .await
        {
            Err(_) => {
                warn!(request_id = %tx.request.request_id, "consensus did not confirm in time");
                return GatewayReply::new(
                    500,
                    meta::error_reply(
                        "Consensus engine did not confirm the transaction",
                        Some("CONSENSUS_TIMEOUT"),
                    ),
                );
            }
            Ok(Err(EngineError::ProposalRejected)) => {
                // The round failed; a correct origin will commit on a later
                // round in a live replica set, so the client sees a timeout
                // rather than a verdict.
                return GatewayReply::new(
                    500,
                    meta::error_reply(
                        "Consensus round did not confirm the transaction",
                        Some("CONSENSUS_TIMEOUT"),
                    ),
                );
            }
            Ok(Err(EngineError::Fatal(reason))) => {
                // The replica invariant is broken; answer this request and
                // stop serving.
                self.raise_fatal(&reason);
                return GatewayReply::new(
                    500,
                    meta::error_reply(
                        "Fatal application error; node is halting",
                        Some("FATAL"),
                    ),
                );
            }
            Ok(Err(e)) => {
                return GatewayReply::new(500, meta::error_reply(&e.to_string(), None));
            }
            Ok(Ok(commit)) => commit,
        };
        if commit.check_code != 0 {
            return GatewayReply::new(
                503,
                meta::error_reply(
                    &format!("Transaction refused at admission: code {}", commit.check_code),
                    Some("MEMPOOL_REJECTED"),
                ),
            );
        }

        let block = self.engine.block(commit.height).await.ok();
        info!(
            request_id = %tx.request.request_id,
            tx_id = %commit.tx_hash,
            height = commit.height,
            status = tx.response.status,
            "request confirmed"
        );
        GatewayReply::new(
            tx.response.status,
            meta::confirmed_reply(
                &self.node_id,
                &commit.tx_hash,
                &tx.request.request_id,
                &tx.response,
                commit.height,
                block.as_ref(),
            ),
        )
    }

    /// `GET /status/:txid` — audit view of one recorded transaction.
    pub async fn status_view(&self, tx_id: &str) -> GatewayReply {
        match self.engine.abci_query(&format!("verify:{tx_id}")).await {
            Ok(result) if result.code == 0 => {
                let value: serde_json::Value =
                    serde_json::from_slice(&result.value).unwrap_or(serde_json::Value::Null);
                GatewayReply::new(200, value)
            }
            Ok(result) => GatewayReply::new(404, meta::error_reply(&result.log, None)),
            Err(e) => GatewayReply::new(500, meta::error_reply(&e.to_string(), None)),
        }
    }

    /// `GET /block/:height` — block contents, raw and parsed.
    pub async fn block_view(&self, height: u64) -> GatewayReply {
        match self.engine.block(height).await {
            Ok(block) => {
                use base64::engine::general_purpose::STANDARD as B64;
                use base64::Engine as _;
                let parsed: Vec<serde_json::Value> = block
                    .txs
                    .iter()
                    .map(|raw| match Transaction::decode(raw) {
                        Ok(tx) => serde_json::to_value(&tx).unwrap_or(serde_json::Value::Null),
                        Err(_) => serde_json::Value::Null,
                    })
                    .collect();
                let b64: Vec<String> = block.txs.iter().map(|raw| B64.encode(raw)).collect();
                GatewayReply::new(
                    200,
                    json!({
                        "height": block.height,
                        "app_hash": block.app_hash,
                        "time": block.time,
                        "transactions": parsed,
                        "transactions_b64": b64,
                    }),
                )
            }
            Err(EngineError::UnknownBlock(h)) => {
                GatewayReply::new(404, meta::error_reply(&format!("Unknown block {h}"), None))
            }
            Err(e) => GatewayReply::new(500, meta::error_reply(&e.to_string(), None)),
        }
    }

    /// `GET /debug` — node telemetry.
    pub async fn debug_view(&self) -> GatewayReply {
        let info = self.engine.abci_info().await.ok();
        GatewayReply::new(
            200,
            json!({
                "node_id": self.node_id,
                "layer": self.layer.as_str(),
                "byzantine_mode": self.byzantine,
                "routes": self.registry.route_count(),
                "route_patterns": self.registry.pattern_paths(),
                "last_block_height": info.as_ref().map(|i| i.last_block_height),
                "last_block_app_hash": info.as_ref().map(|i| i.last_block_app_hash.clone()),
                "uptime_secs": self.started_at.elapsed().as_secs(),
            }),
        )
    }
}

/// Rewrite a successful response into a corrupted one. Runs at the same
/// pipeline position as the honest response so the divergence reaches
/// every replaying replica.
fn byzantine_rewrite(response: Response) -> Response {
    if response.status < 400 {
        Response {
            status: 500,
            headers: response.headers,
            body: "corrupted".to_string(),
        }
    } else {
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use shared_types::consensus::{
        AppInfo, BlockView, BroadcastCommit, EngineStatus, QueryResult, TxHit,
    };
    use shared_types::EngineResult;

    struct NullEngine;

    #[async_trait]
    impl ConsensusClient for NullEngine {
        async fn broadcast_tx_commit(&self, _tx: Vec<u8>) -> EngineResult<BroadcastCommit> {
            Err(EngineError::Timeout)
        }
        async fn block(&self, height: u64) -> EngineResult<BlockView> {
            Err(EngineError::UnknownBlock(height))
        }
        async fn tx_search(&self, _query: &str) -> EngineResult<Vec<TxHit>> {
            Ok(Vec::new())
        }
        async fn status(&self) -> EngineResult<EngineStatus> {
            Err(EngineError::Rpc("null".into()))
        }
        async fn abci_info(&self) -> EngineResult<AppInfo> {
            Err(EngineError::Rpc("null".into()))
        }
        async fn abci_query(&self, _path: &str) -> EngineResult<QueryResult> {
            Ok(QueryResult {
                code: 1,
                value: Vec::new(),
                log: "not found".into(),
            })
        }
    }

    #[test]
    fn byzantine_rewrite_corrupts_success_only() {
        let ok = Response::json(202, &json!({"fine": true}));
        let rewritten = byzantine_rewrite(ok);
        assert_eq!(rewritten.status, 500);
        assert_eq!(rewritten.body, "corrupted");

        let failure = Response::error(409, "gated");
        let untouched = byzantine_rewrite(failure.clone());
        assert_eq!(untouched.status, failure.status);
        assert_eq!(untouched.body, failure.body);
    }

    /// Engine whose broadcast surfaces a failed log flush.
    struct FatalEngine;

    #[async_trait]
    impl ConsensusClient for FatalEngine {
        async fn broadcast_tx_commit(&self, _tx: Vec<u8>) -> EngineResult<BroadcastCommit> {
            Err(EngineError::Fatal("log flush failed".into()))
        }
        async fn block(&self, height: u64) -> EngineResult<BlockView> {
            Err(EngineError::UnknownBlock(height))
        }
        async fn tx_search(&self, _query: &str) -> EngineResult<Vec<TxHit>> {
            Ok(Vec::new())
        }
        async fn status(&self) -> EngineResult<EngineStatus> {
            Err(EngineError::Rpc("fatal".into()))
        }
        async fn abci_info(&self) -> EngineResult<AppInfo> {
            Err(EngineError::Rpc("fatal".into()))
        }
        async fn abci_query(&self, _path: &str) -> EngineResult<QueryResult> {
            Ok(QueryResult {
                code: 1,
                value: Vec::new(),
                log: "fatal".into(),
            })
        }
    }

    struct Ok202;

    #[async_trait]
    impl tl_01_service_registry::Handler for Ok202 {
        async fn handle(
            &self,
            _request: &shared_types::Request,
            _params: &tl_01_service_registry::PathParams,
        ) -> Response {
            Response::json(202, &json!({"ok": true}))
        }
    }

    #[tokio::test]
    async fn fatal_flush_failure_raises_the_halt_signal() {
        let registry = Arc::new(ServiceRegistry::new());
        registry
            .register("POST", "/step", true, Arc::new(Ok202))
            .unwrap();
        let node = GatewayNode::new("node-a", Layer::L2, registry, Arc::new(FatalEngine));
        let mut fatal = node.subscribe_fatal();
        assert!(node.fatal_reason().is_none());

        let reply = node
            .dispatch("POST", "/step", BTreeMap::new(), "127.0.0.1:1".into(), "{}")
            .await;
        assert_eq!(reply.status, 500);
        assert_eq!(reply.body["code"], "FATAL");

        fatal.changed().await.unwrap();
        assert_eq!(node.fatal_reason().as_deref(), Some("log flush failed"));
    }

    #[tokio::test]
    async fn unrouted_requests_never_reach_consensus() {
        let node = GatewayNode::new(
            "node-a",
            Layer::L2,
            Arc::new(ServiceRegistry::new()),
            Arc::new(NullEngine),
        );
        let reply = node
            .dispatch("POST", "/nowhere", BTreeMap::new(), "127.0.0.1:1".into(), "")
            .await;
        assert_eq!(reply.status, 404);
    }

    #[tokio::test]
    async fn status_view_miss_is_404() {
        let node = GatewayNode::new(
            "node-a",
            Layer::L2,
            Arc::new(ServiceRegistry::new()),
            Arc::new(NullEngine),
        );
        let reply = node.status_view("deadbeef").await;
        assert_eq!(reply.status, 404);
    }
}
