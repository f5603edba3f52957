//! The application hosted behind the engine callbacks.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use shared_types::consensus::{
    AppInfo, Application, CheckTxResult, Event, FinalizeResult, ProposalVerdict, QueryResult,
    TxResult,
};
use shared_types::{canonical, ids, EngineError, EngineResult, Transaction};
use tl_01_service_registry::ServiceRegistry;
use tl_03_tx_log::TxLog;

struct ExecState {
    chain_id: String,
    last_height: u64,
    last_app_hash: String,
}

/// One replica's application instance.
///
/// The engine invokes callbacks serially per height, so handlers may assume
/// no other handler on this node runs concurrently during replay.
pub struct ReplicatedExecutor {
    node_id: String,
    registry: Arc<ServiceRegistry>,
    log: Arc<TxLog>,
    state: RwLock<ExecState>,
}

impl ReplicatedExecutor {
    pub fn new(node_id: impl Into<String>, registry: Arc<ServiceRegistry>, log: Arc<TxLog>) -> Self {
        let node_id = node_id.into();
        let (last_height, last_app_hash) = match (log.last_height(), log.last_app_hash()) {
            (Ok(Some(h)), Ok(Some(a))) => (h, a),
            _ => (0, String::new()),
        };
        Self {
            node_id,
            registry,
            log,
            state: RwLock::new(ExecState {
                chain_id: String::new(),
                last_height,
                last_app_hash,
            }),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Replay one foreign transaction and compare against the proposer's
    /// response. Equality is `(status, body)` only.
    async fn replay_matches(&self, tx: &Transaction) -> bool {
        let Some(route) = self.registry.lookup(&tx.request.method, &tx.request.path) else {
            warn!(
                method = %tx.request.method,
                path = %tx.request.path,
                origin = %tx.origin_node,
                "rejecting proposal: no handler for replayed request"
            );
            return false;
        };
        let local = route.handler.handle(&tx.request, &route.params).await;
        if !local.replay_eq(&tx.response) {
            warn!(
                origin = %tx.origin_node,
                request_id = %tx.request.request_id,
                proposed_status = tx.response.status,
                local_status = local.status,
                "rejecting proposal: replayed response diverges"
            );
            return false;
        }
        true
    }
}

#[async_trait]
impl Application for ReplicatedExecutor {
    async fn info(&self) -> AppInfo {
        let state = self.state.read();
        AppInfo {
            node_id: self.node_id.clone(),
            last_block_height: state.last_height,
            last_block_app_hash: state.last_app_hash.clone(),
        }
    }

    async fn init_chain(&self, chain_id: &str) {
        self.state.write().chain_id = chain_id.to_string();
    }

    async fn check_tx(&self, tx: &[u8]) -> CheckTxResult {
        match Transaction::decode(tx) {
            Ok(_) => CheckTxResult::ok(),
            Err(e) => CheckTxResult::reject(1, e.to_string()),
        }
    }

    async fn prepare_proposal(&self, txs: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
        txs
    }

    async fn process_proposal(&self, txs: &[Vec<u8>]) -> ProposalVerdict {
        for raw in txs {
            let tx = match Transaction::decode(raw) {
                Ok(tx) => tx,
                Err(_) => return ProposalVerdict::Reject,
            };
            if tx.origin_node == self.node_id {
                // The response is already authoritative for this node.
                continue;
            }
            if !self.replay_matches(&tx).await {
                return ProposalVerdict::Reject;
            }
        }
        ProposalVerdict::Accept
    }

    async fn finalize_block(&self, height: u64, txs: &[Vec<u8>]) -> FinalizeResult {
        let mut tx_ids = Vec::with_capacity(txs.len());
        let mut tx_results = Vec::with_capacity(txs.len());
        let mut events = Vec::new();

        for raw in txs {
            let tx = match Transaction::decode(raw) {
                Ok(tx) => tx,
                Err(_) => {
                    tx_results.push(TxResult {
                        tx_id: String::new(),
                        code: 1,
                    });
                    continue;
                }
            };
            let tx_id = self.log.stage_tx(&tx, raw);
            events.push(
                Event::new("app_tx")
                    .attr("request_id", &tx.request.request_id)
                    .attr("origin_node", &tx.origin_node)
                    .attr("status", tx.response.status.to_string())
                    .attr("tx_id", &tx_id),
            );
            events.push(
                Event::new("request")
                    .attr("method", &tx.request.method)
                    .attr("path", &tx.request.path),
            );
            tx_results.push(TxResult {
                tx_id: tx_id.clone(),
                code: 0,
            });
            tx_ids.push(tx_id);
        }

        let app_hash = ids::app_hash(&tx_ids);
        self.log.stage_block_meta(height, &app_hash);
        {
            let mut state = self.state.write();
            state.last_height = height;
            state.last_app_hash = app_hash.clone();
        }
        debug!(height, txs = txs.len(), %app_hash, "block finalized");
        FinalizeResult {
            app_hash,
            tx_results,
            events,
        }
    }

    async fn commit(&self) -> EngineResult<()> {
        // A failed flush would silently desynchronize this replica; the node
        // must halt instead.
        self.log
            .commit_pending()
            .map_err(|e| EngineError::Fatal(e.to_string()))
    }

    async fn query(&self, path: &str) -> QueryResult {
        if let Some(tx_id) = path.strip_prefix("verify:") {
            return match self.log.verify(tx_id) {
                Ok(Some((envelope, status))) => {
                    let body = serde_json::json!({
                        "tx_id": tx_id,
                        "status": status,
                        "envelope": envelope,
                    });
                    QueryResult {
                        code: 0,
                        value: canonical::to_canonical_string(&body).into_bytes(),
                        log: String::new(),
                    }
                }
                Ok(None) => QueryResult {
                    code: 1,
                    value: Vec::new(),
                    log: format!("transaction {tx_id} not found"),
                },
                Err(e) => QueryResult {
                    code: 2,
                    value: Vec::new(),
                    log: e.to_string(),
                },
            };
        }
        match self.log.get_raw(path.as_bytes()) {
            Ok(Some(value)) => QueryResult {
                code: 0,
                value,
                log: String::new(),
            },
            Ok(None) => QueryResult {
                code: 1,
                value: Vec::new(),
                log: format!("key {path} not found"),
            },
            Err(e) => QueryResult {
                code: 2,
                value: Vec::new(),
                log: e.to_string(),
            },
        }
    }
}
