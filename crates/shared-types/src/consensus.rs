//! # Consensus-Engine Contract
//!
//! The node hosts its application logic behind a standard propose/validate/
//! finalize callback interface and consumes the engine through a small client
//! surface. Any engine providing equivalent hooks can drive the node; the
//! executor crate ships an in-process engine for single-node deployments and
//! tests, and an RPC adapter for an external engine.
//!
//! ```text
//! gateway ──BroadcastTxCommit──▶ engine ──callbacks──▶ Application (executor)
//!    ▲                             │
//!    └────block / tx_search ◀──────┘
//! ```

use async_trait::async_trait;

use crate::errors::EngineResult;

/// Application identity and replay anchor reported to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub node_id: String,
    pub last_block_height: u64,
    pub last_block_app_hash: String,
}

/// Admission verdict. Code 0 admits; anything else refuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTxResult {
    pub code: u32,
    pub log: String,
}

impl CheckTxResult {
    pub fn ok() -> Self {
        Self {
            code: 0,
            log: String::new(),
        }
    }

    pub fn reject(code: u32, log: impl Into<String>) -> Self {
        Self {
            code,
            log: log.into(),
        }
    }
}

/// Vote on a proposed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalVerdict {
    Accept,
    Reject,
}

/// Structured event emitted at finalization, consumed by the engine's
/// transaction search index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: String,
    pub attrs: Vec<(String, String)>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attrs: Vec::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }
}

/// Per-transaction finalization result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResult {
    pub tx_id: String,
    pub code: u32,
}

/// Block finalization result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeResult {
    pub app_hash: String,
    pub tx_results: Vec<TxResult>,
    pub events: Vec<Event>,
}

/// Result of an application query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub code: u32,
    pub value: Vec<u8>,
    pub log: String,
}

/// The callback surface the engine drives, invoked serially per height.
#[async_trait]
pub trait Application: Send + Sync {
    async fn info(&self) -> AppInfo;

    async fn init_chain(&self, chain_id: &str);

    /// Admission: parse-only. Semantic validity is enforced by replay at
    /// proposal time, never here.
    async fn check_tx(&self, tx: &[u8]) -> CheckTxResult;

    /// Pass-through by contract.
    async fn prepare_proposal(&self, txs: Vec<Vec<u8>>) -> Vec<Vec<u8>>;

    /// The Byzantine detector: replay every foreign transaction and vote.
    async fn process_proposal(&self, txs: &[Vec<u8>]) -> ProposalVerdict;

    async fn finalize_block(&self, height: u64, txs: &[Vec<u8>]) -> FinalizeResult;

    /// Durably flush the finalized block. Failure is fatal for the node.
    async fn commit(&self) -> EngineResult<()>;

    async fn query(&self, path: &str) -> QueryResult;

    /// Snapshot offer hook; this application does not serve snapshots.
    async fn offer_snapshot(&self) -> bool {
        false
    }

    /// Vote-extension hook; this application does not extend votes.
    async fn extend_vote(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// Confirmation returned by a blocking broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastCommit {
    pub tx_hash: String,
    pub height: u64,
    pub check_code: u32,
    pub deliver_code: u32,
}

/// A finalized block as returned by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockView {
    pub height: u64,
    pub app_hash: String,
    /// RFC3339 finalization time as reported by the engine.
    pub time: String,
    /// Raw transaction bytes in block order.
    pub txs: Vec<Vec<u8>>,
}

/// One hit from the engine's event index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxHit {
    pub tx_id: String,
    pub height: u64,
    pub index: u32,
}

/// Engine liveness and tip view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    pub node_id: String,
    pub latest_block_height: u64,
    pub latest_app_hash: String,
    pub catching_up: bool,
}

/// What the engine provides back to the node.
#[async_trait]
pub trait ConsensusClient: Send + Sync {
    /// Broadcast a transaction and block until its block is finalized.
    async fn broadcast_tx_commit(&self, tx: Vec<u8>) -> EngineResult<BroadcastCommit>;

    async fn block(&self, height: u64) -> EngineResult<BlockView>;

    /// Query the event index, e.g. `app_tx.request_id='<id>'` or
    /// `request.method='GET'`.
    async fn tx_search(&self, query: &str) -> EngineResult<Vec<TxHit>>;

    async fn status(&self) -> EngineResult<EngineStatus>;

    async fn abci_info(&self) -> EngineResult<AppInfo>;

    /// Forward a query to the application, e.g. `verify:<txid>`.
    async fn abci_query(&self, path: &str) -> EngineResult<QueryResult>;
}
