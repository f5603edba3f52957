//! In-process consensus engine.
//!
//! Drives one or more [`Application`] replicas through the full callback
//! sequence with serialized heights and a ⌊2n/3⌋+1 accept threshold. One
//! broadcast produces one block. With a single replica the layer degenerates
//! to a log-with-audit, which is the intended single-node mode.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use shared_types::consensus::{
    AppInfo, Application, BlockView, BroadcastCommit, ConsensusClient, EngineStatus, Event,
    ProposalVerdict, QueryResult, TxHit,
};
use shared_types::{EngineError, EngineResult};

struct IndexedEvent {
    tx_id: String,
    height: u64,
    index: u32,
    kind: String,
    attrs: Vec<(String, String)>,
}

#[derive(Default)]
struct ChainCore {
    height: u64,
    blocks: Vec<BlockView>,
    events: Vec<IndexedEvent>,
}

pub struct LocalConsensusEngine {
    chain_id: String,
    replicas: Vec<Arc<dyn Application>>,
    /// Replica indices whose votes are discarded (crashed or Byzantine
    /// voters). Test support for minority-fault scenarios.
    ignored_votes: HashSet<usize>,
    core: Mutex<ChainCore>,
}

impl LocalConsensusEngine {
    pub fn new(chain_id: impl Into<String>, replicas: Vec<Arc<dyn Application>>) -> Self {
        Self {
            chain_id: chain_id.into(),
            replicas,
            ignored_votes: HashSet::new(),
            core: Mutex::new(ChainCore::default()),
        }
    }

    pub fn with_ignored_votes(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.ignored_votes = indices.into_iter().collect();
        self
    }

    /// Run InitChain on every replica. Called once before serving.
    pub async fn init(&self) {
        for replica in &self.replicas {
            replica.init_chain(&self.chain_id).await;
        }
        info!(chain_id = %self.chain_id, replicas = self.replicas.len(), "chain initialized");
    }

    fn accept_threshold(&self) -> usize {
        (2 * self.replicas.len()) / 3 + 1
    }

    /// Associate block events with transactions. Events arrive in per-tx
    /// runs headed by an `app_tx` event carrying the tx id.
    fn index_events(core: &mut ChainCore, height: u64, events: Vec<Event>) {
        let mut current_tx = String::new();
        let mut index: u32 = 0;
        for event in events {
            if event.kind == "app_tx" {
                if let Some((_, tx_id)) = event.attrs.iter().find(|(k, _)| k == "tx_id") {
                    if !current_tx.is_empty() {
                        index += 1;
                    }
                    current_tx = tx_id.clone();
                }
            }
            core.events.push(IndexedEvent {
                tx_id: current_tx.clone(),
                height,
                index,
                kind: event.kind,
                attrs: event.attrs,
            });
        }
    }
}

#[async_trait]
impl ConsensusClient for LocalConsensusEngine {
    async fn broadcast_tx_commit(&self, tx: Vec<u8>) -> EngineResult<BroadcastCommit> {
        // One round at a time; this is the engine-side serialization the
        // executor callbacks rely on.
        let mut core = self.core.lock().await;

        let check = self.replicas[0].check_tx(&tx).await;
        if check.code != 0 {
            return Ok(BroadcastCommit {
                tx_hash: String::new(),
                height: 0,
                check_code: check.code,
                deliver_code: 0,
            });
        }

        let txs = self.replicas[0].prepare_proposal(vec![tx]).await;

        let mut accepts = 0;
        for (i, replica) in self.replicas.iter().enumerate() {
            let verdict = replica.process_proposal(&txs).await;
            if verdict == ProposalVerdict::Accept && !self.ignored_votes.contains(&i) {
                accepts += 1;
            }
        }
        if accepts < self.accept_threshold() {
            warn!(
                accepts,
                threshold = self.accept_threshold(),
                "proposal rejected by replica set"
            );
            return Err(EngineError::ProposalRejected);
        }

        let height = core.height + 1;
        let mut first_result = None;
        for replica in &self.replicas {
            let result = replica.finalize_block(height, &txs).await;
            if first_result.is_none() {
                first_result = Some(result);
            }
        }
        for replica in &self.replicas {
            replica.commit().await?;
        }

        let Some(result) = first_result else {
            return Err(EngineError::Fatal("no replicas configured".to_string()));
        };
        let tx_result = result
            .tx_results
            .first()
            .cloned()
            .unwrap_or_else(|| shared_types::consensus::TxResult {
                tx_id: String::new(),
                code: 1,
            });

        core.height = height;
        core.blocks.push(BlockView {
            height,
            app_hash: result.app_hash.clone(),
            time: chrono::Utc::now().to_rfc3339(),
            txs: txs.clone(),
        });
        Self::index_events(&mut core, height, result.events);

        Ok(BroadcastCommit {
            tx_hash: tx_result.tx_id,
            height,
            check_code: 0,
            deliver_code: tx_result.code,
        })
    }

    async fn block(&self, height: u64) -> EngineResult<BlockView> {
        let core = self.core.lock().await;
        core.blocks
            .iter()
            .find(|b| b.height == height)
            .cloned()
            .ok_or(EngineError::UnknownBlock(height))
    }

    async fn tx_search(&self, query: &str) -> EngineResult<Vec<TxHit>> {
        // Query grammar: `<kind>.<attr>='<value>'`.
        let (key_path, value) = query
            .split_once('=')
            .ok_or_else(|| EngineError::Rpc(format!("bad query: {query}")))?;
        let value = value.trim().trim_matches('\'');
        let (kind, attr) = key_path
            .trim()
            .split_once('.')
            .ok_or_else(|| EngineError::Rpc(format!("bad query key: {key_path}")))?;

        let core = self.core.lock().await;
        let mut hits = Vec::new();
        for event in &core.events {
            if event.kind == kind
                && event
                    .attrs
                    .iter()
                    .any(|(k, v)| k == attr && v == value)
                && !hits
                    .iter()
                    .any(|h: &TxHit| h.tx_id == event.tx_id && h.height == event.height)
            {
                hits.push(TxHit {
                    tx_id: event.tx_id.clone(),
                    height: event.height,
                    index: event.index,
                });
            }
        }
        Ok(hits)
    }

    async fn status(&self) -> EngineResult<EngineStatus> {
        let info = self.replicas[0].info().await;
        Ok(EngineStatus {
            node_id: info.node_id,
            latest_block_height: info.last_block_height,
            latest_app_hash: info.last_block_app_hash,
            catching_up: false,
        })
    }

    async fn abci_info(&self) -> EngineResult<AppInfo> {
        Ok(self.replicas[0].info().await)
    }

    async fn abci_query(&self, path: &str) -> EngineResult<QueryResult> {
        Ok(self.replicas[0].query(path).await)
    }
}
