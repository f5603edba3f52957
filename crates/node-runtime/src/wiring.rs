//! Subsystem wiring.
//!
//! The process owns one (engine, store, log, registry) tuple, built here in
//! a fixed order so every replica resolves routes and replays identically.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use shared_types::consensus::{Application, ConsensusClient};
use tl_01_service_registry::ServiceRegistry;
use tl_02_session_store::{MemoryStore, PostgresStore, SessionStore};
use tl_03_tx_log::{KeyValueStore, MemoryKvStore, RocksDbStore, TxLog};
use tl_04_replicated_executor::engine::{LocalConsensusEngine, RpcConsensusEngine};
use tl_04_replicated_executor::ReplicatedExecutor;
use tl_05_commit_bridge::CommitBridge;
use tl_06_session_handlers::{register_l1_routes, register_l2_routes};
use tl_07_web_gateway::{GatewayNode, Layer};

use crate::config::{LayerArg, NodeOptions};

/// Build the gateway node for this process.
pub async fn build_gateway(opts: &NodeOptions) -> Result<Arc<GatewayNode>> {
    let layer = match opts.layer {
        LayerArg::L1 => Layer::L1,
        LayerArg::L2 => Layer::L2,
    };

    let store: Arc<dyn SessionStore> = if opts.store == "memory" {
        info!("using in-memory session store");
        Arc::new(MemoryStore::seeded())
    } else {
        let store = PostgresStore::connect(&opts.store).await?;
        store.migrate_and_seed().await?;
        Arc::new(store)
    };

    let registry = Arc::new(ServiceRegistry::new());
    match layer {
        Layer::L2 => {
            let bridge = Arc::new(CommitBridge::new(opts.l1_endpoints.clone()));
            register_l2_routes(&registry, Arc::clone(&store), bridge)?;
        }
        Layer::L1 => {
            register_l1_routes(&registry, Arc::clone(&store))?;
        }
    }
    info!(routes = registry.route_count(), layer = layer.as_str(), "routes registered");

    let kv: Arc<dyn KeyValueStore> = match &opts.log_dir {
        Some(dir) => Arc::new(RocksDbStore::open(dir)?),
        None => Arc::new(MemoryKvStore::new()),
    };
    let log = Arc::new(TxLog::new(kv));
    let executor = Arc::new(ReplicatedExecutor::new(
        opts.node_id.clone(),
        Arc::clone(&registry),
        log,
    ));

    let engine: Arc<dyn ConsensusClient> = match &opts.engine_rpc {
        Some(url) => {
            info!(%url, "using external consensus engine");
            Arc::new(RpcConsensusEngine::new(url.clone()))
        }
        None => {
            let chain_id = format!("tandem-{}", layer.as_str());
            let engine =
                LocalConsensusEngine::new(chain_id, vec![executor as Arc<dyn Application>]);
            engine.init().await;
            Arc::new(engine)
        }
    };

    Ok(Arc::new(
        GatewayNode::new(opts.node_id.clone(), layer, registry, engine)
            .with_byzantine_mode(opts.byzantine),
    ))
}
