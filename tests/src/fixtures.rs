//! Shared wiring for the integration scenarios.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use shared_types::consensus::{Application, ConsensusClient};
use tl_01_service_registry::ServiceRegistry;
use tl_02_session_store::MemoryStore;
use tl_03_tx_log::{KeyValueStore, MemoryKvStore, TxLog};
use tl_04_replicated_executor::engine::LocalConsensusEngine;
use tl_04_replicated_executor::ReplicatedExecutor;
use tl_05_commit_bridge::CommitBridge;
use tl_06_session_handlers::{register_l1_routes, register_l2_routes};
use tl_07_web_gateway::{serve, GatewayNode, GatewayReply, Layer};

/// One replica's full stack: store, log, routes, executor.
pub struct Replica {
    pub node_id: String,
    pub store: Arc<MemoryStore>,
    pub log: Arc<TxLog>,
    pub registry: Arc<ServiceRegistry>,
    pub executor: Arc<ReplicatedExecutor>,
}

impl Replica {
    fn build(
        node_id: &str,
        kv: Arc<dyn KeyValueStore>,
        register: impl FnOnce(&ServiceRegistry, Arc<MemoryStore>),
    ) -> Self {
        let store = Arc::new(MemoryStore::seeded());
        let registry = Arc::new(ServiceRegistry::new());
        register(&registry, Arc::clone(&store));
        let log = Arc::new(TxLog::new(kv));
        let executor = Arc::new(ReplicatedExecutor::new(
            node_id,
            Arc::clone(&registry),
            Arc::clone(&log),
        ));
        Self {
            node_id: node_id.to_string(),
            store,
            log,
            registry,
            executor,
        }
    }

    pub fn l1(node_id: &str) -> Self {
        Self::build(node_id, Arc::new(MemoryKvStore::new()), |registry, store| {
            register_l1_routes(registry, store).unwrap();
        })
    }

    pub fn l2(node_id: &str, l1_endpoints: Vec<String>) -> Self {
        Self::build(node_id, Arc::new(MemoryKvStore::new()), |registry, store| {
            let bridge = Arc::new(CommitBridge::new(l1_endpoints));
            register_l2_routes(registry, store, bridge).unwrap();
        })
    }

    /// An interactivity-layer replica over a caller-supplied log backend.
    /// Used to drive log-failure scenarios.
    pub fn l2_with_log_backend(
        node_id: &str,
        l1_endpoints: Vec<String>,
        kv: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self::build(node_id, kv, |registry, store| {
            let bridge = Arc::new(CommitBridge::new(l1_endpoints));
            register_l2_routes(registry, store, bridge).unwrap();
        })
    }
}

/// A commitment-layer replica set with its gateway bound on localhost.
pub struct L1Cluster {
    pub replicas: Vec<Replica>,
    pub engine: Arc<LocalConsensusEngine>,
    pub gateway: Arc<GatewayNode>,
    pub base_url: String,
}

impl L1Cluster {
    pub async fn start(size: usize, ignored_votes: Vec<usize>) -> Self {
        let replicas: Vec<Replica> = (0..size)
            .map(|i| Replica::l1(&format!("l1-node-{i}")))
            .collect();
        let apps: Vec<Arc<dyn Application>> = replicas
            .iter()
            .map(|r| Arc::clone(&r.executor) as Arc<dyn Application>)
            .collect();
        let engine = Arc::new(
            LocalConsensusEngine::new("tandem-l1", apps).with_ignored_votes(ignored_votes),
        );
        engine.init().await;

        let gateway = Arc::new(GatewayNode::new(
            replicas[0].node_id.clone(),
            Layer::L1,
            Arc::clone(&replicas[0].registry),
            Arc::clone(&engine) as Arc<dyn ConsensusClient>,
        ));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server_node = Arc::clone(&gateway);
        tokio::spawn(async move {
            let _ = serve(server_node, listener, std::future::pending()).await;
        });

        Self {
            replicas,
            engine,
            gateway,
            base_url: format!("http://{addr}"),
        }
    }
}

/// An interactivity-layer node (optionally multi-replica), driven through
/// the gateway pipeline directly.
pub struct L2Node {
    pub replicas: Vec<Replica>,
    pub engine: Arc<LocalConsensusEngine>,
    pub gateway: Arc<GatewayNode>,
}

impl L2Node {
    pub async fn start(size: usize, l1_url: Option<String>, byzantine: bool) -> Self {
        let endpoints: Vec<String> = l1_url.into_iter().collect();
        let replicas: Vec<Replica> = (0..size)
            .map(|i| Replica::l2(&format!("l2-node-{i}"), endpoints.clone()))
            .collect();
        let apps: Vec<Arc<dyn Application>> = replicas
            .iter()
            .map(|r| Arc::clone(&r.executor) as Arc<dyn Application>)
            .collect();
        let engine = Arc::new(LocalConsensusEngine::new("tandem-l2", apps));
        engine.init().await;

        let gateway = Arc::new(
            GatewayNode::new(
                replicas[0].node_id.clone(),
                Layer::L2,
                Arc::clone(&replicas[0].registry),
                Arc::clone(&engine) as Arc<dyn ConsensusClient>,
            )
            .with_byzantine_mode(byzantine),
        );
        Self {
            replicas,
            engine,
            gateway,
        }
    }

    pub async fn post(&self, path: &str, body: Value) -> GatewayReply {
        let raw = if body.is_null() {
            String::new()
        } else {
            body.to_string()
        };
        self.gateway
            .dispatch("POST", path, BTreeMap::new(), "127.0.0.1:52000".into(), &raw)
            .await
    }

    pub async fn get(&self, path: &str) -> GatewayReply {
        self.gateway
            .dispatch("GET", path, BTreeMap::new(), "127.0.0.1:52000".into(), "")
            .await
    }
}

/// Drive a session through test-package, start, scan, validate, qc(pass),
/// label. Returns `(session_id, package_id)`.
pub async fn walk_to_labeled(l2: &L2Node) -> (String, String) {
    let reply = l2.post("/session/test-package", Value::Null).await;
    assert_eq!(reply.status, 201, "test-package: {}", reply.body);
    let package_id = reply.body["body"]["package_id"]
        .as_str()
        .unwrap()
        .to_string();

    let reply = l2
        .post(
            "/session/start",
            serde_json::json!({"operator_id": "OPR-001"}),
        )
        .await;
    assert_eq!(reply.status, 201, "start: {}", reply.body);
    let session_id = reply.body["body"]["id"].as_str().unwrap().to_string();

    let reply = l2
        .get(&format!("/session/{session_id}/scan/{package_id}"))
        .await;
    assert_eq!(reply.status, 200, "scan: {}", reply.body);

    let reply = l2
        .post(
            &format!("/session/{session_id}/validate"),
            serde_json::json!({"signature": "any", "package_id": package_id}),
        )
        .await;
    assert_eq!(reply.status, 202, "validate: {}", reply.body);

    let reply = l2
        .post(
            &format!("/session/{session_id}/qc"),
            serde_json::json!({"passed": true, "issues": ["all good"]}),
        )
        .await;
    assert_eq!(reply.status, 202, "qc: {}", reply.body);

    let reply = l2
        .post(
            &format!("/session/{session_id}/label"),
            serde_json::json!({
                "destination": "CUSTOMER A",
                "priority": "standard",
                "courier_id": "COU-001",
            }),
        )
        .await;
    assert_eq!(reply.status, 202, "label: {}", reply.body);

    (session_id, package_id)
}
