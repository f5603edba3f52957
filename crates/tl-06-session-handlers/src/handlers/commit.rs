//! The session commit: gate checks, promotion to the commitment layer,
//! local terminal write.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use shared_types::{PackageStatus, Request, Response};
use tl_01_service_registry::{Handler, PathParams};
use tl_02_session_store::SessionStore;
use tl_05_commit_bridge::{BridgeError, CommitBridge};

use crate::respond;

/// `POST /commit/:id` — commit a finished session.
///
/// Order matters: every gate is checked before the outbound replication
/// call, and the local terminal write happens only after the commitment
/// layer has confirmed block inclusion. A replication failure therefore
/// leaves the session in its pre-commit state, free to be retried.
pub struct CommitSessionHandler {
    store: Arc<dyn SessionStore>,
    bridge: Arc<CommitBridge>,
}

impl CommitSessionHandler {
    pub fn new(store: Arc<dyn SessionStore>, bridge: Arc<CommitBridge>) -> Self {
        Self { store, bridge }
    }
}

#[async_trait]
impl Handler for CommitSessionHandler {
    async fn handle(&self, request: &Request, params: &PathParams) -> Response {
        let session_id = &params["id"];
        let body = match respond::parse_body(&request.body) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let operator_id = match respond::require_str(&body, "operator_id") {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        let rollup = match self.store.session_rollup(session_id).await {
            Ok(r) => r,
            Err(e) => return respond::store_error(&e),
        };
        if rollup.session.is_committed {
            return Response::error(409, &format!("Session {session_id} already committed"));
        }
        if rollup.session.operator_id != operator_id {
            return Response::error(409, &format!("Operator mismatch for session {session_id}"));
        }
        match &rollup.package {
            Some(p) if p.status == PackageStatus::QcPassed => {}
            _ => return Response::error(409, "Package not ready for commit"),
        }
        if rollup.label.is_none() {
            return Response::error(409, &format!("Label missing for session {session_id}"));
        }

        let payload = match CommitBridge::payload_from_rollup(&rollup, &request.timestamp) {
            Ok(p) => p,
            Err(e) => return Response::error(409, &e.to_string()),
        };

        let l1 = match self.bridge.replicate(session_id, &payload).await {
            Ok(l1) => l1,
            Err(BridgeError::Rejected { status, .. }) => {
                warn!(session_id, status, "commitment layer rejected session commit");
                return Response::error(status, "Cross-layer commit rejected");
            }
            Err(BridgeError::NoEndpoint) => {
                return Response::error(500, "No commitment-layer endpoint configured")
            }
            Err(e) => {
                warn!(session_id, error = %e, "commitment layer unreachable");
                return Response::error(502, "Commitment layer unreachable");
            }
        };

        if let Err(e) = self
            .store
            .commit_session(
                session_id,
                operator_id,
                &l1.tx_hash,
                l1.block_height,
                &request.timestamp,
            )
            .await
        {
            return respond::store_error(&e);
        }
        info!(
            session_id,
            l1_height = l1.block_height,
            l1_tx = %l1.tx_hash,
            "session committed"
        );
        Response::json(
            202,
            &json!({
                "l1": { "BlockHeight": l1.block_height, "TxHash": l1.tx_hash },
                "l2": { "session_id": session_id, "status": "committed" },
            }),
        )
    }
}
