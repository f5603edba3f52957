//! Commitment-layer side of the bridge.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use shared_types::{CommitReplicationPayload, Request, Response};
use tl_01_service_registry::{Handler, PathParams};
use tl_02_session_store::{ReplicationOutcome, SessionStore};

use crate::respond;

/// `POST /session/:id/commit-l1` — idempotently materialize a committed
/// session. Replays on every replica exactly like any other handler; the
/// idempotency key is the session id, and a repeat with identical material
/// content answers exactly like the first materialization.
pub struct ReplicateCommitHandler {
    store: Arc<dyn SessionStore>,
}

impl ReplicateCommitHandler {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for ReplicateCommitHandler {
    async fn handle(&self, request: &Request, params: &PathParams) -> Response {
        let session_id = &params["id"];
        let body = match respond::parse_body(&request.body) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let payload: CommitReplicationPayload = match serde_json::from_value(body) {
            Ok(p) => p,
            Err(_) => return Response::error(400, "Malformed replication payload"),
        };

        match self.store.replicate_committed(session_id, &payload).await {
            Ok(outcome) => {
                if outcome == ReplicationOutcome::Replicated {
                    info!(session_id, "session materialized on commitment layer");
                }
                Response::json(
                    202,
                    &json!({ "session_id": session_id, "status": "replicated" }),
                )
            }
            Err(e) => respond::store_error(&e),
        }
    }
}
