//! Quality-check step.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use shared_types::{ids, QcRecord, Request, Response};
use tl_01_service_registry::{Handler, PathParams};
use tl_02_session_store::SessionStore;

use crate::respond;

/// `POST /session/:id/qc` — record a quality check on the bound package and
/// flip it to `qc_passed`/`qc_failed`.
pub struct QualityCheckHandler {
    store: Arc<dyn SessionStore>,
}

impl QualityCheckHandler {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for QualityCheckHandler {
    async fn handle(&self, request: &Request, params: &PathParams) -> Response {
        let session_id = &params["id"];
        let body = match respond::parse_body(&request.body) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let passed = match respond::require_bool(&body, "passed") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let issues = match respond::string_list(&body, "issues") {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        let session = match self.store.session(session_id).await {
            Ok(s) => s,
            Err(e) => return respond::store_error(&e),
        };
        let package = match self.store.package_for_session(session_id).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                return Response::error(
                    409,
                    &format!("No package bound to session {session_id}"),
                )
            }
            Err(e) => return respond::store_error(&e),
        };

        let qc = QcRecord {
            id: ids::qc_id(&package.id, session_id),
            package_id: package.id.clone(),
            session_id: session_id.to_string(),
            passed,
            inspector_id: session.operator_id,
            issues,
        };
        match self.store.record_qc(&qc, &request.timestamp).await {
            Ok(()) => Response::json(
                202,
                &json!({
                    "qc_id": qc.id,
                    "package_id": qc.package_id,
                    "passed": qc.passed,
                }),
            ),
            Err(e) => respond::store_error(&e),
        }
    }
}
