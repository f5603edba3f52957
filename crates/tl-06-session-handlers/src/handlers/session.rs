//! Session creation and test-package generation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use shared_types::{
    ids, ItemRecord, PackageRecord, PackageStatus, Request, Response, SessionRecord, SessionStatus,
};
use tl_01_service_registry::{Handler, PathParams};
use tl_02_session_store::SessionStore;

use crate::respond;

/// `POST /session/start` — open a new workflow session for an operator.
pub struct StartSessionHandler {
    store: Arc<dyn SessionStore>,
}

impl StartSessionHandler {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for StartSessionHandler {
    async fn handle(&self, request: &Request, _params: &PathParams) -> Response {
        let body = match respond::parse_body(&request.body) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let operator_id = match respond::require_str(&body, "operator_id") {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        let session = SessionRecord {
            id: ids::session_id(&request.request_id),
            operator_id: operator_id.to_string(),
            status: SessionStatus::Active,
            is_committed: false,
            tx_hash: None,
            created_at: request.timestamp.clone(),
            updated_at: request.timestamp.clone(),
        };
        match self.store.create_session(&session).await {
            Ok(()) => Response::json(
                201,
                &json!({
                    "id": session.id,
                    "operator_id": session.operator_id,
                    "status": session.status.as_str(),
                }),
            ),
            Err(e) => respond::store_error(&e),
        }
    }
}

/// `POST /session/test-package` — mint a package with catalog contents.
///
/// Exists so a workflow can be exercised end to end without an upstream
/// goods-receipt feed; ids and the supplier signature are derived from the
/// request id so replay mints the identical package.
pub struct CreateTestPackageHandler {
    store: Arc<dyn SessionStore>,
}

impl CreateTestPackageHandler {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for CreateTestPackageHandler {
    async fn handle(&self, request: &Request, _params: &PathParams) -> Response {
        let package_id = ids::package_id(&request.request_id);
        let catalog = match self.store.catalog().await {
            Ok(c) => c,
            Err(e) => return respond::store_error(&e),
        };
        let items: Vec<ItemRecord> = catalog
            .iter()
            .enumerate()
            .map(|(i, entry)| ItemRecord {
                id: format!("ITM-{}-{}", package_id, i + 1),
                package_id: package_id.clone(),
                name: entry.name.clone(),
                quantity: entry.default_quantity,
            })
            .collect();
        let package = PackageRecord {
            id: package_id.clone(),
            supplier_id: Some("SUP-001".to_string()),
            delivery_note_id: ids::delivery_note_id(&request.request_id),
            supplier_signature: ids::supplier_signature(&package_id),
            is_trusted: false,
            status: PackageStatus::Pending,
            session_id: None,
        };
        match self.store.create_package(&package, &items).await {
            Ok(()) => Response::json(201, &json!({ "package_id": package_id })),
            Err(e) => respond::store_error(&e),
        }
    }
}
