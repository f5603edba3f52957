//! Scan and validation steps.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use shared_types::{Request, Response, SessionStatus};
use tl_01_service_registry::{Handler, PathParams};
use tl_02_session_store::SessionStore;

use crate::respond;

/// `GET /session/:id/scan/:pkgId` — move the package into
/// `pending_validation` and return its expected contents for checking
/// against the physical delivery.
pub struct ScanPackageHandler {
    store: Arc<dyn SessionStore>,
}

impl ScanPackageHandler {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for ScanPackageHandler {
    async fn handle(&self, _request: &Request, params: &PathParams) -> Response {
        let session_id = &params["id"];
        let package_id = &params["pkgId"];

        let session = match self.store.session(session_id).await {
            Ok(s) => s,
            Err(e) => return respond::store_error(&e),
        };
        if session.status != SessionStatus::Active {
            return Response::error(
                409,
                &format!("Session {session_id} is {}", session.status.as_str()),
            );
        }

        let package = match self.store.begin_scan(package_id).await {
            Ok(p) => p,
            Err(e) => return respond::store_error(&e),
        };
        let items = match self.store.package_items(package_id).await {
            Ok(i) => i,
            Err(e) => return respond::store_error(&e),
        };
        let expected: Vec<_> = items
            .iter()
            .map(|item| json!({ "name": item.name, "quantity": item.quantity }))
            .collect();
        Response::json(
            200,
            &json!({
                "package_id": package.id,
                "supplier_signature": package.supplier_signature,
                "status": package.status.as_str(),
                "expected_contents": expected,
            }),
        )
    }
}

/// `POST /session/:id/validate` — bind the scanned package to the session
/// and mark it trusted.
pub struct ValidatePackageHandler {
    store: Arc<dyn SessionStore>,
}

impl ValidatePackageHandler {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for ValidatePackageHandler {
    async fn handle(&self, request: &Request, params: &PathParams) -> Response {
        let session_id = &params["id"];
        let body = match respond::parse_body(&request.body) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let package_id = match respond::require_str(&body, "package_id") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        // The signature accompanies the delivery note; presence is required,
        // verification against the supplier registry is upstream's concern.
        if let Err(resp) = respond::require_str(&body, "signature") {
            return resp;
        }

        match self
            .store
            .bind_package(session_id, package_id, &request.timestamp)
            .await
        {
            Ok(()) => Response::json(
                202,
                &json!({
                    "session_id": session_id,
                    "package_id": package_id,
                    "status": "validated",
                }),
            ),
            Err(e) => respond::store_error(&e),
        }
    }
}
