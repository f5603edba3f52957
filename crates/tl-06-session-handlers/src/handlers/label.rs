//! Labeling step.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use shared_types::{ids, LabelRecord, Request, Response};
use tl_01_service_registry::{Handler, PathParams};
use tl_02_session_store::SessionStore;

use crate::respond;

/// `POST /session/:id/label` — attach a dispatch label to a package that
/// passed quality control.
pub struct AttachLabelHandler {
    store: Arc<dyn SessionStore>,
}

impl AttachLabelHandler {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for AttachLabelHandler {
    async fn handle(&self, request: &Request, params: &PathParams) -> Response {
        let session_id = &params["id"];
        let body = match respond::parse_body(&request.body) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let destination = match respond::require_str(&body, "destination") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let priority = match respond::require_str(&body, "priority") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let courier_id = match respond::require_str(&body, "courier_id") {
            Ok(v) => v,
            Err(resp) => return resp,
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

        let label = LabelRecord {
            id: ids::label_id(courier_id, &package.id, session_id),
            package_id: package.id.clone(),
            session_id: session_id.to_string(),
            destination: destination.to_string(),
            courier_id: courier_id.to_string(),
            priority: priority.to_string(),
        };
        match self.store.attach_label(&label).await {
            Ok(()) => Response::json(
                202,
                &json!({
                    "label_id": label.id,
                    "package_id": label.package_id,
                    "destination": label.destination,
                }),
            ),
            Err(e) => respond::store_error(&e),
        }
    }
}
