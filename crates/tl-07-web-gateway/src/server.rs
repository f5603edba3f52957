//! axum transport glue.
//!
//! Gateway-local routes are declared explicitly; everything else falls back
//! into the consensus pipeline via the service registry.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::{ConnectInfo, Path, Request as AxumRequest, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response as AxumResponse};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::page;
use crate::pipeline::{GatewayNode, GatewayReply};

const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn build_router(node: Arc<GatewayNode>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/status/:txid", get(status_view))
        .route("/block/:height", get(block_view))
        .route("/debug", get(debug_view))
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(node)
}

/// Bind and serve until the provided shutdown future resolves.
pub async fn serve(
    node: Arc<GatewayNode>,
    listener: tokio::net::TcpListener,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, node_id = node.node_id(), "gateway listening");
    let app = build_router(node).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

fn to_http(reply: GatewayReply) -> AxumResponse {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        reply.body.to_string(),
    )
        .into_response()
}

async fn index(State(node): State<Arc<GatewayNode>>) -> Html<String> {
    let debug = node.debug_view().await;
    let height = debug.body["last_block_height"].as_u64();
    Html(page::render(
        node.node_id(),
        node.layer().as_str(),
        debug.body["routes"].as_u64().unwrap_or(0) as usize,
        height,
    ))
}

async fn status_view(
    State(node): State<Arc<GatewayNode>>,
    Path(txid): Path<String>,
) -> AxumResponse {
    to_http(node.status_view(&txid).await)
}

async fn block_view(
    State(node): State<Arc<GatewayNode>>,
    Path(height): Path<u64>,
) -> AxumResponse {
    to_http(node.block_view(height).await)
}

async fn debug_view(State(node): State<Arc<GatewayNode>>) -> AxumResponse {
    to_http(node.debug_view().await)
}

/// Everything not handled above enters the consensus pipeline.
async fn dispatch(
    State(node): State<Arc<GatewayNode>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: AxumRequest,
) -> AxumResponse {
    let (parts, body) = request.into_parts();
    let method = parts.method.as_str().to_string();
    let path = parts.uri.path().to_string();
    let mut headers = BTreeMap::new();
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            headers.insert(name.to_string(), value.to_string());
        }
    }
    let remote_addr = connect_info
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let raw_body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => {
            return to_http(GatewayReply {
                status: 400,
                body: serde_json::json!({ "error": "Unreadable request body" }),
            })
        }
    };

    to_http(
        node.dispatch(&method, &path, headers, remote_addr, &raw_body)
            .await,
    )
}
