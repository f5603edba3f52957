//! # Tandem-Ledger Node Runtime
//!
//! Entry point for one node of the two-layer BFT supply-chain service.
//! An interactivity-layer node serves the per-step workflow endpoints; a
//! commitment-layer node serves the replication endpoint. Both host the
//! replicated executor behind a consensus engine and log every accepted
//! transaction.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use node_runtime::{build_gateway, NodeOptions};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let opts = NodeOptions::parse();
    info!("===========================================");
    info!("  Tandem-Ledger Node Runtime v0.1.0");
    info!("===========================================");
    info!(node_id = %opts.node_id, layer = ?opts.layer, port = opts.port, home = %opts.home.display());

    let gateway = build_gateway(&opts).await?;

    // Stop serving on operator request, or the moment the node records a
    // fatal application error (a log flush failed after finalization): a
    // replica that kept serving past that point would silently diverge
    // from the set.
    let mut fatal = gateway.subscribe_fatal();
    let shutdown = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
            _ = fatal.changed() => {}
        }
    };

    let addr: SocketAddr = ([0, 0, 0, 0], opts.port).into();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tl_07_web_gateway::serve(Arc::clone(&gateway), listener, shutdown).await?;

    if let Some(reason) = gateway.fatal_reason() {
        error!(%reason, "halting to preserve the replica invariant");
        anyhow::bail!("fatal application error: {reason}");
    }
    info!("node stopped");
    Ok(())
}
