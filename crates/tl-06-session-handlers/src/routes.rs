//! Fixed-order route registration.
//!
//! Registration order is part of the replicated contract: pattern ambiguity
//! resolves first-registered-wins, so every node must register in the same
//! order. Both functions run once at startup.

use std::sync::Arc;

use tl_01_service_registry::{RegistryError, ServiceRegistry};
use tl_02_session_store::SessionStore;
use tl_05_commit_bridge::CommitBridge;

use crate::handlers::commit::CommitSessionHandler;
use crate::handlers::label::AttachLabelHandler;
use crate::handlers::package::{ScanPackageHandler, ValidatePackageHandler};
use crate::handlers::qc::QualityCheckHandler;
use crate::handlers::replicate::ReplicateCommitHandler;
use crate::handlers::session::{CreateTestPackageHandler, StartSessionHandler};

/// Interactivity-layer surface: the full per-step workflow.
pub fn register_l2_routes(
    registry: &ServiceRegistry,
    store: Arc<dyn SessionStore>,
    bridge: Arc<CommitBridge>,
) -> Result<(), RegistryError> {
    registry.register(
        "POST",
        "/session/start",
        true,
        Arc::new(StartSessionHandler::new(Arc::clone(&store))),
    )?;
    registry.register(
        "POST",
        "/session/test-package",
        true,
        Arc::new(CreateTestPackageHandler::new(Arc::clone(&store))),
    )?;
    registry.register(
        "GET",
        "/session/:id/scan/:pkgId",
        false,
        Arc::new(ScanPackageHandler::new(Arc::clone(&store))),
    )?;
    registry.register(
        "POST",
        "/session/:id/validate",
        false,
        Arc::new(ValidatePackageHandler::new(Arc::clone(&store))),
    )?;
    registry.register(
        "POST",
        "/session/:id/qc",
        false,
        Arc::new(QualityCheckHandler::new(Arc::clone(&store))),
    )?;
    registry.register(
        "POST",
        "/session/:id/label",
        false,
        Arc::new(AttachLabelHandler::new(Arc::clone(&store))),
    )?;
    registry.register(
        "POST",
        "/commit/:id",
        false,
        Arc::new(CommitSessionHandler::new(store, bridge)),
    )?;
    Ok(())
}

/// Commitment-layer surface: replication only.
pub fn register_l1_routes(
    registry: &ServiceRegistry,
    store: Arc<dyn SessionStore>,
) -> Result<(), RegistryError> {
    registry.register(
        "POST",
        "/session/:id/commit-l1",
        false,
        Arc::new(ReplicateCommitHandler::new(store)),
    )
}
