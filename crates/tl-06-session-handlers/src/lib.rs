//! # Session Handlers (tl-06)
//!
//! The concrete handler surface of the workflow. Every handler is a pure
//! function of (request, store state at its sequence position): ids are
//! derived from envelope inputs, timestamps come from the envelope, and
//! store failures are encoded into the response body so every replica
//! records the failure identically.
//!
//! The interactivity layer registers the full per-step surface; the
//! commitment layer registers only the replication handler.

mod handlers;
mod respond;
mod routes;

pub use handlers::commit::CommitSessionHandler;
pub use handlers::label::AttachLabelHandler;
pub use handlers::package::{ScanPackageHandler, ValidatePackageHandler};
pub use handlers::qc::QualityCheckHandler;
pub use handlers::replicate::ReplicateCommitHandler;
pub use handlers::session::{CreateTestPackageHandler, StartSessionHandler};
pub use routes::{register_l1_routes, register_l2_routes};
