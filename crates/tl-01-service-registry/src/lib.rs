//! # Service Registry (tl-01)
//!
//! Maps `(method, path)` to the deterministic handler that executes it. The
//! same registry instance backs both the HTTP boundary (first execution at
//! the origin node) and the replicated executor (replay at every other
//! replica), so route resolution itself must be deterministic.
//!
//! ## Resolution rules
//!
//! 1. Exact routes win over pattern routes.
//! 2. Pattern segments starting with `:` match exactly one path segment.
//! 3. Among ambiguous patterns, the first-registered route wins.
//! 4. Duplicate exact registration for one `(method, path)` is an error.
//!
//! Registrations happen at startup in a fixed order on every node; the
//! registry is read-mostly afterwards and permits concurrent lookups.

mod registry;
mod route;

pub use registry::{RegistryError, ServiceRegistry};
pub use route::{PathParams, RouteMatch};

use async_trait::async_trait;
use shared_types::{Request, Response};

/// A deterministic request handler.
///
/// Handlers are pure over the session store: the output depends only on the
/// request and the store state at the handler's sequence position. A handler
/// failure is encoded into the returned [`Response`]; the envelope is
/// broadcast either way so every replica records the failure identically.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: &Request, params: &PathParams) -> Response;
}
