//! The registry itself.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use crate::route::{match_pattern, parse_pattern, PatternRoute, RouteMatch};
use crate::Handler;

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// Two exact registrations for the same `(method, path)`.
    #[error("Duplicate exact route: {method} {path}")]
    DuplicateRoute { method: String, path: String },
}

#[derive(Default)]
struct Inner {
    exact: HashMap<(String, String), Arc<dyn Handler>>,
    /// Registration order is the ambiguity tie-break; never reordered.
    patterns: Vec<PatternRoute>,
}

/// Concurrent `(method, path)` → handler table.
#[derive(Default)]
pub struct ServiceRegistry {
    inner: RwLock<Inner>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. `exact` routes match the path verbatim; pattern
    /// routes may contain `:name` segments.
    pub fn register(
        &self,
        method: &str,
        path: &str,
        exact: bool,
        handler: Arc<dyn Handler>,
    ) -> Result<(), RegistryError> {
        let method = method.to_uppercase();
        let mut inner = self.inner.write();
        if exact {
            let key = (method.clone(), path.to_string());
            if inner.exact.contains_key(&key) {
                return Err(RegistryError::DuplicateRoute {
                    method,
                    path: path.to_string(),
                });
            }
            debug!(%method, path, "registered exact route");
            inner.exact.insert(key, handler);
        } else {
            debug!(%method, path, "registered pattern route");
            inner.patterns.push(PatternRoute {
                method,
                segments: parse_pattern(path),
                raw: path.to_string(),
                handler,
            });
        }
        Ok(())
    }

    /// Resolve a request. Exact beats pattern; among patterns the first
    /// registered wins.
    pub fn lookup(&self, method: &str, path: &str) -> Option<RouteMatch> {
        let method = method.to_uppercase();
        let inner = self.inner.read();
        if let Some(handler) = inner.exact.get(&(method.clone(), path.to_string())) {
            return Some(RouteMatch {
                handler: Arc::clone(handler),
                params: Default::default(),
            });
        }
        for route in &inner.patterns {
            if route.method != method {
                continue;
            }
            if let Some(params) = match_pattern(&route.segments, path) {
                return Some(RouteMatch {
                    handler: Arc::clone(&route.handler),
                    params,
                });
            }
        }
        None
    }

    /// Number of registered routes (exact + pattern).
    pub fn route_count(&self) -> usize {
        let inner = self.inner.read();
        inner.exact.len() + inner.patterns.len()
    }

    /// Registered pattern paths in registration order, for telemetry.
    pub fn pattern_paths(&self) -> Vec<String> {
        self.inner
            .read()
            .patterns
            .iter()
            .map(|r| format!("{} {}", r.method, r.raw))
            .collect()
    }
}
