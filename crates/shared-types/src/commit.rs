//! # Commit-Replication Wire Format
//!
//! The canonical payload the interactivity layer sends to
//! `POST /session/:id/commit-l1` when promoting a finished session. Both
//! sides of the bridge share this type: the L2 commit handler synthesizes it
//! and every L1 replica parses the identical canonical bytes during replay.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical;

/// Body of the L1 commit-replication request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReplicationPayload {
    pub operator_id: String,
    pub package_id: String,
    pub supplier_signature: String,
    pub qc_passed: bool,
    pub issues: Vec<String>,
    /// RFC3339; the ingress timestamp of the originating commit request.
    pub timestamp: String,
    /// Label id.
    pub label: String,
    pub destination: String,
    pub priority: String,
    pub courier_id: String,
}

impl CommitReplicationPayload {
    /// Digest over the material fields, used for the L1 idempotency check.
    ///
    /// The timestamp is excluded: a client retry of a lost commit carries a
    /// fresh envelope but identical material content, and must be treated as
    /// already-replicated rather than as a conflict.
    pub fn material_digest(&self, session_id: &str) -> String {
        let material = serde_json::json!({
            "session_id": session_id,
            "operator_id": self.operator_id,
            "package_id": self.package_id,
            "supplier_signature": self.supplier_signature,
            "qc_passed": self.qc_passed,
            "issues": self.issues,
            "label": self.label,
            "destination": self.destination,
            "priority": self.priority,
            "courier_id": self.courier_id,
        });
        let mut hasher = Sha256::new();
        hasher.update(canonical::to_canonical_string(&material).as_bytes());
        hex::encode(hasher.finalize())
    }
}
