//! # Deterministic Id Derivation
//!
//! Every id minted during handler execution must be a pure function of
//! envelope inputs: replaying replicas re-derive the same id from the same
//! request, which is what makes response comparison meaningful.
//!
//! The only randomness in the system is the 16-byte ingress request-id,
//! assigned once by the origin node and carried inside the envelope.

use sha2::{Digest, Sha256};

/// Transaction id: `SHA256(request_id ‖ origin_node)`, hex.
pub fn tx_id(request_id: &str, origin_node: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request_id.as_bytes());
    hasher.update(origin_node.as_bytes());
    hex::encode(hasher.finalize())
}

/// Session id minted by the session-start handler.
pub fn session_id(request_id: &str) -> String {
    format!("SESSION-{request_id}")
}

/// Package id minted by the test-package handler.
pub fn package_id(request_id: &str) -> String {
    let prefix: String = request_id.chars().take(8).collect();
    format!("PKG-{prefix}")
}

/// Quality-check record id: `QC-<SHA256(package ‖ session)[..16]>`.
pub fn qc_id(package_id: &str, session_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(package_id.as_bytes());
    hasher.update(session_id.as_bytes());
    format!("QC-{}", &hex::encode(hasher.finalize())[..16])
}

/// Label id: `LBL-<SHA256(courier ‖ package ‖ session)[..16]>`.
pub fn label_id(courier_id: &str, package_id: &str, session_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(courier_id.as_bytes());
    hasher.update(package_id.as_bytes());
    hasher.update(session_id.as_bytes());
    format!("LBL-{}", &hex::encode(hasher.finalize())[..16])
}

/// Delivery-note id for a generated test package.
pub fn delivery_note_id(request_id: &str) -> String {
    let prefix: String = request_id.chars().take(8).collect();
    format!("DN-{prefix}")
}

/// Deterministic supplier signature for a generated test package.
pub fn supplier_signature(package_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(package_id.as_bytes());
    format!("SIG-{}", &hex::encode(hasher.finalize())[..16])
}

/// Application hash over a finalized block: `SHA256(tx_id_0 ‖ tx_id_1 ‖ …)`.
pub fn app_hash(tx_ids: &[String]) -> String {
    let mut hasher = Sha256::new();
    for id in tx_ids {
        hasher.update(id.as_bytes());
    }
    hex::encode(hasher.finalize())
}
