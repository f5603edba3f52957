//! # Request/Response Envelope
//!
//! The canonical record of one HTTP exchange. The origin node executes the
//! handler, pairs the computed [`Response`] with the ingress [`Request`], and
//! broadcasts the resulting [`Transaction`] to the replica set; the canonical
//! byte form of the transaction IS the consensus transaction.
//!
//! ## Equality Contract
//!
//! Replicas compare replayed responses by `(status, body)` only. Header maps
//! and locally computed timestamps are excluded because HTTP stacks do not
//! produce them deterministically; any consensus-relevant value therefore
//! belongs in the body.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::canonical;
use crate::errors::EnvelopeError;
use crate::ids;

/// An HTTP request as captured at ingress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// HTTP method, upper-case.
    pub method: String,
    /// Request path, no query string.
    pub path: String,
    /// Header map. Carried for audit; excluded from replay equality.
    pub headers: BTreeMap<String, String>,
    /// Body, compacted to canonical JSON at ingress.
    pub body: String,
    /// Client address as seen by the origin node.
    pub remote_addr: String,
    /// 16-byte random hex id assigned at ingress. The sole source of
    /// randomness that enters the envelope.
    pub request_id: String,
    /// RFC3339 ingress timestamp. Input to replay, never derived during it.
    pub timestamp: String,
}

/// The response a handler computed for a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Header map. Excluded from replay equality.
    pub headers: BTreeMap<String, String>,
    /// Body string. Handlers emit canonical JSON.
    pub body: String,
}

impl Response {
    /// Build a JSON response with the canonical body encoding.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status,
            headers,
            body: canonical::to_canonical_string(body),
        }
    }

    /// Build an error response carrying `{"error": <message>}`.
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }

    /// Replay equality: status and body only.
    pub fn replay_eq(&self, other: &Response) -> bool {
        self.status == other.status && self.body == other.body
    }

    /// Parsed view of the body, if it is JSON.
    pub fn parsed_body(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// The consensus transaction: one executed exchange plus its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub request: Request,
    pub response: Response,
    /// Node id of the origin (the node that executed the handler first).
    pub origin_node: String,
    /// Filled after finalization; zero while in flight.
    #[serde(default)]
    pub block_height: u64,
}

impl Transaction {
    pub fn new(request: Request, response: Response, origin_node: impl Into<String>) -> Self {
        Self {
            request,
            response,
            origin_node: origin_node.into(),
            block_height: 0,
        }
    }

    /// Transaction id, derived from the ingress request-id and origin node.
    pub fn tx_id(&self) -> String {
        ids::tx_id(&self.request.request_id, &self.origin_node)
    }

    /// Canonical byte form. These bytes are what the engine orders and what
    /// the transaction log stores.
    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        canonical::canonical_bytes(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(bytes).map_err(|e| EnvelopeError::Decode(e.to_string()))
    }
}
