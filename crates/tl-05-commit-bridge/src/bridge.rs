//! Payload synthesis and the outbound replication call.

use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use shared_types::CommitReplicationPayload;
use tl_02_session_store::SessionRollup;

const REPLICATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// No commitment-layer endpoint configured for this node.
    #[error("No commitment-layer endpoint configured")]
    NoEndpoint,

    /// The rollup is missing a piece the payload needs. The caller's gate
    /// checks should have caught this first.
    #[error("Session rollup incomplete: {0}")]
    IncompleteRollup(String),

    /// Transport failure or timeout reaching the commitment layer.
    #[error("Commitment layer unreachable: {0}")]
    Unreachable(String),

    /// The commitment layer answered with a non-success status.
    #[error("Commitment layer rejected the commit: status {status}")]
    Rejected { status: u16, body: String },

    /// The reply arrived but did not carry the expected block reference.
    #[error("Malformed commitment-layer reply: {0}")]
    MalformedReply(String),
}

/// Durable reference returned by the commitment layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L1Ref {
    pub block_height: u64,
    pub tx_hash: String,
}

pub struct CommitBridge {
    endpoints: Vec<String>,
    client: reqwest::Client,
}

impl CommitBridge {
    pub fn new(endpoints: Vec<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REPLICATION_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { endpoints, client }
    }

    /// Synthesize the canonical replication payload from a session rollup.
    /// The timestamp is the ingress timestamp of the commit request, so every
    /// replaying replica synthesizes identical bytes.
    pub fn payload_from_rollup(
        rollup: &SessionRollup,
        timestamp: &str,
    ) -> Result<CommitReplicationPayload, BridgeError> {
        let package = rollup
            .package
            .as_ref()
            .ok_or_else(|| BridgeError::IncompleteRollup("no bound package".into()))?;
        let qc = rollup
            .qc
            .last()
            .ok_or_else(|| BridgeError::IncompleteRollup("no quality-check record".into()))?;
        let label = rollup
            .label
            .as_ref()
            .ok_or_else(|| BridgeError::IncompleteRollup("no label".into()))?;
        Ok(CommitReplicationPayload {
            operator_id: rollup.session.operator_id.clone(),
            package_id: package.id.clone(),
            supplier_signature: package.supplier_signature.clone(),
            qc_passed: qc.passed,
            issues: qc.issues.clone(),
            timestamp: timestamp.to_string(),
            label: label.id.clone(),
            destination: label.destination.clone(),
            priority: label.priority.clone(),
            courier_id: label.courier_id.clone(),
        })
    }

    /// POST the payload to the first configured L1 node and wait for block
    /// inclusion. No retry; failure semantics are the caller's contract.
    pub async fn replicate(
        &self,
        session_id: &str,
        payload: &CommitReplicationPayload,
    ) -> Result<L1Ref, BridgeError> {
        let endpoint = self.endpoints.first().ok_or(BridgeError::NoEndpoint)?;
        let url = format!(
            "{}/session/{}/commit-l1",
            endpoint.trim_end_matches('/'),
            session_id
        );
        info!(%url, session_id, "replicating session commit");

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| BridgeError::Unreachable(e.to_string()))?;
        let status = response.status().as_u16();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BridgeError::MalformedReply(e.to_string()))?;

        if !(200..300).contains(&status) {
            warn!(status, session_id, "commitment layer refused replication");
            return Err(BridgeError::Rejected {
                status,
                body: body.to_string(),
            });
        }

        let meta = &body["meta"];
        let block_height = meta["block_height"]
            .as_u64()
            .ok_or_else(|| BridgeError::MalformedReply("missing meta.block_height".into()))?;
        let tx_hash = meta["tx_id"]
            .as_str()
            .ok_or_else(|| BridgeError::MalformedReply("missing meta.tx_id".into()))?
            .to_string();
        Ok(L1Ref {
            block_height,
            tx_hash,
        })
    }
}
