//! # Error Types
//!
//! Cross-subsystem error enums. Per-crate errors that never cross a crate
//! boundary live with their crate; everything here is part of a contract
//! between subsystems.

use thiserror::Error;

/// Envelope encode/decode failures.
#[derive(Debug, Clone, Error)]
pub enum EnvelopeError {
    #[error("Envelope encode failed: {0}")]
    Encode(String),

    #[error("Envelope decode failed: {0}")]
    Decode(String),
}

/// Session-store failures.
///
/// The variant → HTTP status mapping is part of the replicated contract:
/// every replica must encode the same store failure into the same response.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Referenced entity does not exist (foreign-key class).
    #[error("Foreign key violation: {0}")]
    ForeignKey(String),

    /// Duplicate key (unique-constraint class).
    #[error("Unique violation: {0}")]
    Unique(String),

    /// Entity not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity exists but is not in a state that permits the operation.
    #[error("{0}")]
    InvalidState(String),

    /// Cross-layer replication conflict: same session id, different content.
    #[error("Cross-layer conflict: {0}")]
    Conflict(String),

    /// Backend failure (connection, serialization, unexpected shape).
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Fixed, deterministic status mapping.
    pub fn http_status(&self) -> u16 {
        match self {
            StoreError::ForeignKey(_) => 400,
            StoreError::Unique(_) => 409,
            StoreError::NotFound(_) => 404,
            StoreError::InvalidState(_) => 409,
            StoreError::Conflict(_) => 409,
            StoreError::Backend(_) => 500,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Consensus-engine failures as seen by the application side.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine did not confirm within the deadline. Local state may still
    /// commit on a later round.
    #[error("Consensus timeout")]
    Timeout,

    /// The proposal carrying this transaction was rejected by the replica set.
    #[error("Proposal rejected by replica set")]
    ProposalRejected,

    /// Engine RPC transport or decode failure.
    #[error("Engine RPC error: {0}")]
    Rpc(String),

    /// Requested block does not exist.
    #[error("Unknown block height {0}")]
    UnknownBlock(u64),

    /// Invariant-preserving halt: the node must stop rather than diverge.
    #[error("Fatal application error: {0}")]
    Fatal(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_is_fixed() {
        assert_eq!(StoreError::ForeignKey("x".into()).http_status(), 400);
        assert_eq!(StoreError::Unique("x".into()).http_status(), 409);
        assert_eq!(StoreError::NotFound("x".into()).http_status(), 404);
        assert_eq!(StoreError::InvalidState("x".into()).http_status(), 409);
        assert_eq!(StoreError::Conflict("x".into()).http_status(), 409);
        assert_eq!(StoreError::Backend("x".into()).http_status(), 500);
    }
}
