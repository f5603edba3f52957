//! Key construction for the log namespace.

pub const LAST_BLOCK_HEIGHT: &[u8] = b"last_block_height";
pub const LAST_BLOCK_APP_HASH: &[u8] = b"last_block_app_hash";
pub const TX_PREFIX: &str = "tx:";
pub const STATUS_PREFIX: &str = "status:";

/// Status value for every finalized transaction.
pub const STATUS_ACCEPTED: &str = "accepted";

pub fn tx_key(tx_id: &str) -> Vec<u8> {
    format!("{TX_PREFIX}{tx_id}").into_bytes()
}

pub fn status_key(tx_id: &str) -> Vec<u8> {
    format!("{STATUS_PREFIX}{tx_id}").into_bytes()
}
