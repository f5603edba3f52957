//! # Transaction Log (tl-03)
//!
//! Per-node append-only key-value log of accepted transactions. The log is
//! the node's durable record of what the replica set agreed on; the session
//! store is only the working set derived from it.
//!
//! ## Key namespace
//!
//! | Key | Value |
//! |---|---|
//! | `tx:<txid>` | raw envelope bytes, identical to the block's |
//! | `status:<txid>` | `"accepted"`, written exactly once |
//! | `last_block_height` | decimal height of the last flushed block |
//! | `last_block_app_hash` | hex application hash of that block |
//!
//! ## Write discipline
//!
//! Writes are staged during block finalization and flushed in one atomic
//! batch at commit. The finalize path is the single writer; lookups are
//! concurrent. No key is ever deleted or rewritten.

pub mod adapters;
pub mod keys;
pub mod ports;
pub mod service;

pub use adapters::memory::MemoryKvStore;
#[cfg(feature = "rocksdb")]
pub use adapters::rocks::RocksDbStore;
pub use ports::{BatchOperation, KeyValueStore, KvStoreError};
pub use service::{TxLog, TxLogError};
