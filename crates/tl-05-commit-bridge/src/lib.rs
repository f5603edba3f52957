//! # Commit Bridge (tl-05)
//!
//! Promotes a finished interactivity-layer session into an atomic
//! commitment-layer transaction: synthesizes the canonical replication
//! payload from the session rollup, POSTs it to a configured L1 node, and
//! extracts the durable block reference from the reply.
//!
//! The bridge never retries: a lost reply leaves the L2 session un-committed
//! and the client free to retry, which is idempotent at L1 by session id.

mod bridge;

pub use bridge::{BridgeError, CommitBridge, L1Ref};
