//! # Tandem-Ledger Test Suite
//!
//! Cross-subsystem scenarios wired from in-memory replicas:
//!
//! ```text
//! [L2 gateway] ──dispatch──▶ [L2 engine + replicas]
//!       │ commit
//!       ▼ HTTP (real axum + reqwest)
//! [L1 gateway] ──dispatch──▶ [L1 engine + 4 replicas]
//! ```
//!
//! The interactivity layer is driven through the gateway pipeline directly;
//! the commitment layer is reached over real HTTP so the bridge, the axum
//! transport, and the replication handler are exercised end to end.

pub mod fixtures;

#[cfg(test)]
mod integration {
    mod audit;
    mod byzantine;
    mod commit_gate;
    mod conflict;
    mod fatal_halt;
    mod two_layer_flow;
}
