//! # Replicated Executor (tl-04)
//!
//! Hosts the service handlers behind the consensus engine's callback
//! interface and implements Byzantine-proposer detection by replay.
//!
//! ## Proposal round at one replica
//!
//! ```text
//! RECEIVED ──parse ok──▶ REPLAY ──all equal──▶ ACCEPT ──finalize──▶ LOGGED ──commit──▶ DURABLE
//!                │                 │
//!                └─parse fail──▶ REJECT
//!                                  │
//!                        handler missing / response mismatch
//! ```
//!
//! Rejecting at proposal time is exactly where the engine needs the signal:
//! a rejected proposal fails the round and costs the Byzantine proposer its
//! turn; persistent offenders are excluded by the engine over time.

pub mod engine;
mod executor;

pub use executor::ReplicatedExecutor;
