//! # Shared Types Crate
//!
//! This crate contains the envelope types, workflow entities, deterministic
//! id derivation, canonical JSON encoding, and the consensus-engine contract
//! shared by every subsystem of the node.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Canonical Bytes**: The canonical serialization of a [`Transaction`]
//!   is the consensus transaction; replicas compare bytes, never structures.
//! - **Deterministic Ids**: Every id a replica computes during replay is a
//!   pure function of envelope inputs, so all replicas agree on it.

pub mod canonical;
pub mod commit;
pub mod consensus;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod ids;

pub use commit::CommitReplicationPayload;
pub use entities::*;
pub use envelope::{Request, Response, Transaction};
pub use errors::*;
