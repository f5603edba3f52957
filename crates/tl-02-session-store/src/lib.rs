//! # Session Store (tl-02)
//!
//! Relational working set for in-progress sessions, packages, quality-check
//! records, and labels. Every replica owns its own store instance with the
//! same schema and the same seed; replicas write independently during
//! replay, and determinism of the seed plus serialized execution keeps the
//! working sets equivalent.
//!
//! The store is NOT the source of truth. The transaction log (anchored by
//! the engine's block hash) is; the store is what handlers read and write to
//! compute responses.
//!
//! ## Entity/state invariants
//!
//! | ID | Invariant |
//! |----|-----------|
//! | 1 | Exactly one package may be bound to a session (1:0..1) |
//! | 2 | Commit requires bound package in `qc_passed`, a label, and a matching operator |
//! | 3 | A committed session is immutable |
//! | 4 | Package status walks `pending → pending_validation → validated → qc_passed/qc_failed → committed` |
//! | 5 | Replication is idempotent by session id; divergent content is a conflict |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `ports` - the [`SessionStore`] port every adapter implements
//! - `adapters` - `MemoryStore` (tests, single-process clusters) and
//!   `PostgresStore` (production, behind the `postgres` feature)
//! - `seed` - deterministic master data shared by all adapters
//! - `schema` - SQL migration statements

pub mod adapters;
pub mod ports;
#[cfg(feature = "postgres")]
pub mod schema;
pub mod seed;

pub use adapters::memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use adapters::postgres::PostgresStore;
pub use ports::{ReplicationOutcome, SessionRollup, SessionStore};
