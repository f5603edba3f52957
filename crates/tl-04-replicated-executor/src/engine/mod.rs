//! Engine adapters for the [`shared_types::consensus::ConsensusClient`]
//! surface.
//!
//! - [`local::LocalConsensusEngine`] drives in-process replicas: the test
//!   harness and the degenerate single-node deployment.
//! - [`rpc::RpcConsensusEngine`] speaks the standard engine RPC endpoints of
//!   an external consensus engine.

pub mod local;
pub mod rpc;

pub use local::LocalConsensusEngine;
pub use rpc::RpcConsensusEngine;
