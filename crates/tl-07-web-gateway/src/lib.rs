//! # Web Gateway (tl-07)
//!
//! The HTTP boundary of a node. Per mutating request: assign the ingress
//! request-id and timestamp, execute the handler locally, assemble the
//! envelope, broadcast it to the replica set, and hand the client its
//! response together with the durable block reference.
//!
//! ```text
//! client ──HTTP──▶ gateway ──local execute──▶ handler
//!                     │
//!                     ├──assemble envelope──▶ broadcast-tx-commit ──▶ engine
//!                     │                                                │
//!                     ◀──────────── block reference ◀──────────────────┘
//! ```
//!
//! Gateway-local routes (`/status/:txid`, `/block/:height`, `/debug`, `/`)
//! never enter consensus; everything else resolves through the service
//! registry and is broadcast, success or failure alike.

mod meta;
mod page;
mod pipeline;
mod server;

pub use pipeline::{GatewayNode, GatewayReply, Layer};
pub use server::{build_router, serve};
