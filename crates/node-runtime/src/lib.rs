//! Node construction shared by the binary and the test suite.

pub mod config;
pub mod wiring;

pub use config::{LayerArg, NodeOptions};
pub use wiring::build_gateway;
