//! Command-line configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LayerArg {
    /// Commitment layer (durable session record, larger replica set).
    L1,
    /// Interactivity layer (per-step answers, small replica set).
    L2,
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "node-runtime",
    about = "Tandem-Ledger node: a two-layer BFT supply-chain web service"
)]
pub struct NodeOptions {
    /// Consensus-engine home directory (genesis, peer configuration).
    #[arg(long, default_value = "./tandem-home")]
    pub home: PathBuf,

    /// HTTP port for the gateway.
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Session-store connection string, or `memory` for the in-memory
    /// working set.
    #[arg(long, default_value = "memory")]
    pub store: String,

    /// Which consensus layer this node serves.
    #[arg(long, value_enum, default_value = "l2")]
    pub layer: LayerArg,

    /// Stable node identity; part of every transaction this node originates.
    #[arg(long, default_value = "node-0")]
    pub node_id: String,

    /// Commitment-layer node address (repeatable; interactivity layer only).
    #[arg(long = "l1-endpoint")]
    pub l1_endpoints: Vec<String>,

    /// Intentionally emit corrupted responses. Exists to exercise the
    /// replay detector; never enable outside a test bench.
    #[arg(long)]
    pub byzantine: bool,

    /// External consensus-engine RPC address. Absent means the embedded
    /// single-replica engine.
    #[arg(long)]
    pub engine_rpc: Option<String>,

    /// Transaction-log directory. Absent means an in-memory log.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let opts = NodeOptions::parse_from(["node-runtime"]);
        assert_eq!(opts.port, 8080);
        assert_eq!(opts.store, "memory");
        assert_eq!(opts.layer, LayerArg::L2);
        assert!(!opts.byzantine);
        assert!(opts.l1_endpoints.is_empty());
    }

    #[test]
    fn l1_node_flags_parse() {
        let opts = NodeOptions::parse_from([
            "node-runtime",
            "--layer",
            "l1",
            "--port",
            "9181",
            "--node-id",
            "l1-node-2",
            "--byzantine",
        ]);
        assert_eq!(opts.layer, LayerArg::L1);
        assert_eq!(opts.port, 9181);
        assert_eq!(opts.node_id, "l1-node-2");
        assert!(opts.byzantine);
    }

    #[test]
    fn repeatable_l1_endpoints() {
        let opts = NodeOptions::parse_from([
            "node-runtime",
            "--l1-endpoint",
            "http://l1-a:9181",
            "--l1-endpoint",
            "http://l1-b:9181",
        ]);
        assert_eq!(opts.l1_endpoints.len(), 2);
    }
}
