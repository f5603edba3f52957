//! # Workflow Entities
//!
//! The session working set: one in-progress workflow [`SessionRecord`]
//! aggregates at most one [`PackageRecord`] and its per-step state up to
//! commit. Relations are stable string ids and nullable back-reference
//! fields, never bidirectional object graphs.
//!
//! ## Clusters
//!
//! - **Workflow**: `SessionRecord`, `PackageRecord`, `ItemRecord`
//! - **Quality & Dispatch**: `QcRecord`, `LabelRecord`
//! - **Master data**: `OperatorRecord`, `SupplierRecord`, `CourierRecord`,
//!   `CatalogItem`
//! - **Audit**: `LedgerEntry`

use serde::{Deserialize, Serialize};

/// Lifecycle of a session row. Step-level progression between `active` and
/// `committed` lives on the bound package's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    /// Terminal: the bound package failed quality control.
    QcFailed,
    /// Terminal: durably recorded on the commitment layer.
    Committed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::QcFailed => "qc_failed",
            SessionStatus::Committed => "committed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SessionStatus::Active),
            "qc_failed" => Some(SessionStatus::QcFailed),
            "committed" => Some(SessionStatus::Committed),
            _ => None,
        }
    }
}

/// Package workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    Pending,
    PendingValidation,
    Validated,
    QcPassed,
    QcFailed,
    Committed,
}

impl PackageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageStatus::Pending => "pending",
            PackageStatus::PendingValidation => "pending_validation",
            PackageStatus::Validated => "validated",
            PackageStatus::QcPassed => "qc_passed",
            PackageStatus::QcFailed => "qc_failed",
            PackageStatus::Committed => "committed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PackageStatus::Pending),
            "pending_validation" => Some(PackageStatus::PendingValidation),
            "validated" => Some(PackageStatus::Validated),
            "qc_passed" => Some(PackageStatus::QcPassed),
            "qc_failed" => Some(PackageStatus::QcFailed),
            "committed" => Some(PackageStatus::Committed),
            _ => None,
        }
    }
}

/// One interactive workflow instance on the interactivity layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// `SESSION-<request_id>`.
    pub id: String,
    pub operator_id: String,
    pub status: SessionStatus,
    pub is_committed: bool,
    /// Commitment-layer transaction hash, set at commit.
    pub tx_hash: Option<String>,
    /// RFC3339, from the ingress timestamp of the creating request.
    pub created_at: String,
    pub updated_at: String,
}

/// A physical package moving through the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub id: String,
    /// Absent on commitment-layer rows materialized from a replication
    /// payload, which carries the supplier signature but not the supplier.
    pub supplier_id: Option<String>,
    pub delivery_note_id: String,
    pub supplier_signature: String,
    pub is_trusted: bool,
    pub status: PackageStatus,
    /// Nullable back-reference; set when a session binds the package.
    pub session_id: Option<String>,
}

/// One expected content line of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: String,
    pub package_id: String,
    pub name: String,
    pub quantity: u32,
}

/// Outcome of a quality check on a bound package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcRecord {
    /// `QC-<SHA256(package ‖ session)[..16]>`.
    pub id: String,
    pub package_id: String,
    pub session_id: String,
    pub passed: bool,
    pub inspector_id: String,
    /// Free-form issue notes; persisted as a JSON-encoded string list.
    pub issues: Vec<String>,
}

/// Dispatch label attached after a passing quality check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRecord {
    /// `LBL-<SHA256(courier ‖ package ‖ session)[..16]>`.
    pub id: String,
    pub package_id: String,
    pub session_id: String,
    pub destination: String,
    pub courier_id: String,
    pub priority: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourierRecord {
    pub id: String,
    pub name: String,
}

/// Catalog entry used to populate the expected contents of new packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub default_quantity: u32,
}

/// Audit row written into the session store when a session commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub session_id: String,
    pub block_height: u64,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for s in [
            SessionStatus::Active,
            SessionStatus::QcFailed,
            SessionStatus::Committed,
        ] {
            assert_eq!(SessionStatus::parse(s.as_str()), Some(s));
        }
        for p in [
            PackageStatus::Pending,
            PackageStatus::PendingValidation,
            PackageStatus::Validated,
            PackageStatus::QcPassed,
            PackageStatus::QcFailed,
            PackageStatus::Committed,
        ] {
            assert_eq!(PackageStatus::parse(p.as_str()), Some(p));
        }
        assert_eq!(PackageStatus::parse("unknown"), None);
    }
}
