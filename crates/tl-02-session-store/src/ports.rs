//! # Inbound Port: Session Store API
//!
//! Each operation is atomic inside the adapter: it either applies fully or
//! returns a [`StoreError`] with the working set untouched. Handlers never
//! compose multi-operation transactions across this boundary; operations
//! that must be atomic together (the commit gate, the QC status flip) are
//! single port methods.
//!
//! Timestamps are always passed in from the envelope: the store never reads
//! a clock, so replaying replicas write identical rows.

use async_trait::async_trait;

use shared_types::{
    CatalogItem, CommitReplicationPayload, ItemRecord, LabelRecord, LedgerEntry, PackageRecord,
    QcRecord, SessionRecord, StoreResult,
};

/// Everything the commit gate needs in one read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRollup {
    pub session: SessionRecord,
    pub package: Option<PackageRecord>,
    pub qc: Vec<QcRecord>,
    pub label: Option<LabelRecord>,
}

/// Result of an idempotent commitment-layer replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationOutcome {
    /// First materialization of this session on this replica.
    Replicated,
    /// Row already present with identical material content.
    AlreadyReplicated,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    // === Master data ===

    async fn catalog(&self) -> StoreResult<Vec<CatalogItem>>;

    // === Workflow writes ===

    /// Insert a new active session. Fails `ForeignKey` when the operator is
    /// unknown, `Unique` when the id already exists.
    async fn create_session(&self, session: &SessionRecord) -> StoreResult<()>;

    /// Insert a package plus its expected content lines.
    async fn create_package(
        &self,
        package: &PackageRecord,
        items: &[ItemRecord],
    ) -> StoreResult<()>;

    /// Scan step: move the package to `pending_validation`. Idempotent for a
    /// package already in `pending_validation`; any later state is
    /// `InvalidState`. Returns the updated row.
    async fn begin_scan(&self, package_id: &str) -> StoreResult<PackageRecord>;

    /// Validation step: bind the package to the session, mark it trusted and
    /// `validated`. Requires the package in `pending_validation`, an active
    /// session, and neither side already bound.
    async fn bind_package(
        &self,
        session_id: &str,
        package_id: &str,
        updated_at: &str,
    ) -> StoreResult<()>;

    /// Quality-check step: insert the record and flip the package to
    /// `qc_passed`/`qc_failed` in the same operation. A failing check also
    /// moves the session to its terminal `qc_failed` state.
    async fn record_qc(&self, qc: &QcRecord, updated_at: &str) -> StoreResult<()>;

    /// Labeling step: requires the bound package in `qc_passed` and no
    /// existing label for the session.
    async fn attach_label(&self, label: &LabelRecord) -> StoreResult<()>;

    /// The commit gate, re-checked atomically: session not committed,
    /// operator matches, package bound and `qc_passed`, label present.
    /// Writes the terminal session state and the audit ledger row.
    async fn commit_session(
        &self,
        session_id: &str,
        operator_id: &str,
        tx_hash: &str,
        block_height: u64,
        updated_at: &str,
    ) -> StoreResult<()>;

    /// Commitment-layer materialization of a finished session, idempotent by
    /// session id. Identical material content → `AlreadyReplicated`;
    /// divergent content → `StoreError::Conflict`.
    async fn replicate_committed(
        &self,
        session_id: &str,
        payload: &CommitReplicationPayload,
    ) -> StoreResult<ReplicationOutcome>;

    // === Reads ===

    async fn session(&self, id: &str) -> StoreResult<SessionRecord>;

    async fn package(&self, id: &str) -> StoreResult<PackageRecord>;

    async fn package_items(&self, package_id: &str) -> StoreResult<Vec<ItemRecord>>;

    async fn package_for_session(&self, session_id: &str) -> StoreResult<Option<PackageRecord>>;

    async fn session_rollup(&self, session_id: &str) -> StoreResult<SessionRollup>;

    async fn ledger_entries(&self, session_id: &str) -> StoreResult<Vec<LedgerEntry>>;
}
