//! In-memory adapter.
//!
//! Backs tests and single-process replica sets. Enforces the same entity and
//! state invariants as the relational adapter, with the same [`StoreError`]
//! variants, so replay behaves identically on either backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use shared_types::{
    ids, CatalogItem, CommitReplicationPayload, ItemRecord, LabelRecord, LedgerEntry,
    PackageRecord, PackageStatus, QcRecord, SessionRecord, SessionStatus, StoreError, StoreResult,
};

use crate::ports::{ReplicationOutcome, SessionRollup, SessionStore};
use crate::seed;

#[derive(Default)]
struct MemoryInner {
    operators: BTreeMap<String, shared_types::OperatorRecord>,
    suppliers: BTreeMap<String, shared_types::SupplierRecord>,
    couriers: BTreeMap<String, shared_types::CourierRecord>,
    catalog: Vec<CatalogItem>,
    sessions: BTreeMap<String, SessionRecord>,
    packages: BTreeMap<String, PackageRecord>,
    items: BTreeMap<String, Vec<ItemRecord>>,
    qc_records: BTreeMap<String, QcRecord>,
    labels: BTreeMap<String, LabelRecord>,
    ledger: Vec<LedgerEntry>,
    /// Material digest per replicated session (commitment layer only).
    commit_digests: BTreeMap<String, String>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    /// Empty store, no master data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the deterministic seed applied, as every replica starts.
    pub fn seeded() -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.write();
            for op in seed::operators() {
                inner.operators.insert(op.id.clone(), op);
            }
            for s in seed::suppliers() {
                inner.suppliers.insert(s.id.clone(), s);
            }
            for c in seed::couriers() {
                inner.couriers.insert(c.id.clone(), c);
            }
            inner.catalog = seed::catalog();
        }
        store
    }

    /// Overwrite the stored replication digest for a session. Audit/test
    /// support for exercising cross-layer conflict detection.
    pub fn overwrite_commit_digest(&self, session_id: &str, digest: &str) {
        self.inner
            .write()
            .commit_digests
            .insert(session_id.to_string(), digest.to_string());
    }
}

impl MemoryInner {
    fn session_mut(&mut self, id: &str) -> StoreResult<&mut SessionRecord> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))
    }

    fn package_mut(&mut self, id: &str) -> StoreResult<&mut PackageRecord> {
        self.packages
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("package {id}")))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn catalog(&self) -> StoreResult<Vec<CatalogItem>> {
        Ok(self.inner.read().catalog.clone())
    }

    async fn create_session(&self, session: &SessionRecord) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if !inner.operators.contains_key(&session.operator_id) {
            return Err(StoreError::ForeignKey(format!(
                "session.operator_id references missing operator {}",
                session.operator_id
            )));
        }
        if inner.sessions.contains_key(&session.id) {
            return Err(StoreError::Unique(format!("session {}", session.id)));
        }
        inner.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn create_package(
        &self,
        package: &PackageRecord,
        items: &[ItemRecord],
    ) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if let Some(supplier_id) = &package.supplier_id {
            if !inner.suppliers.contains_key(supplier_id) {
                return Err(StoreError::ForeignKey(format!(
                    "package.supplier_id references missing supplier {supplier_id}"
                )));
            }
        }
        if inner.packages.contains_key(&package.id) {
            return Err(StoreError::Unique(format!("package {}", package.id)));
        }
        inner.packages.insert(package.id.clone(), package.clone());
        inner.items.insert(package.id.clone(), items.to_vec());
        Ok(())
    }

    async fn begin_scan(&self, package_id: &str) -> StoreResult<PackageRecord> {
        let mut inner = self.inner.write();
        let package = inner.package_mut(package_id)?;
        match package.status {
            PackageStatus::Pending | PackageStatus::PendingValidation => {
                package.status = PackageStatus::PendingValidation;
                Ok(package.clone())
            }
            other => Err(StoreError::InvalidState(format!(
                "package {package_id} cannot be scanned in state {}",
                other.as_str()
            ))),
        }
    }

    async fn bind_package(
        &self,
        session_id: &str,
        package_id: &str,
        updated_at: &str,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write();

        let session = inner
            .sessions
            .get(session_id)
            .ok_or_else(|| StoreError::NotFound(format!("session {session_id}")))?;
        if session.status != SessionStatus::Active {
            return Err(StoreError::InvalidState(format!(
                "session {session_id} is {}",
                session.status.as_str()
            )));
        }
        if inner
            .packages
            .values()
            .any(|p| p.session_id.as_deref() == Some(session_id))
        {
            return Err(StoreError::Unique(format!(
                "session {session_id} already has a bound package"
            )));
        }

        let package = inner.package_mut(package_id)?;
        if package.status != PackageStatus::PendingValidation {
            return Err(StoreError::InvalidState(format!(
                "package {package_id} is {}, expected pending_validation",
                package.status.as_str()
            )));
        }
        if package.session_id.is_some() {
            return Err(StoreError::Unique(format!(
                "package {package_id} is already bound"
            )));
        }
        package.session_id = Some(session_id.to_string());
        package.is_trusted = true;
        package.status = PackageStatus::Validated;

        let session = inner.session_mut(session_id)?;
        session.updated_at = updated_at.to_string();
        Ok(())
    }

    async fn record_qc(&self, qc: &QcRecord, updated_at: &str) -> StoreResult<()> {
        let mut inner = self.inner.write();

        if inner.qc_records.contains_key(&qc.id) {
            return Err(StoreError::Unique(format!("qc_record {}", qc.id)));
        }
        {
            let package = inner.package_mut(&qc.package_id)?;
            if package.session_id.as_deref() != Some(qc.session_id.as_str()) {
                return Err(StoreError::InvalidState(format!(
                    "package {} is not bound to session {}",
                    qc.package_id, qc.session_id
                )));
            }
            if package.status != PackageStatus::Validated {
                return Err(StoreError::InvalidState(format!(
                    "package {} is {}, expected validated",
                    qc.package_id,
                    package.status.as_str()
                )));
            }
            package.status = if qc.passed {
                PackageStatus::QcPassed
            } else {
                PackageStatus::QcFailed
            };
        }
        if !qc.passed {
            let session = inner.session_mut(&qc.session_id)?;
            session.status = SessionStatus::QcFailed;
            session.updated_at = updated_at.to_string();
        } else {
            let session = inner.session_mut(&qc.session_id)?;
            session.updated_at = updated_at.to_string();
        }
        inner.qc_records.insert(qc.id.clone(), qc.clone());
        Ok(())
    }

    async fn attach_label(&self, label: &LabelRecord) -> StoreResult<()> {
        let mut inner = self.inner.write();

        if !inner.couriers.contains_key(&label.courier_id) {
            return Err(StoreError::ForeignKey(format!(
                "label.courier_id references missing courier {}",
                label.courier_id
            )));
        }
        if inner
            .labels
            .values()
            .any(|l| l.session_id == label.session_id)
        {
            return Err(StoreError::Unique(format!(
                "session {} already has a label",
                label.session_id
            )));
        }
        let package = inner
            .packages
            .get(&label.package_id)
            .ok_or_else(|| StoreError::NotFound(format!("package {}", label.package_id)))?;
        if package.session_id.as_deref() != Some(label.session_id.as_str()) {
            return Err(StoreError::InvalidState(format!(
                "package {} is not bound to session {}",
                label.package_id, label.session_id
            )));
        }
        if package.status != PackageStatus::QcPassed {
            return Err(StoreError::InvalidState(format!(
                "package {} is {}, expected qc_passed",
                label.package_id,
                package.status.as_str()
            )));
        }
        inner.labels.insert(label.id.clone(), label.clone());
        Ok(())
    }

    async fn commit_session(
        &self,
        session_id: &str,
        operator_id: &str,
        tx_hash: &str,
        block_height: u64,
        updated_at: &str,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write();

        let session = inner
            .sessions
            .get(session_id)
            .ok_or_else(|| StoreError::NotFound(format!("session {session_id}")))?;
        if session.is_committed {
            return Err(StoreError::InvalidState(format!(
                "Session {session_id} already committed"
            )));
        }
        if session.operator_id != operator_id {
            return Err(StoreError::InvalidState(format!(
                "Operator mismatch for session {session_id}"
            )));
        }
        let package = inner
            .packages
            .values()
            .find(|p| p.session_id.as_deref() == Some(session_id))
            .cloned();
        let Some(package) = package else {
            return Err(StoreError::InvalidState(format!(
                "Package not ready for commit: session {session_id} has no bound package"
            )));
        };
        if package.status != PackageStatus::QcPassed {
            return Err(StoreError::InvalidState(
                "Package not ready for commit".to_string(),
            ));
        }
        if !inner.labels.values().any(|l| l.session_id == session_id) {
            return Err(StoreError::InvalidState(format!(
                "Label missing for session {session_id}"
            )));
        }

        let session = inner.session_mut(session_id)?;
        session.status = SessionStatus::Committed;
        session.is_committed = true;
        session.tx_hash = Some(tx_hash.to_string());
        session.updated_at = updated_at.to_string();
        let package_id = package.id.clone();
        inner.package_mut(&package_id)?.status = PackageStatus::Committed;
        inner.ledger.push(LedgerEntry {
            session_id: session_id.to_string(),
            block_height,
            status: "committed".to_string(),
        });
        Ok(())
    }

    async fn replicate_committed(
        &self,
        session_id: &str,
        payload: &CommitReplicationPayload,
    ) -> StoreResult<ReplicationOutcome> {
        let digest = payload.material_digest(session_id);
        let mut inner = self.inner.write();

        if let Some(existing) = inner.commit_digests.get(session_id) {
            if *existing == digest {
                return Ok(ReplicationOutcome::AlreadyReplicated);
            }
            return Err(StoreError::Conflict(format!(
                "session {session_id} already replicated with different content"
            )));
        }
        if inner.sessions.contains_key(session_id) {
            // A session row without a replication digest cannot be compared.
            return Err(StoreError::Conflict(format!(
                "session {session_id} exists but was not materialized by replication"
            )));
        }

        inner.sessions.insert(
            session_id.to_string(),
            SessionRecord {
                id: session_id.to_string(),
                operator_id: payload.operator_id.clone(),
                status: SessionStatus::Committed,
                is_committed: true,
                tx_hash: None,
                created_at: payload.timestamp.clone(),
                updated_at: payload.timestamp.clone(),
            },
        );
        inner.packages.insert(
            payload.package_id.clone(),
            PackageRecord {
                id: payload.package_id.clone(),
                supplier_id: None,
                delivery_note_id: String::new(),
                supplier_signature: payload.supplier_signature.clone(),
                is_trusted: true,
                status: PackageStatus::Committed,
                session_id: Some(session_id.to_string()),
            },
        );
        let qc_id = ids::qc_id(&payload.package_id, session_id);
        inner.qc_records.insert(
            qc_id.clone(),
            QcRecord {
                id: qc_id,
                package_id: payload.package_id.clone(),
                session_id: session_id.to_string(),
                passed: payload.qc_passed,
                inspector_id: payload.operator_id.clone(),
                issues: payload.issues.clone(),
            },
        );
        inner.labels.insert(
            payload.label.clone(),
            LabelRecord {
                id: payload.label.clone(),
                package_id: payload.package_id.clone(),
                session_id: session_id.to_string(),
                destination: payload.destination.clone(),
                courier_id: payload.courier_id.clone(),
                priority: payload.priority.clone(),
            },
        );
        inner
            .commit_digests
            .insert(session_id.to_string(), digest);
        Ok(ReplicationOutcome::Replicated)
    }

    async fn session(&self, id: &str) -> StoreResult<SessionRecord> {
        self.inner
            .read()
            .sessions
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))
    }

    async fn package(&self, id: &str) -> StoreResult<PackageRecord> {
        self.inner
            .read()
            .packages
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("package {id}")))
    }

    async fn package_items(&self, package_id: &str) -> StoreResult<Vec<ItemRecord>> {
        Ok(self
            .inner
            .read()
            .items
            .get(package_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn package_for_session(&self, session_id: &str) -> StoreResult<Option<PackageRecord>> {
        Ok(self
            .inner
            .read()
            .packages
            .values()
            .find(|p| p.session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn session_rollup(&self, session_id: &str) -> StoreResult<SessionRollup> {
        let inner = self.inner.read();
        let session = inner
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("session {session_id}")))?;
        let package = inner
            .packages
            .values()
            .find(|p| p.session_id.as_deref() == Some(session_id))
            .cloned();
        let qc = inner
            .qc_records
            .values()
            .filter(|q| q.session_id == session_id)
            .cloned()
            .collect();
        let label = inner
            .labels
            .values()
            .find(|l| l.session_id == session_id)
            .cloned();
        Ok(SessionRollup {
            session,
            package,
            qc,
            label,
        })
    }

    async fn ledger_entries(&self, session_id: &str) -> StoreResult<Vec<LedgerEntry>> {
        Ok(self
            .inner
            .read()
            .ledger
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect())
    }
}
