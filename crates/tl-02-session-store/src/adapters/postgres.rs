//! PostgreSQL adapter.
//!
//! One connection pool per node. Writes arrive serialized through the
//! consensus callbacks, so no application-level locking is layered on top;
//! each port operation runs in its own database transaction and row locks
//! cover the read-check-write windows.

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::info;

use shared_types::{
    ids, CatalogItem, CommitReplicationPayload, ItemRecord, LabelRecord, LedgerEntry,
    PackageRecord, PackageStatus, QcRecord, SessionRecord, SessionStatus, StoreError, StoreResult,
};

use crate::ports::{ReplicationOutcome, SessionRollup, SessionStore};
use crate::schema;
use crate::seed;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Apply the schema, then the deterministic seed. Both are idempotent.
    pub async fn migrate_and_seed(&self) -> StoreResult<()> {
        for statement in schema::STATEMENTS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        for op in seed::operators() {
            sqlx::query("INSERT INTO operator (id, name) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(&op.id)
                .bind(&op.name)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        for s in seed::suppliers() {
            sqlx::query("INSERT INTO supplier (id, name) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(&s.id)
                .bind(&s.name)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        for c in seed::couriers() {
            sqlx::query("INSERT INTO courier (id, name) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(&c.id)
                .bind(&c.name)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        for item in seed::catalog() {
            sqlx::query(
                "INSERT INTO item_catalog (id, name, default_quantity) VALUES ($1, $2, $3)
                 ON CONFLICT DO NOTHING",
            )
            .bind(&item.id)
            .bind(&item.name)
            .bind(item.default_quantity as i32)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        info!("session store migrated and seeded");
        Ok(())
    }
}

/// SQLSTATE → StoreError. 23503 is a foreign-key violation, 23505 a unique
/// violation; everything else surfaces as a backend failure.
fn map_db_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some("23503") => return StoreError::ForeignKey(db.message().to_string()),
            Some("23505") => return StoreError::Unique(db.message().to_string()),
            _ => {}
        }
    }
    StoreError::Backend(err.to_string())
}

fn session_from_row(row: &PgRow) -> StoreResult<SessionRecord> {
    let status: String = row.try_get("status").map_err(map_db_err)?;
    Ok(SessionRecord {
        id: row.try_get("id").map_err(map_db_err)?,
        operator_id: row.try_get("operator_id").map_err(map_db_err)?,
        status: SessionStatus::parse(&status)
            .ok_or_else(|| StoreError::Backend(format!("bad session status {status}")))?,
        is_committed: row.try_get("is_committed").map_err(map_db_err)?,
        tx_hash: row.try_get("tx_hash").map_err(map_db_err)?,
        created_at: row.try_get("created_at").map_err(map_db_err)?,
        updated_at: row.try_get("updated_at").map_err(map_db_err)?,
    })
}

fn package_from_row(row: &PgRow) -> StoreResult<PackageRecord> {
    let status: String = row.try_get("status").map_err(map_db_err)?;
    Ok(PackageRecord {
        id: row.try_get("id").map_err(map_db_err)?,
        supplier_id: row.try_get("supplier_id").map_err(map_db_err)?,
        delivery_note_id: row.try_get("delivery_note_id").map_err(map_db_err)?,
        supplier_signature: row.try_get("supplier_signature").map_err(map_db_err)?,
        is_trusted: row.try_get("is_trusted").map_err(map_db_err)?,
        status: PackageStatus::parse(&status)
            .ok_or_else(|| StoreError::Backend(format!("bad package status {status}")))?,
        session_id: row.try_get("session_id").map_err(map_db_err)?,
    })
}

fn qc_from_row(row: &PgRow) -> StoreResult<QcRecord> {
    let issues_json: String = row.try_get("issues").map_err(map_db_err)?;
    Ok(QcRecord {
        id: row.try_get("id").map_err(map_db_err)?,
        package_id: row.try_get("package_id").map_err(map_db_err)?,
        session_id: row.try_get("session_id").map_err(map_db_err)?,
        passed: row.try_get("passed").map_err(map_db_err)?,
        inspector_id: row.try_get("inspector_id").map_err(map_db_err)?,
        issues: serde_json::from_str(&issues_json)
            .map_err(|e| StoreError::Backend(format!("bad issues encoding: {e}")))?,
    })
}

fn label_from_row(row: &PgRow) -> StoreResult<LabelRecord> {
    Ok(LabelRecord {
        id: row.try_get("id").map_err(map_db_err)?,
        package_id: row.try_get("package_id").map_err(map_db_err)?,
        session_id: row.try_get("session_id").map_err(map_db_err)?,
        destination: row.try_get("destination").map_err(map_db_err)?,
        courier_id: row.try_get("courier_id").map_err(map_db_err)?,
        priority: row.try_get("priority").map_err(map_db_err)?,
    })
}

#[async_trait]
impl SessionStore for PostgresStore {
    async fn catalog(&self) -> StoreResult<Vec<CatalogItem>> {
        let rows = sqlx::query("SELECT id, name, default_quantity FROM item_catalog ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;
        rows.iter()
            .map(|row| {
                Ok(CatalogItem {
                    id: row.try_get("id").map_err(map_db_err)?,
                    name: row.try_get("name").map_err(map_db_err)?,
                    default_quantity: row
                        .try_get::<i32, _>("default_quantity")
                        .map_err(map_db_err)? as u32,
                })
            })
            .collect()
    }

    async fn create_session(&self, session: &SessionRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO session (id, operator_id, status, is_committed, tx_hash, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&session.id)
        .bind(&session.operator_id)
        .bind(session.status.as_str())
        .bind(session.is_committed)
        .bind(&session.tx_hash)
        .bind(&session.created_at)
        .bind(&session.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn create_package(
        &self,
        package: &PackageRecord,
        items: &[ItemRecord],
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;
        sqlx::query(
            "INSERT INTO package (id, supplier_id, delivery_note_id, supplier_signature, is_trusted, status, session_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&package.id)
        .bind(&package.supplier_id)
        .bind(&package.delivery_note_id)
        .bind(&package.supplier_signature)
        .bind(package.is_trusted)
        .bind(package.status.as_str())
        .bind(&package.session_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;
        for item in items {
            sqlx::query("INSERT INTO item (id, package_id, name, quantity) VALUES ($1, $2, $3, $4)")
                .bind(&item.id)
                .bind(&item.package_id)
                .bind(&item.name)
                .bind(item.quantity as i32)
                .execute(&mut *tx)
                .await
                .map_err(map_db_err)?;
        }
        tx.commit().await.map_err(map_db_err)?;
        Ok(())
    }

    async fn begin_scan(&self, package_id: &str) -> StoreResult<PackageRecord> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;
        let row = sqlx::query("SELECT * FROM package WHERE id = $1 FOR UPDATE")
            .bind(package_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("package {package_id}")))?;
        let mut package = package_from_row(&row)?;
        match package.status {
            PackageStatus::Pending | PackageStatus::PendingValidation => {}
            other => {
                return Err(StoreError::InvalidState(format!(
                    "package {package_id} cannot be scanned in state {}",
                    other.as_str()
                )))
            }
        }
        sqlx::query("UPDATE package SET status = $1 WHERE id = $2")
            .bind(PackageStatus::PendingValidation.as_str())
            .bind(package_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        tx.commit().await.map_err(map_db_err)?;
        package.status = PackageStatus::PendingValidation;
        Ok(package)
    }

    async fn bind_package(
        &self,
        session_id: &str,
        package_id: &str,
        updated_at: &str,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let session_row = sqlx::query("SELECT * FROM session WHERE id = $1 FOR UPDATE")
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("session {session_id}")))?;
        let session = session_from_row(&session_row)?;
        if session.status != SessionStatus::Active {
            return Err(StoreError::InvalidState(format!(
                "session {session_id} is {}",
                session.status.as_str()
            )));
        }

        let package_row = sqlx::query("SELECT * FROM package WHERE id = $1 FOR UPDATE")
            .bind(package_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("package {package_id}")))?;
        let package = package_from_row(&package_row)?;
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

        // The UNIQUE constraint on package.session_id enforces 1:0..1.
        sqlx::query(
            "UPDATE package SET session_id = $1, is_trusted = TRUE, status = $2 WHERE id = $3",
        )
        .bind(session_id)
        .bind(PackageStatus::Validated.as_str())
        .bind(package_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;
        sqlx::query("UPDATE session SET updated_at = $1 WHERE id = $2")
            .bind(updated_at)
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        tx.commit().await.map_err(map_db_err)?;
        Ok(())
    }

    async fn record_qc(&self, qc: &QcRecord, updated_at: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let package_row = sqlx::query("SELECT * FROM package WHERE id = $1 FOR UPDATE")
            .bind(&qc.package_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("package {}", qc.package_id)))?;
        let package = package_from_row(&package_row)?;
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

        let issues = serde_json::to_string(&qc.issues)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query(
            "INSERT INTO qc_record (id, package_id, session_id, passed, inspector_id, issues)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&qc.id)
        .bind(&qc.package_id)
        .bind(&qc.session_id)
        .bind(qc.passed)
        .bind(&qc.inspector_id)
        .bind(&issues)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let package_status = if qc.passed {
            PackageStatus::QcPassed
        } else {
            PackageStatus::QcFailed
        };
        sqlx::query("UPDATE package SET status = $1 WHERE id = $2")
            .bind(package_status.as_str())
            .bind(&qc.package_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        if qc.passed {
            sqlx::query("UPDATE session SET updated_at = $1 WHERE id = $2")
                .bind(updated_at)
                .bind(&qc.session_id)
                .execute(&mut *tx)
                .await
                .map_err(map_db_err)?;
        } else {
            sqlx::query("UPDATE session SET status = $1, updated_at = $2 WHERE id = $3")
                .bind(SessionStatus::QcFailed.as_str())
                .bind(updated_at)
                .bind(&qc.session_id)
                .execute(&mut *tx)
                .await
                .map_err(map_db_err)?;
        }
        tx.commit().await.map_err(map_db_err)?;
        Ok(())
    }

    async fn attach_label(&self, label: &LabelRecord) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let package_row = sqlx::query("SELECT * FROM package WHERE id = $1 FOR UPDATE")
            .bind(&label.package_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("package {}", label.package_id)))?;
        let package = package_from_row(&package_row)?;
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

        // The UNIQUE constraint on label.session_id rejects a second label.
        sqlx::query(
            "INSERT INTO label (id, package_id, session_id, destination, courier_id, priority)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&label.id)
        .bind(&label.package_id)
        .bind(&label.session_id)
        .bind(&label.destination)
        .bind(&label.courier_id)
        .bind(&label.priority)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;
        tx.commit().await.map_err(map_db_err)?;
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
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let session_row = sqlx::query("SELECT * FROM session WHERE id = $1 FOR UPDATE")
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("session {session_id}")))?;
        let session = session_from_row(&session_row)?;
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

        let package_row = sqlx::query("SELECT * FROM package WHERE session_id = $1 FOR UPDATE")
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_err)?;
        let package = match package_row {
            Some(row) => package_from_row(&row)?,
            None => {
                return Err(StoreError::InvalidState(format!(
                    "Package not ready for commit: session {session_id} has no bound package"
                )))
            }
        };
        if package.status != PackageStatus::QcPassed {
            return Err(StoreError::InvalidState(
                "Package not ready for commit".to_string(),
            ));
        }

        let label_exists = sqlx::query("SELECT id FROM label WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_err)?
            .is_some();
        if !label_exists {
            return Err(StoreError::InvalidState(format!(
                "Label missing for session {session_id}"
            )));
        }

        sqlx::query(
            "UPDATE session SET status = $1, is_committed = TRUE, tx_hash = $2, updated_at = $3
             WHERE id = $4",
        )
        .bind(SessionStatus::Committed.as_str())
        .bind(tx_hash)
        .bind(updated_at)
        .bind(session_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;
        sqlx::query("UPDATE package SET status = $1 WHERE id = $2")
            .bind(PackageStatus::Committed.as_str())
            .bind(&package.id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        sqlx::query(
            "INSERT INTO \"transaction\" (session_id, block_height, status) VALUES ($1, $2, $3)",
        )
        .bind(session_id)
        .bind(block_height as i64)
        .bind("committed")
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;
        tx.commit().await.map_err(map_db_err)?;
        Ok(())
    }

    async fn replicate_committed(
        &self,
        session_id: &str,
        payload: &CommitReplicationPayload,
    ) -> StoreResult<ReplicationOutcome> {
        let digest = payload.material_digest(session_id);
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let existing = sqlx::query("SELECT commit_digest FROM session WHERE id = $1 FOR UPDATE")
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_err)?;
        if let Some(row) = existing {
            let stored: Option<String> = row.try_get("commit_digest").map_err(map_db_err)?;
            return match stored {
                Some(stored) if stored == digest => Ok(ReplicationOutcome::AlreadyReplicated),
                _ => Err(StoreError::Conflict(format!(
                    "session {session_id} already replicated with different content"
                ))),
            };
        }

        sqlx::query(
            "INSERT INTO session (id, operator_id, status, is_committed, tx_hash, commit_digest, created_at, updated_at)
             VALUES ($1, $2, $3, TRUE, NULL, $4, $5, $5)",
        )
        .bind(session_id)
        .bind(&payload.operator_id)
        .bind(SessionStatus::Committed.as_str())
        .bind(&digest)
        .bind(&payload.timestamp)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;
        sqlx::query(
            "INSERT INTO package (id, supplier_id, delivery_note_id, supplier_signature, is_trusted, status, session_id)
             VALUES ($1, NULL, '', $2, TRUE, $3, $4)",
        )
        .bind(&payload.package_id)
        .bind(&payload.supplier_signature)
        .bind(PackageStatus::Committed.as_str())
        .bind(session_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;
        let issues = serde_json::to_string(&payload.issues)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query(
            "INSERT INTO qc_record (id, package_id, session_id, passed, inspector_id, issues)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(ids::qc_id(&payload.package_id, session_id))
        .bind(&payload.package_id)
        .bind(session_id)
        .bind(payload.qc_passed)
        .bind(&payload.operator_id)
        .bind(&issues)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;
        sqlx::query(
            "INSERT INTO label (id, package_id, session_id, destination, courier_id, priority)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&payload.label)
        .bind(&payload.package_id)
        .bind(session_id)
        .bind(&payload.destination)
        .bind(&payload.courier_id)
        .bind(&payload.priority)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;
        tx.commit().await.map_err(map_db_err)?;
        Ok(ReplicationOutcome::Replicated)
    }

    async fn session(&self, id: &str) -> StoreResult<SessionRecord> {
        let row = sqlx::query("SELECT * FROM session WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))?;
        session_from_row(&row)
    }

    async fn package(&self, id: &str) -> StoreResult<PackageRecord> {
        let row = sqlx::query("SELECT * FROM package WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("package {id}")))?;
        package_from_row(&row)
    }

    async fn package_items(&self, package_id: &str) -> StoreResult<Vec<ItemRecord>> {
        let rows = sqlx::query("SELECT * FROM item WHERE package_id = $1 ORDER BY id")
            .bind(package_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;
        rows.iter()
            .map(|row| {
                Ok(ItemRecord {
                    id: row.try_get("id").map_err(map_db_err)?,
                    package_id: row.try_get("package_id").map_err(map_db_err)?,
                    name: row.try_get("name").map_err(map_db_err)?,
                    quantity: row.try_get::<i32, _>("quantity").map_err(map_db_err)? as u32,
                })
            })
            .collect()
    }

    async fn package_for_session(&self, session_id: &str) -> StoreResult<Option<PackageRecord>> {
        let row = sqlx::query("SELECT * FROM package WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        row.as_ref().map(package_from_row).transpose()
    }

    async fn session_rollup(&self, session_id: &str) -> StoreResult<SessionRollup> {
        let session = self.session(session_id).await?;
        let package = self.package_for_session(session_id).await?;
        let qc_rows = sqlx::query("SELECT * FROM qc_record WHERE session_id = $1 ORDER BY id")
            .bind(session_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;
        let qc = qc_rows
            .iter()
            .map(qc_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        let label_row = sqlx::query("SELECT * FROM label WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        let label = label_row.as_ref().map(label_from_row).transpose()?;
        Ok(SessionRollup {
            session,
            package,
            qc,
            label,
        })
    }

    async fn ledger_entries(&self, session_id: &str) -> StoreResult<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            "SELECT session_id, block_height, status FROM \"transaction\"
             WHERE session_id = $1 ORDER BY id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.iter()
            .map(|row| {
                Ok(LedgerEntry {
                    session_id: row.try_get("session_id").map_err(map_db_err)?,
                    block_height: row.try_get::<i64, _>("block_height").map_err(map_db_err)?
                        as u64,
                    status: row.try_get("status").map_err(map_db_err)?,
                })
            })
            .collect()
    }
}
