//! Append-only log of external search attempts.

use crate::error::StorageResult;
use crate::types::SearchAuditRecord;
use crate::{SharedConnection, lock};
use duckdb::{Connection, params};
use std::sync::MutexGuard;

const AUDIT_COLUMNS: &str = "id, auditor_id, keyword_hash, total_matches, returned_count, \
     truncated, execution_time_ms, signature_verification_ms, success, key_version, created_at";

/// Search audit log backed by DuckDB. Rows are only ever inserted.
#[derive(Clone)]
pub struct AuditStore {
    conn: SharedConnection,
}

impl AuditStore {
    /// Opens an in-memory audit store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::open_with_conn(crate::open_shared_in_memory()?)
    }

    /// Opens on an existing shared connection.
    pub fn open_with_conn(conn: SharedConnection) -> StorageResult<Self> {
        initialize_audit_schema(&*lock(&conn)?)?;
        Ok(Self { conn })
    }

    fn lock_conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        lock(&self.conn)
    }

    pub fn append(&self, record: &SearchAuditRecord) -> StorageResult<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO search_audit_log ({AUDIT_COLUMNS}) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            params![
                record.id,
                record.auditor_id,
                record.keyword_hash,
                record.total_matches as i64,
                record.returned_count as i64,
                record.truncated,
                record.execution_time_ms,
                record.signature_verification_ms,
                record.success,
                record.key_version as i64,
                record.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> StorageResult<Option<SearchAuditRecord>> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            &format!("SELECT {AUDIT_COLUMNS} FROM search_audit_log WHERE id = ?"),
            params![id],
            row_to_audit_record,
        );
        match result {
            Ok(record) => Ok(Some(record)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Most recent attempts by one auditor, newest first.
    pub fn recent_for_auditor(
        &self,
        auditor_id: &str,
        limit: usize,
    ) -> StorageResult<Vec<SearchAuditRecord>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {AUDIT_COLUMNS} FROM search_audit_log WHERE auditor_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT {limit}"
        ))?;
        let records = stmt
            .query_map(params![auditor_id], row_to_audit_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Attempts (successful or not) by one auditor at or after `since_ms`.
    pub fn count_for_auditor_since(&self, auditor_id: &str, since_ms: i64) -> StorageResult<u64> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM search_audit_log WHERE auditor_id = ? AND created_at >= ?",
            params![auditor_id, since_ms],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Attempts with the given outcome at or after `since_ms`, across all auditors.
    pub fn count_since(&self, since_ms: i64, success: bool) -> StorageResult<u64> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM search_audit_log WHERE created_at >= ? AND success = ?",
            params![since_ms, success],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Mean end-to-end latency of successful searches, `None` when there are none.
    pub fn average_success_latency_ms(&self) -> StorageResult<Option<f64>> {
        let conn = self.lock_conn()?;
        let avg: Option<f64> = conn.query_row(
            "SELECT AVG(execution_time_ms) FROM search_audit_log WHERE success = TRUE",
            [],
            |row| row.get(0),
        )?;
        Ok(avg)
    }

    /// Total number of audit rows.
    pub fn count_all(&self) -> StorageResult<u64> {
        let conn = self.lock_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM search_audit_log", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn row_to_audit_record(row: &duckdb::Row<'_>) -> duckdb::Result<SearchAuditRecord> {
    let total_matches: i64 = row.get(3)?;
    let returned_count: i64 = row.get(4)?;
    let key_version: i64 = row.get(9)?;
    Ok(SearchAuditRecord {
        id: row.get(0)?,
        auditor_id: row.get(1)?,
        keyword_hash: row.get(2)?,
        total_matches: total_matches as u64,
        returned_count: returned_count as u64,
        truncated: row.get(5)?,
        execution_time_ms: row.get(6)?,
        signature_verification_ms: row.get(7)?,
        success: row.get(8)?,
        key_version: key_version as u32,
        created_at: row.get(10)?,
    })
}

fn initialize_audit_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS search_audit_log (
            id VARCHAR PRIMARY KEY,
            auditor_id VARCHAR NOT NULL,
            keyword_hash VARCHAR NOT NULL,
            total_matches BIGINT NOT NULL,
            returned_count BIGINT NOT NULL,
            truncated BOOLEAN NOT NULL,
            execution_time_ms DOUBLE NOT NULL,
            signature_verification_ms DOUBLE NOT NULL,
            success BOOLEAN NOT NULL,
            key_version BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_audit_auditor_time
            ON search_audit_log(auditor_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_audit_time ON search_audit_log(created_at);
        "#,
    )?;
    Ok(())
}
