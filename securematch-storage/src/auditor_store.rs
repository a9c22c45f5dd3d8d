//! Auditor table: one active public key and its version per auditor.

use crate::error::{StorageError, StorageResult};
use crate::types::AuditorRecord;
use crate::{SharedConnection, lock};
use duckdb::{Connection, params};
use std::sync::MutexGuard;

const AUDITOR_COLUMNS: &str = "id, name, public_key, key_version, created_at, rotated_at";

/// Auditor registry persistence.
#[derive(Clone)]
pub struct AuditorStore {
    conn: SharedConnection,
}

impl AuditorStore {
    /// Opens an in-memory auditor store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::open_with_conn(crate::open_shared_in_memory()?)
    }

    /// Opens on an existing shared connection.
    pub fn open_with_conn(conn: SharedConnection) -> StorageResult<Self> {
        initialize_auditor_schema(&*lock(&conn)?)?;
        Ok(Self { conn })
    }

    fn lock_conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        lock(&self.conn)
    }

    pub fn insert(&self, auditor: &AuditorRecord) -> StorageResult<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            &format!("INSERT INTO auditors ({AUDITOR_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"),
            params![
                auditor.id,
                auditor.name,
                auditor.public_key,
                auditor.key_version as i64,
                auditor.created_at,
                auditor.rotated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> StorageResult<Option<AuditorRecord>> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            &format!("SELECT {AUDITOR_COLUMNS} FROM auditors WHERE id = ?"),
            params![id],
            row_to_auditor,
        );
        match result {
            Ok(auditor) => Ok(Some(auditor)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All auditors, oldest first.
    pub fn list(&self) -> StorageResult<Vec<AuditorRecord>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {AUDITOR_COLUMNS} FROM auditors ORDER BY created_at, id"
        ))?;
        let auditors = stmt
            .query_map([], row_to_auditor)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(auditors)
    }

    /// Replaces the public key if the stored version still equals
    /// `expected_version`, bumping the version by one.
    ///
    /// Returns the new version. Fails with [`StorageError::VersionConflict`]
    /// when another rotation committed first, and [`StorageError::NotFound`]
    /// when the auditor does not exist.
    pub fn rotate_public_key(
        &self,
        id: &str,
        expected_version: u32,
        new_public_key: &str,
        rotated_at: i64,
    ) -> StorageResult<u32> {
        let conn = self.lock_conn()?;
        let affected = conn.execute(
            "UPDATE auditors SET public_key = ?, key_version = key_version + 1, rotated_at = ? \
             WHERE id = ? AND key_version = ?",
            params![new_public_key, rotated_at, id, expected_version as i64],
        )?;

        if affected == 0 {
            let exists: i64 = conn.query_row(
                "SELECT COUNT(*) FROM auditors WHERE id = ?",
                params![id],
                |row| row.get(0),
            )?;
            return Err(if exists > 0 {
                StorageError::VersionConflict {
                    auditor_id: id.to_string(),
                    expected: expected_version,
                }
            } else {
                StorageError::NotFound(format!("auditor {id}"))
            });
        }

        Ok(expected_version + 1)
    }

    /// Deletes an auditor row. Audit log rows referencing it are untouched.
    ///
    /// Returns `false` when no auditor had this id.
    pub fn delete(&self, id: &str) -> StorageResult<bool> {
        let conn = self.lock_conn()?;
        let affected = conn.execute("DELETE FROM auditors WHERE id = ?", params![id])?;
        Ok(affected > 0)
    }
}

fn row_to_auditor(row: &duckdb::Row<'_>) -> duckdb::Result<AuditorRecord> {
    let key_version: i64 = row.get(3)?;
    Ok(AuditorRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        public_key: row.get(2)?,
        key_version: key_version as u32,
        created_at: row.get(4)?,
        rotated_at: row.get(5)?,
    })
}

fn initialize_auditor_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS auditors (
            id VARCHAR PRIMARY KEY,
            name VARCHAR NOT NULL,
            public_key VARCHAR NOT NULL,
            key_version BIGINT NOT NULL DEFAULT 1,
            created_at BIGINT NOT NULL,
            rotated_at BIGINT
        );
        "#,
    )?;
    Ok(())
}
