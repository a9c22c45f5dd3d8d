//! Encrypted record store and blind index.
//!
//! Records hold only nonce + ciphertext. Index rows map opaque tokens to
//! record ids; a token value may point at many records.

use crate::error::{StorageError, StorageResult};
use crate::types::{EncryptedRecord, IndexEntry};
use crate::{SharedConnection, in_transaction, lock};
use duckdb::{Connection, params};
use securematch_crypto::{EncryptedDocument, NONCE_SIZE};
use std::sync::MutexGuard;

/// Encrypted record + blind index store backed by DuckDB.
#[derive(Clone)]
pub struct DocumentStore {
    conn: SharedConnection,
}

impl DocumentStore {
    /// Opens an in-memory document store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::open_with_conn(crate::open_shared_in_memory()?)
    }

    /// Opens on an existing shared connection.
    pub fn open_with_conn(conn: SharedConnection) -> StorageResult<Self> {
        initialize_document_schema(&*lock(&conn)?)?;
        Ok(Self { conn })
    }

    fn lock_conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        lock(&self.conn)
    }

    /// Inserts a record and all of its index entries as one atomic unit.
    ///
    /// Every entry must reference `record.id`. Readers never observe the
    /// record without its entries or entries without their record.
    pub fn insert_document(
        &self,
        record: &EncryptedRecord,
        entries: &[IndexEntry],
    ) -> StorageResult<()> {
        if let Some(stray) = entries.iter().find(|e| e.record_id != record.id) {
            return Err(StorageError::Integrity(format!(
                "index entry {} references record {}, expected {}",
                stray.id, stray.record_id, record.id
            )));
        }

        let conn = self.lock_conn()?;
        in_transaction(&conn, |conn| {
            conn.execute(
                "INSERT INTO documents (id, nonce, ciphertext, created_at) VALUES (?, ?, ?, ?)",
                params![
                    record.id,
                    record.document.nonce.to_vec(),
                    record.document.ciphertext,
                    record.created_at,
                ],
            )?;

            let mut stmt = conn.prepare(
                "INSERT INTO index_entries (id, record_id, token, external_token) \
                 VALUES (?, ?, ?, ?)",
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.id,
                    entry.record_id,
                    entry.token,
                    entry.external_token.as_deref(),
                ])?;
            }
            Ok(())
        })
    }

    /// Get a single record by ID.
    pub fn get_document(&self, id: &str) -> StorageResult<Option<EncryptedRecord>> {
        let conn = self.lock_conn()?;
        fetch_document(&conn, id)
    }

    /// Fetches records in the order of `ids`. Ids with no record are skipped.
    pub fn get_documents(&self, ids: &[String]) -> StorageResult<Vec<EncryptedRecord>> {
        let conn = self.lock_conn()?;
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = fetch_document(&conn, id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Distinct record ids whose index holds `token`, ordered by record id.
    pub fn record_ids_for_token(&self, token: &str) -> StorageResult<Vec<String>> {
        self.record_ids_where("token", token)
    }

    /// Distinct record ids whose index holds `external_token`, ordered by record id.
    pub fn record_ids_for_external_token(
        &self,
        external_token: &str,
    ) -> StorageResult<Vec<String>> {
        self.record_ids_where("external_token", external_token)
    }

    fn record_ids_where(&self, column: &'static str, value: &str) -> StorageResult<Vec<String>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT record_id FROM index_entries WHERE {column} = ? ORDER BY record_id"
        ))?;
        let ids = stmt
            .query_map(params![value], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Index entries belonging to one record.
    pub fn index_entries_for(&self, record_id: &str) -> StorageResult<Vec<IndexEntry>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, record_id, token, external_token FROM index_entries \
             WHERE record_id = ? ORDER BY id",
        )?;
        let entries = stmt
            .query_map(params![record_id], |row| {
                Ok(IndexEntry {
                    id: row.get(0)?,
                    record_id: row.get(1)?,
                    token: row.get(2)?,
                    external_token: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Deletes a record together with its index entries.
    ///
    /// Returns `false` when no record had this id.
    pub fn delete_document(&self, id: &str) -> StorageResult<bool> {
        let conn = self.lock_conn()?;
        in_transaction(&conn, |conn| {
            conn.execute("DELETE FROM index_entries WHERE record_id = ?", params![id])?;
            let affected = conn.execute("DELETE FROM documents WHERE id = ?", params![id])?;
            Ok(affected > 0)
        })
    }

    /// Number of stored records.
    pub fn count_documents(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM documents")
    }

    /// Number of index rows.
    pub fn count_index_entries(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM index_entries")
    }

    /// Number of index rows carrying an external token.
    pub fn count_external_tokens(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM index_entries WHERE external_token IS NOT NULL")
    }

    /// Creation time of the newest record, if any.
    pub fn last_ingest_at(&self) -> StorageResult<Option<i64>> {
        let conn = self.lock_conn()?;
        let latest: Option<i64> =
            conn.query_row("SELECT MAX(created_at) FROM documents", [], |row| row.get(0))?;
        Ok(latest)
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn fetch_document(conn: &Connection, id: &str) -> StorageResult<Option<EncryptedRecord>> {
    let result = conn.query_row(
        "SELECT id, nonce, ciphertext, created_at FROM documents WHERE id = ?",
        params![id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, Vec<u8>>(2)?,
                row.get::<_, i64>(3)?,
            ))
        },
    );

    match result {
        Ok((id, nonce_bytes, ciphertext, created_at)) => {
            let nonce: [u8; NONCE_SIZE] = nonce_bytes.as_slice().try_into().map_err(|_| {
                StorageError::Corrupt(format!(
                    "record {id}: nonce is {} bytes, expected {NONCE_SIZE}",
                    nonce_bytes.len()
                ))
            })?;
            Ok(Some(EncryptedRecord {
                id,
                document: EncryptedDocument { nonce, ciphertext },
                created_at,
            }))
        }
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn initialize_document_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id VARCHAR PRIMARY KEY,
            nonce BLOB NOT NULL,
            ciphertext BLOB NOT NULL,
            created_at BIGINT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS index_entries (
            id VARCHAR PRIMARY KEY,
            record_id VARCHAR NOT NULL,
            token VARCHAR NOT NULL,
            external_token VARCHAR
        );
        CREATE INDEX IF NOT EXISTS idx_index_entries_token ON index_entries(token);
        CREATE INDEX IF NOT EXISTS idx_index_entries_external ON index_entries(external_token);
        CREATE INDEX IF NOT EXISTS idx_index_entries_record ON index_entries(record_id);
        "#,
    )?;
    Ok(())
}
