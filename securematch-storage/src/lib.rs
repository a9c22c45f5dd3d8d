//! DuckDB storage layer for SecureMatch.
//!
//! Persists everything the searchable-encryption core needs, and nothing in
//! plaintext:
//!
//! - `documents`: AES-GCM nonce + ciphertext per record
//! - `index_entries`: blind-index rows (internal HMAC token, optional external
//!   keyword hash) pointing at exactly one record
//! - `auditors`: public key + monotonic key version per auditor
//! - `search_audit_log`: append-only record of every external search attempt
//!
//! # Architecture
//!
//! Stores open only on a [`SharedConnection`], so one database file has one
//! DuckDB instance. An in-memory database is visible to every store and
//! multi-table writes can run inside one transaction. Record ingest (record +
//! its index rows) and record deletion are transactional; auditor key rotation
//! is a conditional update on the expected key version.

mod audit_store;
mod auditor_store;
mod document_store;
mod error;
mod types;

pub use audit_store::AuditStore;
pub use auditor_store::AuditorStore;
pub use document_store::DocumentStore;
pub use error::{StorageError, StorageResult};
pub use types::{AuditorRecord, EncryptedRecord, IndexEntry, SearchAuditRecord};

use duckdb::Connection;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

/// A DuckDB connection shared between stores.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Open a DuckDB connection with stale WAL recovery and resource limits.
///
/// If the initial open fails and a `.wal` file exists alongside the database,
/// it is removed and the open is retried once. This handles the common case
/// where an unclean shutdown leaves a WAL file that prevents reopening.
///
/// `memory_limit` and `threads` cap per-database resource usage (DuckDB defaults
/// to ~80% of system RAM and all cores).
pub fn open_duckdb_with_wal_recovery(
    path: &std::path::Path,
    memory_limit: &str,
    threads: u32,
) -> StorageResult<Connection> {
    let conn = match Connection::open(path) {
        Ok(c) => c,
        Err(first_err) => {
            let wal_path = path.with_extension(
                path.extension()
                    .map(|ext| format!("{}.wal", ext.to_string_lossy()))
                    .unwrap_or_else(|| "wal".to_string()),
            );
            if wal_path.exists() {
                warn!(
                    "DuckDB open failed, removing stale WAL and retrying: {}",
                    wal_path.display()
                );
                if std::fs::remove_file(&wal_path).is_ok() {
                    let c = Connection::open(path)?;
                    apply_resource_limits(&c, memory_limit, threads)?;
                    return Ok(c);
                }
            }
            return Err(first_err.into());
        }
    };
    apply_resource_limits(&conn, memory_limit, threads)?;
    Ok(conn)
}

/// Opens a file-backed connection wrapped for sharing between stores.
pub fn open_shared(
    path: &std::path::Path,
    memory_limit: &str,
    threads: u32,
) -> StorageResult<SharedConnection> {
    let conn = open_duckdb_with_wal_recovery(path, memory_limit, threads)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Opens an in-memory connection wrapped for sharing between stores.
pub fn open_shared_in_memory() -> StorageResult<SharedConnection> {
    Ok(Arc::new(Mutex::new(Connection::open_in_memory()?)))
}

/// Apply memory and thread limits to a DuckDB connection.
fn apply_resource_limits(conn: &Connection, memory_limit: &str, threads: u32) -> StorageResult<()> {
    conn.execute_batch(&format!(
        "PRAGMA memory_limit='{}'; PRAGMA threads={};",
        memory_limit.replace('\'', ""),
        threads
    ))?;
    Ok(())
}

pub(crate) fn lock(conn: &SharedConnection) -> StorageResult<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|_| StorageError::LockPoisoned)
}

/// Runs `f` inside a transaction, committing on success and rolling back on error.
pub(crate) fn in_transaction<T>(
    conn: &Connection,
    f: impl FnOnce(&Connection) -> StorageResult<T>,
) -> StorageResult<T> {
    conn.execute_batch("BEGIN TRANSACTION")?;
    match f(conn) {
        Ok(value) => {
            conn.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}
