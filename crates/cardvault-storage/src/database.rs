// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use cardvault_core::VaultError;
use tracing::debug;

use crate::migrations;

/// Handle to the vault database. This is the single writer.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, VaultError> {
        Self::open_with(path, true).await
    }

    /// Open (or create) the database, choosing the journal mode.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, VaultError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    VaultError::store(format!(
                        "cannot create database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        // Schema setup runs on a plain blocking connection before the async
        // writer thread takes over.
        let setup_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), VaultError> {
            let mut conn = rusqlite::Connection::open(&setup_path).map_err(VaultError::store)?;
            if wal_mode {
                let mode: String = conn
                    .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
                    .map_err(VaultError::store)?;
                debug!(journal_mode = %mode, "journal mode set");
            }
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| VaultError::Internal(format!("database setup task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(map_tr_err)?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path = %path, "database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying connection for query modules.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Round-trip a trivial statement to prove the writer thread is alive.
    pub async fn ping(&self) -> Result<(), VaultError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), VaultError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                let _: (i64, i64, i64) = conn.query_row(
                    "PRAGMA wal_checkpoint(TRUNCATE)",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    /// Checkpoint and drop the connection.
    pub async fn close(self) -> Result<(), VaultError> {
        self.checkpoint().await
    }
}

/// Convert tokio-rusqlite errors to `VaultError::StoreUnavailable`.
pub(crate) fn map_tr_err(e: impl std::fmt::Display) -> VaultError {
    VaultError::store(format!("database error: {e}"))
}

/// True for a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// A CHECK violation means the caller passed a value the schema forbids
/// (an empty name, key, or ciphertext); that is bad input, not an outage.
pub(crate) fn check_violation(err: &rusqlite::Error) -> Option<VaultError> {
    match err {
        rusqlite::Error::SqliteFailure(e, msg)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_CHECK =>
        {
            Some(VaultError::InvalidInput(format!(
                "value rejected by the database: {}",
                msg.as_deref().unwrap_or("CHECK constraint failed")
            )))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_parent_directories() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested/dir/vault.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        assert!(db_path.exists());
        db.ping().await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn migrations_create_both_tables() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("schema.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table'
                     AND name IN ('public_keys', 'accounts') ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();
        assert_eq!(tables, vec!["accounts".to_string(), "public_keys".to_string()]);
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");
        let path = db_path.to_str().unwrap();

        Database::open(path).await.unwrap().close().await.unwrap();
        let db = Database::open(path).await.unwrap();
        db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn rollback_journal_mode_is_supported() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nowal.db");
        let db = Database::open_with(db_path.to_str().unwrap(), false)
            .await
            .unwrap();
        db.ping().await.unwrap();
    }
}
