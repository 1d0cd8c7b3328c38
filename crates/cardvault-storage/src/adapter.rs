// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the `VaultStore` trait.

use async_trait::async_trait;
use tracing::debug;

use cardvault_config::model::StorageConfig;
use cardvault_core::{
    AccountRecord, InsertAccount, InsertKey, KeyRecord, NewAccount, VaultError, VaultStore,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed vault store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
#[derive(Debug)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the database named by `config`, running migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, VaultError> {
        let db = Database::open_with(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite store opened");
        Ok(Self { db })
    }

    /// Wrap an already-open database.
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    /// Returns the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Probe the connection; used by diagnostics.
    pub async fn health_check(&self) -> Result<(), VaultError> {
        self.db.ping().await
    }
}

#[async_trait]
impl VaultStore for SqliteStore {
    async fn list_keys(&self) -> Result<Vec<KeyRecord>, VaultError> {
        queries::keys::list_keys(&self.db).await
    }

    async fn find_key(&self, recipient: &str) -> Result<Option<KeyRecord>, VaultError> {
        queries::keys::get_key(&self.db, recipient).await
    }

    async fn insert_key(&self, recipient: &str, public_key: &[u8]) -> Result<InsertKey, VaultError> {
        queries::keys::insert_key(&self.db, recipient, public_key).await
    }

    async fn list_accounts(&self) -> Result<Vec<AccountRecord>, VaultError> {
        queries::accounts::list_accounts(&self.db).await
    }

    async fn find_account(&self, name: &str) -> Result<Option<AccountRecord>, VaultError> {
        queries::accounts::get_account(&self.db, name).await
    }

    async fn insert_account(&self, account: NewAccount) -> Result<InsertAccount, VaultError> {
        queries::accounts::insert_account(&self.db, account).await
    }

    async fn delete_account(&self, name: &str) -> Result<usize, VaultError> {
        queries::accounts::delete_account(&self.db, name).await
    }

    async fn close(&self) -> Result<(), VaultError> {
        self.db.checkpoint().await
    }
}
