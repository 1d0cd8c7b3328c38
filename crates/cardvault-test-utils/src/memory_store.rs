// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory `VaultStore` with a switch that makes it unreachable.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use cardvault_core::{
    AccountRecord, InsertAccount, InsertKey, KeyRecord, NewAccount, VaultError, VaultStore,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    keys: Vec<KeyRecord>,
    accounts: Vec<AccountRecord>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// A store that keeps records in insertion order in memory.
///
/// Mirrors the SQLite store's uniqueness and recipient-existence rules.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails with `StoreUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), VaultError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(VaultError::store("memory store is offline"));
        }
        Ok(())
    }
}

const CREATED_AT: &str = "2026-01-01 00:00:00";

#[async_trait]
impl VaultStore for MemoryStore {
    async fn list_keys(&self) -> Result<Vec<KeyRecord>, VaultError> {
        self.check()?;
        Ok(self.tables.lock().await.keys.clone())
    }

    async fn find_key(&self, recipient: &str) -> Result<Option<KeyRecord>, VaultError> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables.keys.iter().find(|k| k.recipient == recipient).cloned())
    }

    async fn insert_key(&self, recipient: &str, public_key: &[u8]) -> Result<InsertKey, VaultError> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        if tables.keys.iter().any(|k| k.recipient == recipient) {
            return Ok(InsertKey::DuplicateRecipient);
        }
        let record = KeyRecord {
            id: tables.next_id(),
            recipient: recipient.to_string(),
            public_key: public_key.to_vec(),
            created_at: CREATED_AT.to_string(),
        };
        tables.keys.push(record.clone());
        Ok(InsertKey::Created(record))
    }

    async fn list_accounts(&self) -> Result<Vec<AccountRecord>, VaultError> {
        self.check()?;
        Ok(self.tables.lock().await.accounts.clone())
    }

    async fn find_account(&self, name: &str) -> Result<Option<AccountRecord>, VaultError> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables.accounts.iter().find(|a| a.name == name).cloned())
    }

    async fn insert_account(&self, account: NewAccount) -> Result<InsertAccount, VaultError> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        if !tables.keys.iter().any(|k| k.recipient == account.recipient) {
            return Ok(InsertAccount::UnknownRecipient);
        }
        if tables.accounts.iter().any(|a| a.name == account.name) {
            return Ok(InsertAccount::DuplicateName);
        }
        let record = AccountRecord {
            id: tables.next_id(),
            name: account.name,
            username: account.username,
            ciphertext: account.ciphertext,
            recipient: account.recipient,
            created_at: CREATED_AT.to_string(),
        };
        tables.accounts.push(record.clone());
        Ok(InsertAccount::Created(record))
    }

    async fn delete_account(&self, name: &str) -> Result<usize, VaultError> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        let before = tables.accounts.len();
        tables.accounts.retain(|a| a.name != name);
        Ok(before - tables.accounts.len())
    }

    async fn close(&self) -> Result<(), VaultError> {
        Ok(())
    }
}
