// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence collaborator trait for key and account records.

use async_trait::async_trait;

use crate::error::VaultError;
use crate::types::{AccountRecord, KeyRecord, NewAccount};

/// Outcome of inserting a key record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertKey {
    Created(KeyRecord),
    DuplicateRecipient,
}

/// Outcome of inserting an account record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertAccount {
    Created(AccountRecord),
    /// No key existed for the recipient when the insert ran.
    UnknownRecipient,
    DuplicateName,
}

/// Relational store for the two record classes.
///
/// Inserts are atomic: the uniqueness and recipient-existence checks run in
/// the same statement or transaction as the write, so concurrent writers
/// cannot produce duplicates or dangling references. Any failure to reach
/// the backend surfaces as [`VaultError::StoreUnavailable`].
#[async_trait]
pub trait VaultStore: Send + Sync + 'static {
    /// All keys in insertion order.
    async fn list_keys(&self) -> Result<Vec<KeyRecord>, VaultError>;

    async fn find_key(&self, recipient: &str) -> Result<Option<KeyRecord>, VaultError>;

    async fn insert_key(&self, recipient: &str, public_key: &[u8]) -> Result<InsertKey, VaultError>;

    /// All accounts in insertion order.
    async fn list_accounts(&self) -> Result<Vec<AccountRecord>, VaultError>;

    async fn find_account(&self, name: &str) -> Result<Option<AccountRecord>, VaultError>;

    async fn insert_account(&self, account: NewAccount) -> Result<InsertAccount, VaultError>;

    /// Delete accounts with this name, returning how many rows went away.
    async fn delete_account(&self, name: &str) -> Result<usize, VaultError>;

    /// Flush and release the backend.
    async fn close(&self) -> Result<(), VaultError>;
}
