// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account store: named accounts bound to one recipient and one ciphertext.
//!
//! There is no update path. Names are unique, so delete-by-name removes at
//! most one record.

use std::sync::Arc;

use cardvault_core::{AccountRecord, InsertAccount, NewAccount, VaultError, VaultStore};
use tracing::info;

#[derive(Clone)]
pub struct AccountStore {
    store: Arc<dyn VaultStore>,
}

impl AccountStore {
    pub fn new(store: Arc<dyn VaultStore>) -> Self {
        Self { store }
    }

    /// Persist an account whose secret is already encrypted.
    ///
    /// The recipient must have a registered key when the insert runs; the
    /// check happens inside the store's insert, not before it.
    pub async fn create(
        &self,
        name: &str,
        username: &str,
        ciphertext: Vec<u8>,
        recipient: &str,
    ) -> Result<AccountRecord, VaultError> {
        require_non_blank("name", name)?;
        require_non_blank("username", username)?;
        require_non_blank("recipient", recipient)?;
        if ciphertext.is_empty() {
            return Err(VaultError::InvalidInput(
                "ciphertext must not be empty".to_string(),
            ));
        }

        let account = NewAccount {
            name: name.to_string(),
            username: username.to_string(),
            ciphertext,
            recipient: recipient.to_string(),
        };
        match self.store.insert_account(account).await? {
            InsertAccount::Created(record) => {
                info!(name = %name, recipient = %recipient, "account created");
                Ok(record)
            }
            InsertAccount::UnknownRecipient => Err(VaultError::UnknownRecipient {
                recipient: recipient.to_string(),
            }),
            InsertAccount::DuplicateName => Err(VaultError::DuplicateAccount {
                name: name.to_string(),
            }),
        }
    }

    /// All accounts in insertion order, unfiltered.
    pub async fn list(&self) -> Result<Vec<AccountRecord>, VaultError> {
        self.store.list_accounts().await
    }

    pub async fn find(&self, name: &str) -> Result<AccountRecord, VaultError> {
        self.store
            .find_account(name)
            .await?
            .ok_or_else(|| VaultError::account_not_found(name))
    }

    pub async fn exists(&self, name: &str) -> Result<bool, VaultError> {
        Ok(self.store.find_account(name).await?.is_some())
    }

    pub async fn delete_by_name(&self, name: &str) -> Result<(), VaultError> {
        match self.store.delete_account(name).await? {
            0 => Err(VaultError::account_not_found(name)),
            _ => {
                info!(name = %name, "account deleted");
                Ok(())
            }
        }
    }
}

pub(crate) fn require_non_blank(field: &str, value: &str) -> Result<(), VaultError> {
    if value.trim().is_empty() {
        return Err(VaultError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}
