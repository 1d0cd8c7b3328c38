// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The vault facade: the one entry point front ends talk to.
//!
//! Composes the key registry, the account store, the encryption provider and
//! the staging area, and enforces the invariants that span them: an account
//! is only persisted after its secret was encrypted under a registered key,
//! and plaintext only ever leaves through a scoped [`RevealedSecret`].

use std::sync::Arc;

use cardvault_config::CardvaultConfig;
use cardvault_config::model::StorageConfig;
use cardvault_core::{AccountRecord, EncryptionProvider, KeyRecord, VaultError, VaultStore};
use cardvault_storage::SqliteStore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::accounts::{AccountStore, require_non_blank};
use crate::registry::KeyRegistry;
use crate::session::{RetrievalSession, RevealedSecret};
use crate::staging::{StagingArea, StagingRegistry};

/// An open vault. Holds the store handle; there is no global state.
pub struct Vault {
    store: Arc<dyn VaultStore>,
    keys: KeyRegistry,
    accounts: AccountStore,
    provider: Arc<dyn EncryptionProvider>,
    staging: StagingArea,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("provider", &self.provider.name())
            .field("staging", &self.staging)
            .finish_non_exhaustive()
    }
}

impl Vault {
    /// Open the SQLite store named by `config` and assemble a vault around it.
    pub async fn connect(
        config: &CardvaultConfig,
        provider: Arc<dyn EncryptionProvider>,
    ) -> Result<Self, VaultError> {
        let store = SqliteStore::open(&config.storage).await?;
        let staging = StagingArea::from_config(&config.staging);
        Self::from_parts(Arc::new(store), provider, staging)
    }

    /// Assemble a vault from explicit collaborators.
    ///
    /// Creates the staging directory if needed, then purges leftovers from
    /// a previous unclean exit.
    pub fn from_parts(
        store: Arc<dyn VaultStore>,
        provider: Arc<dyn EncryptionProvider>,
        staging: StagingArea,
    ) -> Result<Self, VaultError> {
        staging.ensure_dir()?;
        let purged = staging.purge_stale()?;
        if purged > 0 {
            warn!(count = purged, dir = %staging.dir().display(), "purged stale staging artifacts");
        }
        info!(provider = provider.name(), "vault opened");
        Ok(Self {
            keys: KeyRegistry::new(store.clone()),
            accounts: AccountStore::new(store.clone()),
            store,
            provider,
            staging,
        })
    }

    /// Register a recipient's public key.
    pub async fn add_key(&self, recipient: &str, public_key: &[u8]) -> Result<KeyRecord, VaultError> {
        self.keys.register(recipient, public_key).await
    }

    /// Encrypt `secret` for `recipient` and store it as a new account.
    ///
    /// Nothing is persisted unless encryption succeeds.
    pub async fn add_account(
        &self,
        name: &str,
        username: &str,
        secret: &[u8],
        recipient: &str,
    ) -> Result<AccountRecord, VaultError> {
        require_non_blank("name", name)?;
        require_non_blank("username", username)?;
        require_non_blank("recipient", recipient)?;
        if secret.is_empty() {
            return Err(VaultError::InvalidInput("secret must not be empty".to_string()));
        }

        // Fail fast before asking the provider to do any work. The store
        // re-checks both conditions atomically on insert.
        if self.accounts.exists(name).await? {
            return Err(VaultError::DuplicateAccount {
                name: name.to_string(),
            });
        }
        let key = self
            .keys
            .find(recipient)
            .await?
            .ok_or_else(|| VaultError::UnknownRecipient {
                recipient: recipient.to_string(),
            })?;

        let ciphertext = self.provider.encrypt(secret, &key.public_key).await?;
        self.accounts
            .create(name, username, ciphertext, recipient)
            .await
    }

    /// Decrypt an account's secret.
    pub async fn retrieve_account(&self, name: &str) -> Result<RevealedSecret, VaultError> {
        let account = self.accounts.find(name).await?;
        let secret = self.session().retrieve(&account).await?;
        info!(name = %name, "account retrieved");
        Ok(secret)
    }

    /// Decrypt an account's secret, giving up when `cancel` fires.
    pub async fn retrieve_account_cancellable(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<RevealedSecret, VaultError> {
        let account = self.accounts.find(name).await?;
        let secret = self.session().retrieve_cancellable(&account, cancel).await?;
        info!(name = %name, "account retrieved");
        Ok(secret)
    }

    /// Decrypt an account and lend the plaintext to `f`.
    ///
    /// The plaintext is zeroed as soon as `f` returns.
    pub async fn with_plaintext<R>(
        &self,
        name: &str,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, VaultError> {
        let secret = self.retrieve_account(name).await?;
        Ok(f(secret.expose()))
    }

    /// Delete an account by name.
    pub async fn delete_account(&self, name: &str) -> Result<(), VaultError> {
        self.accounts.delete_by_name(name).await
    }

    /// All accounts in insertion order. Empty is not an error.
    pub async fn list_accounts(&self) -> Result<Vec<AccountRecord>, VaultError> {
        self.accounts.list().await
    }

    /// All keys in insertion order. Empty is not an error.
    pub async fn list_keys(&self) -> Result<Vec<KeyRecord>, VaultError> {
        self.keys.list().await
    }

    /// Recipients to offer when adding an account; `NoKeysRegistered` if none.
    pub async fn recipient_choices(&self) -> Result<Vec<String>, VaultError> {
        self.keys.recipient_choices().await
    }

    /// A fresh retrieval session over this vault's provider and staging area.
    pub fn session(&self) -> RetrievalSession<'_> {
        RetrievalSession::new(self.provider.as_ref(), &self.staging)
    }

    /// Shared registry of live staging artifacts, for signal handlers.
    pub fn staging_registry(&self) -> StagingRegistry {
        self.staging.registry().clone()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Swap to the store named by `storage`.
    ///
    /// The new store is opened before the old one is closed, so a failed
    /// reconnect leaves the vault usable.
    pub async fn reconnect(&mut self, storage: &StorageConfig) -> Result<(), VaultError> {
        let store: Arc<dyn VaultStore> = Arc::new(SqliteStore::open(storage).await?);
        self.replace_store(store).await;
        info!(path = %storage.database_path, "vault reconnected");
        Ok(())
    }

    /// Swap to an already-open store.
    pub async fn replace_store(&mut self, store: Arc<dyn VaultStore>) {
        let old = std::mem::replace(&mut self.store, store);
        self.keys = KeyRegistry::new(self.store.clone());
        self.accounts = AccountStore::new(self.store.clone());
        if let Err(e) = old.close().await {
            warn!(error = %e, "failed to close previous store");
        }
    }

    /// Flush and release the store.
    pub async fn close(self) -> Result<(), VaultError> {
        self.store.close().await?;
        info!("vault closed");
        Ok(())
    }
}
