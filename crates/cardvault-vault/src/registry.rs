// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key registry: recipients and the public keys secrets are encrypted under.

use std::sync::Arc;

use cardvault_core::{InsertKey, KeyRecord, VaultError, VaultStore};
use tracing::info;

/// Registered recipients. Keys are immutable once registered.
#[derive(Clone)]
pub struct KeyRegistry {
    store: Arc<dyn VaultStore>,
}

impl KeyRegistry {
    pub fn new(store: Arc<dyn VaultStore>) -> Self {
        Self { store }
    }

    /// Register a public key for `recipient`.
    ///
    /// A whitespace-only recipient counts as empty.
    pub async fn register(&self, recipient: &str, public_key: &[u8]) -> Result<KeyRecord, VaultError> {
        if recipient.trim().is_empty() {
            return Err(VaultError::InvalidInput(
                "recipient must not be empty".to_string(),
            ));
        }
        if public_key.is_empty() {
            return Err(VaultError::InvalidInput(
                "public key must not be empty".to_string(),
            ));
        }

        match self.store.insert_key(recipient, public_key).await? {
            InsertKey::Created(record) => {
                info!(recipient = %recipient, "public key registered");
                Ok(record)
            }
            InsertKey::DuplicateRecipient => Err(VaultError::DuplicateRecipient {
                recipient: recipient.to_string(),
            }),
        }
    }

    /// All keys in insertion order.
    pub async fn list(&self) -> Result<Vec<KeyRecord>, VaultError> {
        self.store.list_keys().await
    }

    pub async fn find(&self, recipient: &str) -> Result<Option<KeyRecord>, VaultError> {
        self.store.find_key(recipient).await
    }

    /// Recipients a front end may offer when adding an account.
    ///
    /// Fails with `NoKeysRegistered` when there is nothing to choose from.
    pub async fn recipient_choices(&self) -> Result<Vec<String>, VaultError> {
        let recipients: Vec<String> = self
            .list()
            .await?
            .into_iter()
            .map(|key| key.recipient)
            .collect();
        if recipients.is_empty() {
            return Err(VaultError::NoKeysRegistered);
        }
        Ok(recipients)
    }
}

#[cfg(test)]
mod tests {
    use cardvault_test_utils::MemoryStore;

    use super::*;

    fn registry() -> (KeyRegistry, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (KeyRegistry::new(store.clone()), store)
    }

    #[tokio::test]
    async fn register_then_list() {
        let (registry, _) = registry();
        let record = registry.register("alice", b"PUBKEY").await.unwrap();
        assert_eq!(record.recipient, "alice");

        let keys = registry.list().await.unwrap();
        assert_eq!(keys, vec![record]);
    }

    #[tokio::test]
    async fn blank_fields_are_invalid() {
        let (registry, _) = registry();
        for (recipient, key) in [("", &b"K"[..]), ("   ", &b"K"[..]), ("alice", &b""[..])] {
            let err = registry.register(recipient, key).await.unwrap_err();
            assert!(matches!(err, VaultError::InvalidInput(_)), "{recipient:?}");
        }
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_recipient_keeps_first_key() {
        let (registry, _) = registry();
        registry.register("alice", b"K1").await.unwrap();

        let err = registry.register("alice", b"K2").await.unwrap_err();
        assert!(matches!(err, VaultError::DuplicateRecipient { ref recipient } if recipient == "alice"));
        assert_eq!(registry.find("alice").await.unwrap().unwrap().public_key, b"K1");
    }

    #[tokio::test]
    async fn recipient_choices_requires_a_key() {
        let (registry, _) = registry();
        assert!(matches!(
            registry.recipient_choices().await,
            Err(VaultError::NoKeysRegistered)
        ));

        registry.register("alice", b"K").await.unwrap();
        registry.register("bob", b"K").await.unwrap();
        assert_eq!(registry.recipient_choices().await.unwrap(), vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn unreachable_store_surfaces_as_store_unavailable() {
        let (registry, store) = registry();
        store.set_unavailable(true);
        assert!(matches!(
            registry.list().await,
            Err(VaultError::StoreUnavailable { .. })
        ));
    }
}
