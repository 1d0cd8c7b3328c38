// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end vault tests over the SQLite store and the reversible provider.

use std::sync::Arc;
use std::time::Duration;

use cardvault_core::{EncryptionProvider, StagingMode, VaultError};
use cardvault_test_utils::{MemoryStore, ReversibleProvider, TestHarness, fake_public_key};
use cardvault_vault::{SessionState, StagingArea, Vault};
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

async fn open_vault(harness: &TestHarness) -> (Vault, Arc<ReversibleProvider>) {
    let provider = Arc::new(ReversibleProvider::with_mode(harness.config.staging.mode));
    let vault = Vault::connect(&harness.config, provider.clone()).await.unwrap();
    (vault, provider)
}

/// Register `recipient` with the vault and give the provider its private key.
async fn enroll(vault: &Vault, provider: &ReversibleProvider, recipient: &str) {
    let key = fake_public_key(recipient);
    vault.add_key(recipient, &key).await.unwrap();
    provider.install_private_key(recipient, &key);
}

#[tokio::test]
#[traced_test]
async fn alice_email_end_to_end() {
    let harness = TestHarness::new().unwrap();
    let (vault, provider) = open_vault(&harness).await;
    enroll(&vault, &provider, "alice").await;

    let account = vault
        .add_account("email", "a@x.com", b"s3cr3t", "alice")
        .await
        .unwrap();
    assert_eq!(account.recipient, "alice");
    assert!(!account.ciphertext.windows(6).any(|w| w == b"s3cr3t"));

    let listed = vault.list_accounts().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "email");
    assert_eq!(listed[0].username, "a@x.com");

    let secret = vault.retrieve_account("email").await.unwrap();
    assert_eq!(secret.as_str().unwrap(), "s3cr3t");
    assert!(harness.staged_files().is_empty());
    drop(secret);

    vault.delete_account("email").await.unwrap();
    assert!(vault.list_accounts().await.unwrap().is_empty());
    assert!(matches!(
        vault.retrieve_account("email").await,
        Err(VaultError::NotFound { .. })
    ));

    assert!(logs_contain("account created"));
    assert!(!logs_contain("s3cr3t"));
    vault.close().await.unwrap();
}

#[tokio::test]
async fn unknown_recipient_never_reaches_the_provider() {
    let harness = TestHarness::new().unwrap();
    let (vault, provider) = open_vault(&harness).await;
    enroll(&vault, &provider, "alice").await;

    let err = vault
        .add_account("bank", "b", b"pw", "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::UnknownRecipient { ref recipient } if recipient == "bob"));
    assert_eq!(provider.encrypt_calls(), 0);
    assert!(vault.list_accounts().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_encryption_creates_no_record() {
    let harness = TestHarness::new().unwrap();
    let (vault, provider) = open_vault(&harness).await;
    enroll(&vault, &provider, "alice").await;
    provider.set_fail_encrypt(true);

    let err = vault
        .add_account("email", "a@x.com", b"s3cr3t", "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::EncryptionFailed { .. }));
    assert!(vault.list_accounts().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_secret_is_rejected_before_encryption() {
    let harness = TestHarness::new().unwrap();
    let (vault, provider) = open_vault(&harness).await;
    enroll(&vault, &provider, "alice").await;

    let err = vault
        .add_account("email", "a@x.com", b"", "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::InvalidInput(_)));
    assert_eq!(provider.encrypt_calls(), 0);
}

#[tokio::test]
async fn duplicate_account_names_are_rejected() {
    let harness = TestHarness::new().unwrap();
    let (vault, provider) = open_vault(&harness).await;
    enroll(&vault, &provider, "alice").await;

    vault.add_account("email", "a@x.com", b"one", "alice").await.unwrap();
    let err = vault
        .add_account("email", "other@x.com", b"two", "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::DuplicateAccount { ref name } if name == "email"));

    let secret = vault.retrieve_account("email").await.unwrap();
    assert_eq!(secret.expose(), b"one");
}

#[tokio::test]
async fn delete_missing_leaves_store_unchanged() {
    let harness = TestHarness::new().unwrap();
    let (vault, provider) = open_vault(&harness).await;
    enroll(&vault, &provider, "alice").await;
    vault.add_account("email", "a@x.com", b"s3cr3t", "alice").await.unwrap();
    let before = vault.list_accounts().await.unwrap();

    let err = vault.delete_account("missing").await.unwrap_err();
    assert!(matches!(err, VaultError::NotFound { .. }));
    assert_eq!(vault.list_accounts().await.unwrap(), before);
}

#[tokio::test]
async fn empty_vault_lists_cleanly_but_blocks_account_creation_choices() {
    let harness = TestHarness::new().unwrap();
    let (vault, _provider) = open_vault(&harness).await;

    assert!(vault.list_keys().await.unwrap().is_empty());
    assert!(vault.list_accounts().await.unwrap().is_empty());
    assert!(matches!(
        vault.recipient_choices().await,
        Err(VaultError::NoKeysRegistered)
    ));
}

#[tokio::test]
async fn staging_is_gone_after_failed_retrieval() {
    let harness = TestHarness::new().unwrap();
    let (vault, provider) = open_vault(&harness).await;
    enroll(&vault, &provider, "alice").await;
    vault.add_account("email", "a@x.com", b"s3cr3t", "alice").await.unwrap();

    // Token pulled between storing and retrieving.
    provider.remove_private_key("alice");
    let err = vault.retrieve_account("email").await.unwrap_err();
    assert!(matches!(err, VaultError::DecryptionFailed { .. }));
    assert_eq!(provider.staged_reads(), 1);
    assert!(harness.staged_files().is_empty());
    assert!(vault.staging_registry().is_empty());
}

#[tokio::test]
async fn failed_erase_is_fatal_and_left_for_purge() {
    let harness = TestHarness::new().unwrap();
    let (vault, provider) = open_vault(&harness).await;
    enroll(&vault, &provider, "alice").await;
    let account = vault
        .add_account("email", "a@x.com", b"s3cr3t", "alice")
        .await
        .unwrap();

    // The staged file turns into a directory mid-decrypt, so scrubbing it fails.
    provider.wedge_staged_files(true);
    let session = vault.session();
    let err = session.retrieve(&account).await.unwrap_err();
    assert!(err.is_fatal());
    let VaultError::CleanupFailed { path, .. } = &err else {
        panic!("expected CleanupFailed, got {err:?}");
    };
    assert_eq!(session.state(), SessionState::Failed);

    let registry = vault.staging_registry();
    assert_eq!(registry.live(), vec![path.clone()]);

    // Once the obstruction is gone the signal-path purge finishes the job.
    std::fs::remove_dir(path).unwrap();
    assert_eq!(registry.purge_all().unwrap(), 1);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn pipe_mode_round_trip_writes_nothing() {
    let harness = TestHarness::builder()
        .staging_mode(StagingMode::Pipe)
        .build()
        .unwrap();
    let (vault, provider) = open_vault(&harness).await;
    enroll(&vault, &provider, "alice").await;
    vault.add_account("email", "a@x.com", b"s3cr3t", "alice").await.unwrap();

    let len = vault.with_plaintext("email", |p| p.len()).await.unwrap();
    assert_eq!(len, 6);
    assert_eq!(provider.staged_reads(), 0);
    assert!(harness.staged_files().is_empty());
}

#[tokio::test]
async fn cancelled_retrieval_erases_staging() {
    let harness = TestHarness::new().unwrap();
    let (vault, provider) = open_vault(&harness).await;
    enroll(&vault, &provider, "alice").await;
    vault.add_account("email", "a@x.com", b"s3cr3t", "alice").await.unwrap();
    provider.hold_decrypts(true);

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(25)).await;
        trigger.cancel();
    });

    let err = vault
        .retrieve_account_cancellable("email", &token)
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Cancelled));
    assert!(harness.staged_files().is_empty());
    assert!(vault.staging_registry().is_empty());
}

#[tokio::test]
async fn connect_purges_stale_artifacts() {
    let harness = TestHarness::new().unwrap();
    let stale = harness.plant_stale_artifact(b"-----BEGIN PGP MESSAGE-----").unwrap();
    let unrelated = harness.staging_dir().join("keep.txt");
    std::fs::write(&unrelated, b"x").unwrap();

    let (_vault, _provider) = open_vault(&harness).await;
    assert!(!stale.exists());
    assert!(unrelated.exists());
}

#[tokio::test]
async fn data_persists_across_reconnect() {
    let harness = TestHarness::new().unwrap();
    let (mut vault, provider) = open_vault(&harness).await;
    enroll(&vault, &provider, "alice").await;
    vault.add_account("email", "a@x.com", b"s3cr3t", "alice").await.unwrap();

    let other = TestHarness::new().unwrap();
    vault.reconnect(&other.config.storage).await.unwrap();
    assert!(vault.list_accounts().await.unwrap().is_empty());

    vault.reconnect(&harness.config.storage).await.unwrap();
    let secret = vault.retrieve_account("email").await.unwrap();
    assert_eq!(secret.expose(), b"s3cr3t");
}

#[tokio::test]
async fn opening_creates_the_staging_directory() {
    let dir = tempfile::tempdir().unwrap();
    let staging_dir = dir.path().join("run/cardvault/staging");
    let provider = Arc::new(ReversibleProvider::new());
    let vault = Vault::from_parts(
        Arc::new(MemoryStore::new()),
        provider.clone(),
        StagingArea::new(&staging_dir, "cardvault-"),
    )
    .unwrap();

    assert!(staging_dir.is_dir());
    enroll(&vault, &provider, "alice").await;
    vault.add_account("email", "a@x.com", b"s3cr3t", "alice").await.unwrap();
    assert_eq!(vault.retrieve_account("email").await.unwrap().expose(), b"s3cr3t");
}

#[tokio::test]
async fn store_outage_surfaces_as_store_unavailable() {
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(ReversibleProvider::new());
    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::from_parts(
        store.clone(),
        provider,
        StagingArea::new(dir.path(), "cardvault-"),
    )
    .unwrap();

    store.set_unavailable(true);
    assert!(matches!(
        vault.list_accounts().await,
        Err(VaultError::StoreUnavailable { .. })
    ));
    assert!(matches!(
        vault.add_key("alice", b"K").await,
        Err(VaultError::StoreUnavailable { .. })
    ));
}

#[tokio::test]
async fn revealed_secret_drop_moves_session_to_erased() {
    let harness = TestHarness::new().unwrap();
    let (vault, provider) = open_vault(&harness).await;
    enroll(&vault, &provider, "alice").await;
    let account = vault
        .add_account("email", "a@x.com", b"s3cr3t", "alice")
        .await
        .unwrap();

    let session = vault.session();
    let secret = session.retrieve(&account).await.unwrap();
    assert_eq!(session.state(), SessionState::Materialized);
    drop(secret);
    assert_eq!(session.state(), SessionState::Erased);
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn encrypt_decrypt_round_trips(secret in proptest::collection::vec(any::<u8>(), 1..512)) {
        runtime().block_on(async {
            let provider = ReversibleProvider::with_mode(StagingMode::Pipe);
            let key = fake_public_key("alice");
            provider.install_private_key("alice", &key);

            let ciphertext = provider.encrypt(&secret, &key).await.unwrap();
            let plaintext = provider
                .decrypt(cardvault_core::CiphertextSource::InMemory(&ciphertext), "alice")
                .await
                .unwrap();
            assert_eq!(plaintext.as_slice(), secret.as_slice());
        });
    }

    #[test]
    fn re_registering_any_recipient_fails(
        recipients in proptest::collection::hash_set("[a-z][a-z0-9@.]{0,15}", 1..6),
    ) {
        runtime().block_on(async {
            let store = Arc::new(MemoryStore::new());
            let dir = tempfile::tempdir().unwrap();
            let vault = Vault::from_parts(
                store,
                Arc::new(ReversibleProvider::new()),
                StagingArea::new(dir.path(), "cardvault-"),
            )
            .unwrap();

            for r in &recipients {
                vault.add_key(r, b"K1").await.unwrap();
            }
            for r in &recipients {
                let err = vault.add_key(r, b"K2").await.unwrap_err();
                assert!(matches!(err, VaultError::DuplicateRecipient { .. }));
            }
            assert_eq!(vault.list_keys().await.unwrap().len(), recipients.len());
        });
    }

    #[test]
    fn stored_accounts_decrypt_to_their_secret(
        secret in "[ -~]{1,64}",
        name in "[a-z]{1,12}",
    ) {
        runtime().block_on(async {
            let harness = TestHarness::new().unwrap();
            let (vault, provider) = open_vault(&harness).await;
            enroll(&vault, &provider, "alice").await;
            vault
                .add_account(&name, "user", secret.as_bytes(), "alice")
                .await
                .unwrap();

            let revealed = vault.retrieve_account(&name).await.unwrap();
            assert_eq!(revealed.as_str().unwrap(), secret);
            assert!(harness.staged_files().is_empty());
        });
    }
}
