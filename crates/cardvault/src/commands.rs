// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot subcommands: add-key, add-account, get, delete, list, keys.

use std::io::{IsTerminal, Read};
use std::path::Path;

use cardvault_core::{AccountRecord, KeyRecord, VaultError};
use cardvault_vault::Vault;
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;

use crate::prompt;

/// `cardvault add-key <recipient> [--key-file PATH]`
pub async fn add_key(vault: &Vault, recipient: &str, key_file: Option<&Path>) -> Result<(), VaultError> {
    let key_file = key_file.map(Path::to_path_buf);
    let public_key = prompt::off_task(move || read_public_key(key_file.as_deref())).await?;
    let record = vault.add_key(recipient, &public_key).await?;
    println!("Registered public key for {}", record.recipient);
    Ok(())
}

/// `cardvault add-account <name> <username> <recipient>`
pub async fn add_account(
    vault: &Vault,
    name: &str,
    username: &str,
    recipient: &str,
) -> Result<(), VaultError> {
    // Nothing to encrypt for until a key exists; say so before prompting.
    vault.recipient_choices().await?;

    let secret = prompt::off_task(prompt::read_secret).await?;
    let record = vault
        .add_account(name, username, secret.expose_secret().as_bytes(), recipient)
        .await?;
    println!("Stored account {} for {}", record.name, record.recipient);
    Ok(())
}

/// `cardvault get <name>`: print the secret on stdout.
pub async fn get(vault: &Vault, name: &str, cancel: &CancellationToken) -> Result<(), VaultError> {
    let secret = vault.retrieve_account_cancellable(name, cancel).await?;
    println!("{}", secret.as_str()?);
    Ok(())
}

/// `cardvault delete <name>`
pub async fn delete(vault: &Vault, name: &str) -> Result<(), VaultError> {
    vault.delete_account(name).await?;
    println!("Account deleted: {name}");
    Ok(())
}

/// `cardvault list`
pub async fn list(vault: &Vault) -> Result<(), VaultError> {
    let accounts = vault.list_accounts().await?;
    if accounts.is_empty() {
        println!("No accounts stored.");
    } else {
        print!("{}", format_accounts(&accounts));
    }
    Ok(())
}

/// `cardvault keys`
pub async fn keys(vault: &Vault) -> Result<(), VaultError> {
    let keys = vault.list_keys().await?;
    if keys.is_empty() {
        println!("No public keys registered.");
    } else {
        print!("{}", format_keys(&keys));
    }
    Ok(())
}

/// Read an armored public key from `path`, or from stdin when absent.
pub fn read_public_key(path: Option<&Path>) -> Result<Vec<u8>, VaultError> {
    match path {
        Some(path) => std::fs::read(path).map_err(|e| {
            VaultError::InvalidInput(format!("cannot read key file {}: {e}", path.display()))
        }),
        None => {
            let mut stdin = std::io::stdin();
            if stdin.is_terminal() {
                eprintln!("Paste the ASCII-armored public key, then press Ctrl-D:");
            }
            let mut buf = Vec::new();
            stdin
                .read_to_end(&mut buf)
                .map_err(|e| VaultError::InvalidInput(format!("cannot read public key: {e}")))?;
            Ok(buf)
        }
    }
}

/// Accounts as an aligned table. Never includes ciphertext.
pub fn format_accounts(accounts: &[AccountRecord]) -> String {
    let name_w = column_width("NAME", accounts.iter().map(|a| a.name.as_str()));
    let user_w = column_width("USERNAME", accounts.iter().map(|a| a.username.as_str()));
    let mut out = format!("{:<name_w$}  {:<user_w$}  RECIPIENT\n", "NAME", "USERNAME");
    for a in accounts {
        out.push_str(&format!(
            "{:<name_w$}  {:<user_w$}  {}\n",
            a.name, a.username, a.recipient
        ));
    }
    out
}

/// Keys as an aligned table of recipient and registration time.
pub fn format_keys(keys: &[KeyRecord]) -> String {
    let rec_w = column_width("RECIPIENT", keys.iter().map(|k| k.recipient.as_str()));
    let mut out = format!("{:<rec_w$}  REGISTERED\n", "RECIPIENT");
    for k in keys {
        out.push_str(&format!("{:<rec_w$}  {}\n", k.recipient, k.created_at));
    }
    out
}

fn column_width<'a>(header: &str, values: impl Iterator<Item = &'a str>) -> usize {
    values.map(str::len).max().unwrap_or(0).max(header.len())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cardvault_test_utils::{ReversibleProvider, TestHarness, fake_public_key};

    use super::*;

    fn account(name: &str, username: &str) -> AccountRecord {
        AccountRecord {
            id: 1,
            name: name.into(),
            username: username.into(),
            ciphertext: b"-----BEGIN PGP MESSAGE-----".to_vec(),
            recipient: "alice".into(),
            created_at: "2026-01-01 00:00:00".into(),
        }
    }

    #[test]
    fn account_table_is_aligned_and_omits_ciphertext() {
        let table = format_accounts(&[account("email", "a@x.com"), account("bank-of-x", "al")]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NAME       USERNAME  RECIPIENT"));
        assert!(lines[1].starts_with("email      a@x.com   alice"));
        assert!(!table.contains("PGP MESSAGE"));
    }

    #[test]
    fn key_table_lists_recipients() {
        let keys = vec![KeyRecord {
            id: 1,
            recipient: "alice@example.com".into(),
            public_key: b"K".to_vec(),
            created_at: "2026-01-01 00:00:00".into(),
        }];
        let table = format_keys(&keys);
        assert!(table.contains("alice@example.com  2026-01-01 00:00:00"));
    }

    #[test]
    fn read_public_key_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alice.asc");
        std::fs::write(&path, fake_public_key("alice")).unwrap();

        assert_eq!(read_public_key(Some(&path)).unwrap(), fake_public_key("alice"));
        assert!(matches!(
            read_public_key(Some(&dir.path().join("missing.asc"))),
            Err(VaultError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn add_key_then_delete_flow() {
        let harness = TestHarness::new().unwrap();
        let provider = Arc::new(ReversibleProvider::new());
        let vault = Vault::connect(&harness.config, provider.clone()).await.unwrap();

        let key_path = harness.staging_dir().join("../alice.asc");
        std::fs::write(&key_path, fake_public_key("alice")).unwrap();
        add_key(&vault, "alice", Some(&key_path)).await.unwrap();
        assert_eq!(vault.list_keys().await.unwrap().len(), 1);

        vault.add_account("email", "a@x.com", b"s3cr3t", "alice").await.unwrap();
        delete(&vault, "email").await.unwrap();
        assert!(matches!(
            delete(&vault, "email").await,
            Err(VaultError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn add_account_without_keys_fails_before_prompting() {
        let harness = TestHarness::new().unwrap();
        let vault = Vault::connect(&harness.config, Arc::new(ReversibleProvider::new()))
            .await
            .unwrap();

        let err = add_account(&vault, "email", "a@x.com", "alice").await.unwrap_err();
        assert!(matches!(err, VaultError::NoKeysRegistered));
    }
}
