// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reversible stand-in for the gpg provider.
//!
//! `ReversibleProvider` implements `EncryptionProvider` with a keystream
//! derived from the public key, so tests get real round trips without gpg or
//! a smart card. Decryption only works for recipients whose "private key" was
//! installed, which models the key living on a token. Failures and stalls
//! can be switched on to exercise error and cancellation paths.
//!
//! This is NOT encryption. It exists for tests only.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use cardvault_core::{CiphertextSource, EncryptionProvider, StagingMode, VaultError};

const ARMOR_HEADER: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----";
const MESSAGE_TAG: &str = "RVSB1";

/// An armored-looking public key block unique to `recipient`.
pub fn fake_public_key(recipient: &str) -> Vec<u8> {
    format!(
        "{ARMOR_HEADER}\n\n{}\n-----END PGP PUBLIC KEY BLOCK-----\n",
        hex::encode(Sha256::digest(recipient.as_bytes()))
    )
    .into_bytes()
}

/// Deterministic test provider. See the module docs.
pub struct ReversibleProvider {
    mode: StagingMode,
    /// recipient -> public key it can decrypt for.
    private_keys: Mutex<HashMap<String, Vec<u8>>>,
    fail_encrypt: AtomicBool,
    hold_decrypts: AtomicBool,
    wedge_staged: AtomicBool,
    encrypt_calls: AtomicUsize,
    decrypt_calls: AtomicUsize,
    staged_reads: AtomicUsize,
}

impl ReversibleProvider {
    /// A provider that reads ciphertext from staged files.
    pub fn new() -> Self {
        Self::with_mode(StagingMode::File)
    }

    pub fn with_mode(mode: StagingMode) -> Self {
        Self {
            mode,
            private_keys: Mutex::new(HashMap::new()),
            fail_encrypt: AtomicBool::new(false),
            hold_decrypts: AtomicBool::new(false),
            wedge_staged: AtomicBool::new(false),
            encrypt_calls: AtomicUsize::new(0),
            decrypt_calls: AtomicUsize::new(0),
            staged_reads: AtomicUsize::new(0),
        }
    }

    /// Make the private key matching `public_key` available for `recipient`.
    pub fn install_private_key(&self, recipient: &str, public_key: &[u8]) {
        self.keys().insert(recipient.to_string(), public_key.to_vec());
    }

    /// Simulate pulling the token: `recipient` can no longer decrypt.
    pub fn remove_private_key(&self, recipient: &str) {
        self.keys().remove(recipient);
    }

    /// Make every subsequent `encrypt` fail.
    pub fn set_fail_encrypt(&self, fail: bool) {
        self.fail_encrypt.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `decrypt` wait forever, like a token waiting for
    /// a touch that never comes.
    pub fn hold_decrypts(&self, hold: bool) {
        self.hold_decrypts.store(hold, Ordering::SeqCst);
    }

    /// After reading a staged file, replace it with a directory of the same
    /// name so the session's erase fails.
    pub fn wedge_staged_files(&self, wedge: bool) {
        self.wedge_staged.store(wedge, Ordering::SeqCst);
    }

    pub fn encrypt_calls(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }

    pub fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    /// How many decrypts read their ciphertext from a staged file.
    pub fn staged_reads(&self) -> usize {
        self.staged_reads.load(Ordering::SeqCst)
    }

    fn keys(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.private_keys
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for ReversibleProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn fingerprint(public_key: &[u8]) -> String {
    hex::encode(&Sha256::digest(public_key)[..8])
}

/// XOR `data` with a SHA-256 counter-mode stream keyed by `public_key`.
fn apply_keystream(public_key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for (block, chunk) in data.chunks(32).enumerate() {
        let mut hasher = Sha256::new();
        hasher.update(public_key);
        hasher.update((block as u64).to_le_bytes());
        let pad = hasher.finalize();
        out.extend(chunk.iter().zip(pad.iter()).map(|(b, p)| b ^ p));
    }
    out
}

/// Swap the file at `path` for an empty directory.
async fn wedge(path: &std::path::Path) -> Result<(), VaultError> {
    let swap = async {
        tokio::fs::remove_file(path).await?;
        tokio::fs::create_dir(path).await
    };
    swap.await.map_err(|e| {
        VaultError::Internal(format!("cannot wedge staged file {}: {e}", path.display()))
    })
}

#[async_trait]
impl EncryptionProvider for ReversibleProvider {
    fn name(&self) -> &str {
        "reversible"
    }

    fn staging_mode(&self) -> StagingMode {
        self.mode
    }

    async fn encrypt(&self, plaintext: &[u8], public_key: &[u8]) -> Result<Vec<u8>, VaultError> {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_encrypt.load(Ordering::SeqCst) {
            return Err(VaultError::EncryptionFailed {
                reason: "injected encryption failure".to_string(),
            });
        }
        if plaintext.is_empty() {
            return Err(VaultError::EncryptionFailed {
                reason: "empty plaintext".to_string(),
            });
        }
        if !public_key.starts_with(ARMOR_HEADER.as_bytes()) {
            return Err(VaultError::EncryptionFailed {
                reason: "public key is not an armored key block".to_string(),
            });
        }

        let body = hex::encode(apply_keystream(public_key, plaintext));
        Ok(format!("{MESSAGE_TAG}:{}:{body}", fingerprint(public_key)).into_bytes())
    }

    async fn decrypt(
        &self,
        source: CiphertextSource<'_>,
        recipient: &str,
    ) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);

        let ciphertext = match source {
            CiphertextSource::Staged(path) => {
                self.staged_reads.fetch_add(1, Ordering::SeqCst);
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| VaultError::DecryptionFailed {
                        reason: format!("cannot read {}: {e}", path.display()),
                    })?;
                if self.wedge_staged.load(Ordering::SeqCst) {
                    wedge(path).await?;
                }
                bytes
            }
            CiphertextSource::InMemory(bytes) => bytes.to_vec(),
        };

        if self.hold_decrypts.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let public_key = self
            .keys()
            .get(recipient)
            .cloned()
            .ok_or_else(|| VaultError::DecryptionFailed {
                reason: format!("no secret key for `{recipient}`"),
            })?;

        let malformed = || VaultError::DecryptionFailed {
            reason: "malformed ciphertext".to_string(),
        };
        let text = std::str::from_utf8(&ciphertext).map_err(|_| malformed())?;
        let mut parts = text.splitn(3, ':');
        let (Some(MESSAGE_TAG), Some(fp), Some(body)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        if fp != fingerprint(&public_key) {
            return Err(VaultError::DecryptionFailed {
                reason: format!("ciphertext was not encrypted for `{recipient}`"),
            });
        }
        let body = hex::decode(body).map_err(|_| malformed())?;

        Ok(Zeroizing::new(apply_keystream(&public_key, &body)))
    }
}
