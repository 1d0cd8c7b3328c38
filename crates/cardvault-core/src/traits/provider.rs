// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encryption gateway: the capability boundary over an external
//! asymmetric-crypto provider.

use std::path::Path;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::error::VaultError;
use crate::types::StagingMode;

/// Where the provider reads ciphertext from during decryption.
#[derive(Debug, Clone, Copy)]
pub enum CiphertextSource<'a> {
    /// A staged file owned by the calling retrieval session.
    Staged(&'a Path),
    /// Ciphertext held in memory.
    InMemory(&'a [u8]),
}

/// Encrypts under public keys and decrypts with externally-held private keys.
///
/// Implementations must never log or persist plaintext arguments.
#[async_trait]
pub trait EncryptionProvider: Send + Sync + 'static {
    /// Human-readable provider name for logs and diagnostics.
    fn name(&self) -> &str;

    /// How this provider wants ciphertext delivered to [`decrypt`](Self::decrypt).
    fn staging_mode(&self) -> StagingMode;

    /// Encrypt `plaintext` for the holder of `public_key`.
    ///
    /// Fails with [`VaultError::EncryptionFailed`] for malformed key material
    /// or empty plaintext.
    async fn encrypt(&self, plaintext: &[u8], public_key: &[u8]) -> Result<Vec<u8>, VaultError>;

    /// Decrypt ciphertext with the private key of `recipient`.
    ///
    /// May block indefinitely on operator interaction with a hardware token.
    /// There is no internal timeout; dropping the future cancels it.
    async fn decrypt(
        &self,
        source: CiphertextSource<'_>,
        recipient: &str,
    ) -> Result<Zeroizing<Vec<u8>>, VaultError>;
}
