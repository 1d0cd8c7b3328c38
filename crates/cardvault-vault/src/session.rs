// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval session: decrypt one account and hand out its plaintext as a
//! scoped token.
//!
//! State machine:
//!
//! ```text
//! Idle -> Decrypting -> Materialized -> Erased
//!                   \-> Failed
//! ```
//!
//! Staged ciphertext is erased before `retrieve` returns, whichever way it
//! returns. Dropping the retrieval future (cancellation) erases it through
//! the artifact's own drop. The plaintext lives in a [`RevealedSecret`]; when
//! that is dropped the bytes are zeroed and the session reads `Erased`.

use std::sync::{Arc, Mutex, PoisonError};

use cardvault_core::{AccountRecord, CiphertextSource, EncryptionProvider, StagingMode, VaultError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::staging::StagingArea;

/// Lifecycle of a retrieval session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    /// Created, nothing decrypted yet.
    Idle,
    /// Waiting on the encryption provider.
    Decrypting,
    /// Plaintext is held by a live `RevealedSecret`.
    Materialized,
    /// Plaintext was zeroed.
    Erased,
    /// Decryption failed or was cancelled; no plaintext exists.
    Failed,
}

#[derive(Debug, Clone)]
struct SharedState(Arc<Mutex<SessionState>>);

impl SharedState {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(SessionState::Idle)))
    }

    fn get(&self) -> SessionState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, state: SessionState) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

/// One decrypt-then-reveal cycle. Sessions are single-use.
pub struct RetrievalSession<'a> {
    provider: &'a dyn EncryptionProvider,
    staging: &'a StagingArea,
    state: SharedState,
}

impl<'a> RetrievalSession<'a> {
    pub fn new(provider: &'a dyn EncryptionProvider, staging: &'a StagingArea) -> Self {
        Self {
            provider,
            staging,
            state: SharedState::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Decrypt `account`. Blocks for as long as the provider does.
    pub async fn retrieve(&self, account: &AccountRecord) -> Result<RevealedSecret, VaultError> {
        self.run(account, None).await
    }

    /// Like [`retrieve`](Self::retrieve), but gives up with `Cancelled` as
    /// soon as `cancel` fires.
    pub async fn retrieve_cancellable(
        &self,
        account: &AccountRecord,
        cancel: &CancellationToken,
    ) -> Result<RevealedSecret, VaultError> {
        self.run(account, Some(cancel)).await
    }

    async fn run(
        &self,
        account: &AccountRecord,
        cancel: Option<&CancellationToken>,
    ) -> Result<RevealedSecret, VaultError> {
        if self.state() != SessionState::Idle {
            return Err(VaultError::Internal(format!(
                "retrieval session already used (state: {})",
                self.state()
            )));
        }
        self.state.set(SessionState::Decrypting);

        let cancelled = async {
            match cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = cancelled => {
                warn!(name = %account.name, "retrieval cancelled");
                Err(VaultError::Cancelled)
            }
            result = self.decrypt(account) => result,
        };

        match outcome {
            Ok(plaintext) => {
                self.state.set(SessionState::Materialized);
                debug!(name = %account.name, "secret materialized");
                Ok(RevealedSecret {
                    plaintext,
                    state: self.state.clone(),
                })
            }
            Err(e) => {
                self.state.set(SessionState::Failed);
                Err(e)
            }
        }
    }

    async fn decrypt(&self, account: &AccountRecord) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        match self.provider.staging_mode() {
            StagingMode::File => {
                let artifact = self.staging.stage(&account.ciphertext)?;
                let result = self
                    .provider
                    .decrypt(CiphertextSource::Staged(artifact.path()), &account.recipient)
                    .await;
                // A failed erase outranks whatever the provider returned.
                artifact.erase()?;
                result
            }
            StagingMode::Pipe => {
                self.provider
                    .decrypt(CiphertextSource::InMemory(&account.ciphertext), &account.recipient)
                    .await
            }
        }
    }
}

/// Decrypted secret bytes, zeroed on drop.
///
/// Holding one keeps its session `Materialized`.
pub struct RevealedSecret {
    plaintext: Zeroizing<Vec<u8>>,
    state: SharedState,
}

impl RevealedSecret {
    pub fn expose(&self) -> &[u8] {
        &self.plaintext
    }

    /// The secret as UTF-8 text.
    pub fn as_str(&self) -> Result<&str, VaultError> {
        std::str::from_utf8(&self.plaintext)
            .map_err(|_| VaultError::Internal("decrypted secret is not valid UTF-8".to_string()))
    }

    pub fn len(&self) -> usize {
        self.plaintext.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plaintext.is_empty()
    }
}

impl std::fmt::Debug for RevealedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RevealedSecret([REDACTED])")
    }
}

impl Drop for RevealedSecret {
    fn drop(&mut self) {
        // `plaintext` zeroizes itself right after this runs.
        self.state.set(SessionState::Erased);
    }
}
