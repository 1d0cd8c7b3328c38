// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the cardvault credential vault.

use std::path::PathBuf;

use thiserror::Error;

/// The error type shared by every vault component and collaborator trait.
#[derive(Debug, Error)]
pub enum VaultError {
    /// A caller-supplied field was empty or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A key is already registered for this recipient.
    #[error("recipient `{recipient}` is already registered")]
    DuplicateRecipient { recipient: String },

    /// An account with this name already exists.
    #[error("account `{name}` already exists")]
    DuplicateAccount { name: String },

    /// No key is registered for the recipient an account refers to.
    #[error("no public key registered for recipient `{recipient}`")]
    UnknownRecipient { recipient: String },

    /// Lookup by name found nothing.
    #[error("{kind} `{name}` not found")]
    NotFound { kind: RecordKind, name: String },

    /// An operation needs at least one registered key and there are none.
    #[error("no public keys registered -- add a key before adding accounts")]
    NoKeysRegistered,

    /// The encryption provider rejected the key or the input.
    #[error("encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    /// The encryption provider could not decrypt (key absent, token missing
    /// or locked, foreign or malformed ciphertext).
    #[error("decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    /// The persistence collaborator is unreachable or failed.
    #[error("store unavailable: {source}")]
    StoreUnavailable {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A staged artifact could not be erased. Not recoverable.
    #[error("failed to erase staged artifact {}: {source}", path.display())]
    CleanupFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The operator or a shutdown signal cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VaultError {
    /// Build a `StoreUnavailable` from anything displayable.
    pub fn store(message: impl std::fmt::Display) -> Self {
        VaultError::StoreUnavailable {
            source: message.to_string().into(),
        }
    }

    /// Shorthand for a missing account.
    pub fn account_not_found(name: impl Into<String>) -> Self {
        VaultError::NotFound {
            kind: RecordKind::Account,
            name: name.into(),
        }
    }

    /// Returns true when the process must not continue after this error.
    ///
    /// Only a failed erasure qualifies: a decrypted secret may still be on disk.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VaultError::CleanupFailed { .. })
    }
}

/// Which record class a lookup targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum RecordKind {
    Key,
    Account,
}
