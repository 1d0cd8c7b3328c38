// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record types shared by the vault, its store, and its front ends.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A registered recipient and its public key.
///
/// Immutable once created; there is no update path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub id: i64,
    /// Identifier handed to the external decrypt capability (e.g. a gpg key
    /// id or email address).
    pub recipient: String,
    /// ASCII-armored public key material.
    pub public_key: Vec<u8>,
    pub created_at: String,
}

/// A named account whose secret is stored encrypted for one recipient.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub id: i64,
    pub name: String,
    pub username: String,
    /// Ciphertext produced by the encryption gateway. Never plaintext.
    pub ciphertext: Vec<u8>,
    /// Recipient resolved at creation time. Not re-validated afterwards.
    pub recipient: String,
    pub created_at: String,
}

impl std::fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("ciphertext", &format_args!("<{} bytes>", self.ciphertext.len()))
            .field("recipient", &self.recipient)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Fields of an account about to be inserted.
#[derive(Clone)]
pub struct NewAccount {
    pub name: String,
    pub username: String,
    pub ciphertext: Vec<u8>,
    pub recipient: String,
}

/// How ciphertext is handed to a provider for decryption.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StagingMode {
    /// Ciphertext is written to a session-unique file whose path the
    /// provider reads.
    #[default]
    File,
    /// Ciphertext is streamed to the provider in memory; nothing touches disk.
    Pipe,
}
