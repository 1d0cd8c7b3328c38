// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the cardvault credential vault.
//!
//! Holds the error taxonomy, the key and account record types, and the two
//! collaborator traits the vault is built against: [`VaultStore`] for
//! persistence and [`EncryptionProvider`] for the external crypto capability.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{RecordKind, VaultError};
pub use traits::{CiphertextSource, EncryptionProvider, InsertAccount, InsertKey, VaultStore};
pub use types::{AccountRecord, KeyRecord, NewAccount, StagingMode};
