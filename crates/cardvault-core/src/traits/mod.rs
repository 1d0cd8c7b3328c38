// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits at the vault's two external seams.
//!
//! Both use `#[async_trait]` so they can be held as trait objects.

pub mod provider;
pub mod store;

pub use provider::{CiphertextSource, EncryptionProvider};
pub use store::{InsertAccount, InsertKey, VaultStore};
