// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted credential lifecycle for the cardvault vault.
//!
//! Account secrets are encrypted under a recipient's public key before they
//! are stored, and decrypted on demand by a private key that never enters
//! this process. [`Vault`] is the entry point; the other modules are its
//! parts and are public for front ends that need finer control.

pub mod accounts;
pub mod facade;
pub mod registry;
pub mod session;
pub mod staging;

pub use accounts::AccountStore;
pub use facade::Vault;
pub use registry::KeyRegistry;
pub use session::{RetrievalSession, RevealedSecret, SessionState};
pub use staging::{StagedArtifact, StagingArea, StagingRegistry};
