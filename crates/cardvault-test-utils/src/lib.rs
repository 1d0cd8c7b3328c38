// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for cardvault integration tests.
//!
//! Provides substitute collaborators and a temp-directory harness for fast,
//! deterministic, CI-runnable tests without gpg or a smart card.
//!
//! # Components
//!
//! - [`ReversibleProvider`] - reversible encryption provider with failure injection
//! - [`MemoryStore`] - in-memory store that can be switched offline
//! - [`TestHarness`] - temp database and staging directory

pub mod harness;
pub mod memory_store;
pub mod reversible_provider;

pub use harness::TestHarness;
pub use memory_store::MemoryStore;
pub use reversible_provider::{ReversibleProvider, fake_public_key};
