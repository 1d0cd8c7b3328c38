// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! gpg-backed encryption provider.
//!
//! [`GpgProvider`] drives the local `gpg` executable as a subprocess: public
//! keys come from the vault's key registry, private keys stay wherever
//! gpg-agent finds them (usually a smart card). The preflight methods check
//! the toolchain and the token before the vault is opened.

pub mod preflight;
pub mod provider;

pub use provider::GpgProvider;
