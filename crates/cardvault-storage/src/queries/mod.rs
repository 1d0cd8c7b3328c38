// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the two record classes.

pub mod accounts;
pub mod keys;
