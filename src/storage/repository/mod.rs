// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the auth database.
//!
//! Each repository borrows the [`AuthDatabase`](super::AuthDatabase) and
//! exposes the operations for one entity type.

pub mod refresh_tokens;
pub mod users;

pub use refresh_tokens::{RefreshTokenRepository, StoredRefreshToken};
pub use users::{hash_password, verify_password, NewUser, StoredUser, UserRepository};
