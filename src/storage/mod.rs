// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Storage Module
//!
//! Persistent storage for users, roles and refresh tokens, backed by a single
//! embedded redb database file (`$DATA_DIR/auth.redb`).
//!
//! ## Layout
//!
//! ```text
//! users                  user id  -> user row (username, email, password hash)
//! users_by_username      username -> user id
//! users_by_email         email    -> user id
//! roles                  role id  -> ROLE_USER | ROLE_ADMIN
//! user_roles             (user id, role id)
//! refreshtoken           token id -> refresh token row
//! refreshtoken_by_user   user id  -> token id
//! refreshtoken_by_value  token    -> token id
//! ```
//!
//! ## Important Notes
//!
//! - Passwords are stored as bcrypt hashes only
//! - Uniqueness and the one-refresh-token-per-user rule are enforced inside
//!   write transactions, not by callers

pub mod database;
pub mod repository;

pub use database::{AuthDatabase, StoreError, StoreResult};
pub use repository::{
    hash_password, verify_password, NewUser, RefreshTokenRepository, StoredRefreshToken,
    StoredUser, UserRepository,
};
