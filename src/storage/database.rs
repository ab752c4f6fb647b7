// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded credential database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user id → serialized user row
//! - `users_by_username` / `users_by_email`: unique indexes → user id
//! - `roles`: role id → role type (`ROLE_USER`, `ROLE_ADMIN`)
//! - `user_roles`: (user id, role id) → ()
//! - `refreshtoken`: token id → serialized refresh token row
//! - `refreshtoken_by_user`: user id → token id (at most one per user)
//! - `refreshtoken_by_value`: token value → token id
//! - `sequences`: sequence name → last allocated id
//!
//! redb admits a single write transaction at a time, so every
//! read-check-write sequence done inside one `begin_write` is atomic with
//! respect to concurrent requests.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};

use crate::auth::Role;

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

pub(crate) const USERS_BY_USERNAME: TableDefinition<&str, u64> =
    TableDefinition::new("users_by_username");

pub(crate) const USERS_BY_EMAIL: TableDefinition<&str, u64> =
    TableDefinition::new("users_by_email");

pub(crate) const ROLES: TableDefinition<u32, &str> = TableDefinition::new("roles");

pub(crate) const USER_ROLES: TableDefinition<(u64, u32), ()> = TableDefinition::new("user_roles");

pub(crate) const REFRESH_TOKENS: TableDefinition<u64, &[u8]> = TableDefinition::new("refreshtoken");

pub(crate) const REFRESH_TOKENS_BY_USER: TableDefinition<u64, u64> =
    TableDefinition::new("refreshtoken_by_user");

pub(crate) const REFRESH_TOKENS_BY_VALUE: TableDefinition<&str, u64> =
    TableDefinition::new("refreshtoken_by_value");

const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

pub(crate) const USER_SEQUENCE: &str = "users";
pub(crate) const REFRESH_TOKEN_SEQUENCE: &str = "refreshtoken";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("username is already taken")]
    DuplicateUsername,

    #[error("email is already in use")]
    DuplicateEmail,

    #[error("role {0} has not been seeded")]
    MissingRole(Role),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// AuthDatabase
// =============================================================================

/// Embedded ACID store for users, roles and refresh tokens.
pub struct AuthDatabase {
    db: Database,
}

impl AuthDatabase {
    /// Open (or create) the database at the given path and seed the role rows.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERS_BY_USERNAME)?;
            let _ = write_txn.open_table(USERS_BY_EMAIL)?;
            let _ = write_txn.open_table(USER_ROLES)?;
            let _ = write_txn.open_table(REFRESH_TOKENS)?;
            let _ = write_txn.open_table(REFRESH_TOKENS_BY_USER)?;
            let _ = write_txn.open_table(REFRESH_TOKENS_BY_VALUE)?;
            let _ = write_txn.open_table(SEQUENCES)?;

            let mut roles = write_txn.open_table(ROLES)?;
            for role in Role::ALL {
                roles.insert(role.id(), role.as_str())?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub(crate) fn begin_write(&self) -> StoreResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    pub(crate) fn begin_read(&self) -> StoreResult<redb::ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    /// Cheap liveness check used by the readiness probe.
    pub fn ping(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(ROLES)?;
        Ok(())
    }
}

/// Allocate the next id of a named sequence inside an open write transaction.
///
/// The caller must not hold the `sequences` table open.
pub(crate) fn next_id(write_txn: &WriteTransaction, sequence: &str) -> StoreResult<u64> {
    let mut table = write_txn.open_table(SEQUENCES)?;
    let current = table.get(sequence)?.map(|v| v.value()).unwrap_or(0);
    let next = current + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

/// Resolve a role's seeded row id, failing if the lookup row is missing.
pub(crate) fn role_id(write_txn: &WriteTransaction, role: Role) -> StoreResult<u32> {
    let table = write_txn.open_table(ROLES)?;
    let exists = table.get(role.id())?.is_some();
    if exists {
        Ok(role.id())
    } else {
        Err(StoreError::MissingRole(role))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
pub(crate) fn temp_db() -> (AuthDatabase, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = AuthDatabase::open(&dir.path().join("auth.redb")).unwrap();
    (db, dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_roles(db: &AuthDatabase) -> Vec<(u32, String)> {
        let read_txn = db.begin_read().unwrap();
        let table = read_txn.open_table(ROLES).unwrap();
        let roles: Vec<_> = table
            .iter()
            .unwrap()
            .map(|entry| {
                let (id, role_type) = entry.unwrap();
                (id.value(), role_type.value().to_string())
            })
            .collect();
        roles
    }

    #[test]
    fn open_seeds_roles() {
        let (db, _dir) = temp_db();
        let roles = seeded_roles(&db);
        assert_eq!(
            roles,
            vec![(1, "ROLE_USER".to_string()), (2, "ROLE_ADMIN".to_string())]
        );
        db.ping().unwrap();
    }

    #[test]
    fn reopen_keeps_roles_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("auth.redb");
        drop(AuthDatabase::open(&path).unwrap());

        let db = AuthDatabase::open(&path).unwrap();
        assert_eq!(seeded_roles(&db).len(), 2);
    }

    #[test]
    fn sequences_are_monotonic_and_independent() {
        let (db, _dir) = temp_db();
        let write_txn = db.begin_write().unwrap();
        assert_eq!(next_id(&write_txn, USER_SEQUENCE).unwrap(), 1);
        assert_eq!(next_id(&write_txn, USER_SEQUENCE).unwrap(), 2);
        assert_eq!(next_id(&write_txn, REFRESH_TOKEN_SEQUENCE).unwrap(), 1);
        write_txn.commit().unwrap();

        let write_txn = db.begin_write().unwrap();
        assert_eq!(next_id(&write_txn, USER_SEQUENCE).unwrap(), 3);
        write_txn.abort().unwrap();

        // Aborted allocations are rolled back.
        let write_txn = db.begin_write().unwrap();
        assert_eq!(next_id(&write_txn, USER_SEQUENCE).unwrap(), 3);
    }
}
