// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Refresh token repository.
//!
//! Each user owns at most one refresh token row. The row is reached three
//! ways: by id (`refreshtoken`), by owning user (`refreshtoken_by_user`) and
//! by token value (`refreshtoken_by_value`). All three are kept in step
//! inside a single write transaction.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};

use super::super::database::{
    next_id, AuthDatabase, StoreError, StoreResult, REFRESH_TOKENS, REFRESH_TOKENS_BY_USER,
    REFRESH_TOKENS_BY_VALUE, REFRESH_TOKEN_SEQUENCE,
};

/// Refresh token row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredRefreshToken {
    /// Row id, stable across rotations for the same user
    pub id: u64,
    /// Owning user id
    pub user_id: u64,
    /// Opaque token value handed to the client
    pub token: String,
    /// Absolute expiry instant
    pub expiry_date: DateTime<Utc>,
}

/// Repository for refresh token rows.
pub struct RefreshTokenRepository<'a> {
    db: &'a AuthDatabase,
}

impl<'a> RefreshTokenRepository<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    /// Create or replace the refresh token of `user_id`.
    ///
    /// When the user already has a row, its id is kept and only the value and
    /// expiry change. The read of the existing row and the write happen in one
    /// transaction.
    pub fn upsert_for_user(
        &self,
        user_id: u64,
        token: &str,
        expiry_date: DateTime<Utc>,
    ) -> StoreResult<StoredRefreshToken> {
        let write_txn = self.db.begin_write()?;

        let existing = {
            let by_user = write_txn.open_table(REFRESH_TOKENS_BY_USER)?;
            let id = by_user.get(user_id)?.map(|v| v.value());
            id
        };

        let id = match existing {
            Some(id) => {
                if let Some(old) = read_row(&write_txn, id)? {
                    let mut by_value = write_txn.open_table(REFRESH_TOKENS_BY_VALUE)?;
                    by_value.remove(old.token.as_str())?;
                }
                id
            }
            None => next_id(&write_txn, REFRESH_TOKEN_SEQUENCE)?,
        };

        let row = StoredRefreshToken {
            id,
            user_id,
            token: token.to_string(),
            expiry_date,
        };
        let json = serde_json::to_vec(&row)?;

        {
            let mut tokens = write_txn.open_table(REFRESH_TOKENS)?;
            tokens.insert(id, json.as_slice())?;

            let mut by_user = write_txn.open_table(REFRESH_TOKENS_BY_USER)?;
            by_user.insert(user_id, id)?;

            let mut by_value = write_txn.open_table(REFRESH_TOKENS_BY_VALUE)?;
            by_value.insert(row.token.as_str(), id)?;
        }
        write_txn.commit()?;

        Ok(row)
    }

    pub fn find_by_token(&self, token: &str) -> StoreResult<Option<StoredRefreshToken>> {
        let read_txn = self.db.begin_read()?;
        let by_value = read_txn.open_table(REFRESH_TOKENS_BY_VALUE)?;
        let id = match by_value.get(token)? {
            Some(id) => id.value(),
            None => return Ok(None),
        };

        let tokens = read_txn.open_table(REFRESH_TOKENS)?;
        let row = match tokens.get(id)? {
            Some(row) => serde_json::from_slice(row.value())?,
            None => return Err(StoreError::NotFound(format!("Refresh token row {id}"))),
        };
        Ok(Some(row))
    }

    /// Delete row `id` and its index entries, but only while it still holds
    /// `token`. A row rotated to a new value in the meantime is left alone.
    ///
    /// Returns whether a row was removed.
    pub fn delete_if_token(&self, id: u64, token: &str) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let current = read_row(&write_txn, id)?;
        let removed = match current {
            Some(row) if row.token == token => remove_row(&write_txn, id)?,
            _ => false,
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Delete every row owned by `user_id`. Returns the number removed.
    pub fn delete_by_user(&self, user_id: u64) -> StoreResult<usize> {
        let write_txn = self.db.begin_write()?;
        let existing = {
            let by_user = write_txn.open_table(REFRESH_TOKENS_BY_USER)?;
            let id = by_user.get(user_id)?.map(|v| v.value());
            id
        };

        let removed = match existing {
            Some(id) => usize::from(remove_row(&write_txn, id)?),
            None => 0,
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Number of stored rows.
    pub fn count(&self) -> StoreResult<usize> {
        let read_txn = self.db.begin_read()?;
        let tokens = read_txn.open_table(REFRESH_TOKENS)?;
        let mut count = 0;
        for entry in tokens.iter()? {
            entry?;
            count += 1;
        }
        Ok(count)
    }
}

fn read_row(write_txn: &WriteTransaction, id: u64) -> StoreResult<Option<StoredRefreshToken>> {
    let tokens = write_txn.open_table(REFRESH_TOKENS)?;
    let row = match tokens.get(id)? {
        Some(row) => Some(serde_json::from_slice(row.value())?),
        None => None,
    };
    Ok(row)
}

fn remove_row(write_txn: &WriteTransaction, id: u64) -> StoreResult<bool> {
    let Some(row) = read_row(write_txn, id)? else {
        return Ok(false);
    };

    let mut tokens = write_txn.open_table(REFRESH_TOKENS)?;
    tokens.remove(id)?;

    let mut by_user = write_txn.open_table(REFRESH_TOKENS_BY_USER)?;
    by_user.remove(row.user_id)?;

    let mut by_value = write_txn.open_table(REFRESH_TOKENS_BY_VALUE)?;
    by_value.remove(row.token.as_str())?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::temp_db;
    use chrono::Duration;

    #[test]
    fn upsert_creates_then_reuses_row() {
        let (db, _dir) = temp_db();
        let repo = RefreshTokenRepository::new(&db);
        let expiry = Utc::now() + Duration::hours(1);

        let first = repo.upsert_for_user(7, "token-a", expiry).unwrap();
        let second = repo
            .upsert_for_user(7, "token-b", expiry + Duration::hours(1))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(repo.count().unwrap(), 1);
        assert!(repo.find_by_token("token-a").unwrap().is_none());
        assert_eq!(repo.find_by_token("token-b").unwrap().unwrap(), second);
    }

    #[test]
    fn separate_users_get_separate_rows() {
        let (db, _dir) = temp_db();
        let repo = RefreshTokenRepository::new(&db);
        let expiry = Utc::now() + Duration::hours(1);

        let a = repo.upsert_for_user(1, "token-1", expiry).unwrap();
        let b = repo.upsert_for_user(2, "token-2", expiry).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[test]
    fn delete_removes_all_indexes() {
        let (db, _dir) = temp_db();
        let repo = RefreshTokenRepository::new(&db);
        let row = repo
            .upsert_for_user(3, "token-3", Utc::now() + Duration::hours(1))
            .unwrap();

        assert!(repo.delete_if_token(row.id, "token-3").unwrap());
        assert!(!repo.delete_if_token(row.id, "token-3").unwrap());
        assert!(repo.find_by_token("token-3").unwrap().is_none());
        assert_eq!(repo.delete_by_user(3).unwrap(), 0);
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn delete_if_token_spares_rotated_row() {
        let (db, _dir) = temp_db();
        let repo = RefreshTokenRepository::new(&db);
        let expiry = Utc::now() + Duration::hours(1);
        let old = repo.upsert_for_user(6, "token-old", expiry).unwrap();
        let new = repo.upsert_for_user(6, "token-new", expiry).unwrap();
        assert_eq!(old.id, new.id);

        assert!(!repo.delete_if_token(old.id, "token-old").unwrap());
        assert_eq!(repo.find_by_token("token-new").unwrap(), Some(new));
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn delete_by_user_counts_rows() {
        let (db, _dir) = temp_db();
        let repo = RefreshTokenRepository::new(&db);
        repo.upsert_for_user(4, "token-4", Utc::now()).unwrap();

        assert_eq!(repo.delete_by_user(4).unwrap(), 1);
        assert_eq!(repo.delete_by_user(4).unwrap(), 0);
        assert!(repo.find_by_token("token-4").unwrap().is_none());
    }

    #[test]
    fn expiry_survives_serialization() {
        let (db, _dir) = temp_db();
        let repo = RefreshTokenRepository::new(&db);
        let expiry = Utc::now() + Duration::milliseconds(1500);

        repo.upsert_for_user(5, "token-5", expiry).unwrap();
        let loaded = repo.find_by_token("token-5").unwrap().unwrap();
        assert_eq!(loaded.expiry_date, expiry);
    }
}
