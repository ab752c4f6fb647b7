// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository (credential store).
//!
//! Users are stored as JSON rows keyed by numeric id, with unique indexes on
//! username and email. Role assignments live in the `user_roles` join table
//! and are materialized into [`StoredUser::roles`] on every read.

use std::collections::BTreeSet;

use redb::ReadableTable;
use serde::{Deserialize, Serialize};

use super::super::database::{
    next_id, role_id, AuthDatabase, StoreError, StoreResult, USERS, USERS_BY_EMAIL,
    USERS_BY_USERNAME, USER_ROLES, USER_SEQUENCE,
};
use crate::auth::Role;

/// Persisted column set of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRow {
    id: u64,
    username: String,
    email: String,
    password_hash: String,
}

/// User with its role assignments.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub id: u64,
    pub username: String,
    pub email: String,
    /// bcrypt hash, never the plaintext
    pub password_hash: String,
    pub roles: BTreeSet<Role>,
}

impl std::fmt::Debug for StoredUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredUser")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

/// Fields needed to insert a user.
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub roles: &'a [Role],
}

/// Hash a password using bcrypt with automatic salt generation.
pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(password, hash)
}

/// Repository for user operations on the auth database.
pub struct UserRepository<'a> {
    db: &'a AuthDatabase,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    pub fn exists_by_username(&self, username: &str) -> StoreResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS_BY_USERNAME)?;
        let exists = table.get(username)?.is_some();
        Ok(exists)
    }

    pub fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS_BY_EMAIL)?;
        let exists = table.get(email)?.is_some();
        Ok(exists)
    }

    /// Look up a user and its roles by username.
    pub fn find_by_username(&self, username: &str) -> StoreResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(USERS_BY_USERNAME)?;
        let id = match index.get(username)? {
            Some(id) => id.value(),
            None => return Ok(None),
        };
        self.load(&read_txn, id)
    }

    pub fn find_by_id(&self, id: u64) -> StoreResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        self.load(&read_txn, id)
    }

    /// All users, ordered by id.
    pub fn list_all(&self) -> StoreResult<Vec<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        let user_roles = read_txn.open_table(USER_ROLES)?;

        let mut result = Vec::new();
        for entry in users.iter()? {
            let (_, row) = entry?;
            let row: UserRow = serde_json::from_slice(row.value())?;
            let roles = roles_of(&user_roles, row.id)?;
            result.push(with_roles(row, roles));
        }
        Ok(result)
    }

    /// Insert a new user.
    ///
    /// Username uniqueness is checked before email uniqueness, both inside the
    /// write transaction that performs the insert.
    pub fn create(&self, new_user: NewUser<'_>) -> StoreResult<StoredUser> {
        let write_txn = self.db.begin_write()?;

        {
            let usernames = write_txn.open_table(USERS_BY_USERNAME)?;
            if usernames.get(new_user.username)?.is_some() {
                return Err(StoreError::DuplicateUsername);
            }
        }
        {
            let emails = write_txn.open_table(USERS_BY_EMAIL)?;
            if emails.get(new_user.email)?.is_some() {
                return Err(StoreError::DuplicateEmail);
            }
        }

        let mut role_ids = Vec::with_capacity(new_user.roles.len());
        for role in new_user.roles {
            role_ids.push(role_id(&write_txn, *role)?);
        }

        let id = next_id(&write_txn, USER_SEQUENCE)?;
        let row = UserRow {
            id,
            username: new_user.username.to_string(),
            email: new_user.email.to_string(),
            password_hash: new_user.password_hash.to_string(),
        };
        let json = serde_json::to_vec(&row)?;

        {
            let mut users = write_txn.open_table(USERS)?;
            users.insert(id, json.as_slice())?;

            let mut usernames = write_txn.open_table(USERS_BY_USERNAME)?;
            usernames.insert(row.username.as_str(), id)?;

            let mut emails = write_txn.open_table(USERS_BY_EMAIL)?;
            emails.insert(row.email.as_str(), id)?;

            let mut user_roles = write_txn.open_table(USER_ROLES)?;
            for rid in &role_ids {
                user_roles.insert((id, *rid), ())?;
            }
        }
        write_txn.commit()?;

        let roles = new_user.roles.iter().copied().collect();
        Ok(with_roles(row, roles))
    }

    fn load(&self, read_txn: &redb::ReadTransaction, id: u64) -> StoreResult<Option<StoredUser>> {
        let users = read_txn.open_table(USERS)?;
        let row: UserRow = match users.get(id)? {
            Some(row) => serde_json::from_slice(row.value())?,
            None => return Ok(None),
        };
        let user_roles = read_txn.open_table(USER_ROLES)?;
        let roles = roles_of(&user_roles, id)?;
        Ok(Some(with_roles(row, roles)))
    }
}

/// Collect the roles assigned to `user_id`; unknown role ids are skipped.
fn roles_of<T>(user_roles: &T, user_id: u64) -> StoreResult<BTreeSet<Role>>
where
    T: ReadableTable<(u64, u32), ()>,
{
    let mut roles = BTreeSet::new();
    for entry in user_roles.range((user_id, 0u32)..=(user_id, u32::MAX))? {
        let (key, _) = entry?;
        let (_, rid) = key.value();
        match Role::from_id(rid) {
            Some(role) => {
                roles.insert(role);
            }
            None => tracing::warn!(user_id, role_id = rid, "Ignoring unknown role assignment"),
        }
    }
    Ok(roles)
}

fn with_roles(row: UserRow, roles: BTreeSet<Role>) -> StoredUser {
    StoredUser {
        id: row.id,
        username: row.username,
        email: row.email,
        password_hash: row.password_hash,
        roles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::temp_db;

    // Minimum bcrypt cost keeps the tests fast.
    const TEST_COST: u32 = 4;

    fn new_user<'a>(username: &'a str, email: &'a str, hash: &'a str) -> NewUser<'a> {
        NewUser {
            username,
            email,
            password_hash: hash,
            roles: &[Role::User],
        }
    }

    #[test]
    fn create_and_find_user() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);
        let hash = hash_password("password", TEST_COST).unwrap();

        let created = repo
            .create(new_user("testuser", "test@example.com", &hash))
            .unwrap();
        assert_eq!(created.id, 1);
        assert!(created.roles.contains(&Role::User));

        let loaded = repo.find_by_username("testuser").unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(repo.find_by_id(1).unwrap().unwrap().username, "testuser");
        assert!(repo.exists_by_username("testuser").unwrap());
        assert!(repo.exists_by_email("test@example.com").unwrap());
        assert!(repo.find_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_checked_before_email() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);

        repo.create(new_user("alice", "alice@example.com", "h")).unwrap();

        // Both collide: username wins.
        let both = repo.create(new_user("alice", "alice@example.com", "h"));
        assert!(matches!(both, Err(StoreError::DuplicateUsername)));

        let username = repo.create(new_user("alice", "other@example.com", "h"));
        assert!(matches!(username, Err(StoreError::DuplicateUsername)));

        let email = repo.create(new_user("bob", "alice@example.com", "h"));
        assert!(matches!(email, Err(StoreError::DuplicateEmail)));

        assert_eq!(repo.list_all().unwrap().len(), 1);
    }

    #[test]
    fn roles_are_materialized() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);

        repo.create(NewUser {
            username: "root",
            email: "root@example.com",
            password_hash: "h",
            roles: &[Role::User, Role::Admin],
        })
        .unwrap();
        repo.create(new_user("plain", "plain@example.com", "h")).unwrap();

        let users = repo.list_all().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].roles, BTreeSet::from([Role::User, Role::Admin]));
        assert_eq!(users[1].roles, BTreeSet::from([Role::User]));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("password", TEST_COST).unwrap();
        assert_ne!(hash, "password");
        assert!(verify_password("password", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn debug_output_hides_hash() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);
        let user = repo
            .create(new_user("carol", "carol@example.com", "$2b$04$secret"))
            .unwrap();
        assert!(!format!("{user:?}").contains("secret"));
    }
}
