// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Refresh token lifecycle.
//!
//! A refresh token is an opaque random string that only means something
//! through a lookup in the `refreshtoken` table. Each user has at most one:
//! sign-in replaces it in place, sign-out deletes it, and an expired token is
//! deleted the first time someone tries to use it. There is no background
//! sweep.

use std::sync::Arc;

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};

use super::AuthError;
use crate::storage::{AuthDatabase, RefreshTokenRepository, StoredRefreshToken, UserRepository};

/// Random bytes per token value (256 bits).
const TOKEN_BYTES: usize = 32;

/// Sentinel returned by [`RefreshTokenManager::delete_all_for_user`] when the
/// user does not exist.
pub const NO_SUCH_USER: i64 = -1;

/// Creates, verifies and deletes refresh tokens. Sole writer of the
/// `refreshtoken` tables.
pub struct RefreshTokenManager {
    db: Arc<AuthDatabase>,
    ttl: Duration,
    rng: SystemRandom,
}

impl RefreshTokenManager {
    pub fn new(db: Arc<AuthDatabase>, ttl: Duration) -> Self {
        Self {
            db,
            ttl,
            rng: SystemRandom::new(),
        }
    }

    /// Create or rotate the refresh token of `username`.
    ///
    /// Reuses the user's existing row (same id) when there is one.
    pub fn create(&self, username: &str) -> Result<StoredRefreshToken, AuthError> {
        let user = UserRepository::new(&self.db)
            .find_by_username(username)?
            .ok_or_else(|| AuthError::Internal(format!("User not found: {username}")))?;

        let value = self.generate_value()?;
        let expiry_date = Utc::now() + self.ttl;

        let token =
            RefreshTokenRepository::new(&self.db).upsert_for_user(user.id, &value, expiry_date)?;
        tracing::debug!(user_id = user.id, token_id = token.id, "Refresh token issued");
        Ok(token)
    }

    /// Look up a token by its value. `None` means it was never issued or has
    /// been deleted.
    pub fn find_by_value(&self, token: &str) -> Result<Option<StoredRefreshToken>, AuthError> {
        Ok(RefreshTokenRepository::new(&self.db).find_by_token(token)?)
    }

    /// Pass the token through if it has not expired; otherwise delete it and
    /// fail with [`AuthError::TokenExpired`].
    pub fn verify_not_expired(
        &self,
        token: StoredRefreshToken,
    ) -> Result<StoredRefreshToken, AuthError> {
        self.verify_not_expired_at(token, Utc::now())
    }

    /// [`verify_not_expired`](Self::verify_not_expired) against an explicit
    /// clock. A token is expired from its expiry instant onwards.
    ///
    /// The row is only deleted if it still holds this token's value; a
    /// concurrent sign-in may have rotated it already.
    pub fn verify_not_expired_at(
        &self,
        token: StoredRefreshToken,
        now: DateTime<Utc>,
    ) -> Result<StoredRefreshToken, AuthError> {
        if now >= token.expiry_date {
            let deleted =
                RefreshTokenRepository::new(&self.db).delete_if_token(token.id, &token.token)?;
            tracing::info!(
                user_id = token.user_id,
                token_id = token.id,
                deleted,
                "Expired refresh token rejected"
            );
            return Err(AuthError::TokenExpired { token: token.token });
        }
        Ok(token)
    }

    /// Delete all refresh tokens of `username`.
    ///
    /// Returns the number of rows removed, or [`NO_SUCH_USER`] when the user
    /// does not exist.
    pub fn delete_all_for_user(&self, username: &str) -> Result<i64, AuthError> {
        let Some(user) = UserRepository::new(&self.db).find_by_username(username)? else {
            return Ok(NO_SUCH_USER);
        };
        let removed = RefreshTokenRepository::new(&self.db).delete_by_user(user.id)?;
        Ok(removed as i64)
    }

    fn generate_value(&self) -> Result<String, AuthError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AuthError::Internal("system random source failed".to_string()))?;
        Ok(Base64UrlUnpadded::encode_string(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::storage::database::temp_db;
    use crate::storage::NewUser;

    fn manager_with_user(ttl: Duration) -> (RefreshTokenManager, tempfile::TempDir) {
        let (db, dir) = temp_db();
        UserRepository::new(&db)
            .create(NewUser {
                username: "testuser",
                email: "test@example.com",
                password_hash: "$2b$04$hash",
                roles: &[Role::User],
            })
            .unwrap();
        (RefreshTokenManager::new(Arc::new(db), ttl), dir)
    }

    #[test]
    fn create_sets_value_and_expiry() {
        let (manager, _dir) = manager_with_user(Duration::hours(24));
        let before = Utc::now();
        let token = manager.create("testuser").unwrap();

        assert_eq!(token.user_id, 1);
        // 32 bytes -> 43 base64url characters without padding
        assert_eq!(token.token.len(), 43);
        assert!(token.expiry_date >= before + Duration::hours(24));
        assert!(token.expiry_date <= Utc::now() + Duration::hours(24));
    }

    #[test]
    fn create_twice_keeps_single_row() {
        let (manager, _dir) = manager_with_user(Duration::hours(1));
        let first = manager.create("testuser").unwrap();
        let second = manager.create("testuser").unwrap();

        assert_eq!(first.id, second.id);
        assert_ne!(first.token, second.token);
        assert!(manager.find_by_value(&first.token).unwrap().is_none());
        assert_eq!(manager.find_by_value(&second.token).unwrap(), Some(second));
        assert_eq!(
            RefreshTokenRepository::new(&manager.db).count().unwrap(),
            1
        );
    }

    #[test]
    fn create_for_unknown_user_fails() {
        let (manager, _dir) = manager_with_user(Duration::hours(1));
        assert!(matches!(
            manager.create("ghost"),
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn find_unknown_value_is_none() {
        let (manager, _dir) = manager_with_user(Duration::hours(1));
        assert!(manager.find_by_value("never-issued").unwrap().is_none());
    }

    #[test]
    fn valid_token_passes_unchanged() {
        let (manager, _dir) = manager_with_user(Duration::seconds(10));
        let token = manager.create("testuser").unwrap();
        assert_eq!(manager.verify_not_expired(token.clone()).unwrap(), token);
    }

    #[test]
    fn expiry_instant_counts_as_expired() {
        let (manager, _dir) = manager_with_user(Duration::hours(1));
        let token = manager.create("testuser").unwrap();

        let just_before = token.expiry_date - Duration::milliseconds(1);
        assert!(manager
            .verify_not_expired_at(token.clone(), just_before)
            .is_ok());

        let result = manager.verify_not_expired_at(token.clone(), token.expiry_date);
        assert_eq!(
            result,
            Err(AuthError::TokenExpired {
                token: token.token.clone()
            })
        );
        assert!(manager.find_by_value(&token.token).unwrap().is_none());
    }

    #[test]
    fn expired_token_is_deleted() {
        let (manager, _dir) = manager_with_user(Duration::hours(1));
        let token = manager.create("testuser").unwrap();

        let later = token.expiry_date + Duration::seconds(10);
        assert!(manager.verify_not_expired_at(token.clone(), later).is_err());
        assert!(manager.find_by_value(&token.token).unwrap().is_none());
    }

    #[test]
    fn stale_expiry_keeps_rotated_token() {
        let (manager, _dir) = manager_with_user(Duration::hours(1));
        let old = manager.create("testuser").unwrap();
        let fresh = manager.create("testuser").unwrap();

        let later = old.expiry_date + Duration::seconds(1);
        assert_eq!(
            manager.verify_not_expired_at(old.clone(), later),
            Err(AuthError::TokenExpired { token: old.token })
        );
        assert_eq!(manager.find_by_value(&fresh.token).unwrap(), Some(fresh));
    }

    #[test]
    fn delete_all_distinguishes_missing_user() {
        let (manager, _dir) = manager_with_user(Duration::hours(1));
        assert_eq!(manager.delete_all_for_user("ghost").unwrap(), NO_SUCH_USER);
        assert_eq!(manager.delete_all_for_user("testuser").unwrap(), 0);

        let token = manager.create("testuser").unwrap();
        assert_eq!(manager.delete_all_for_user("testuser").unwrap(), 1);
        assert!(manager.find_by_value(&token.token).unwrap().is_none());
    }
}
