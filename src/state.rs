// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::{Arc, OnceLock};

use crate::auth::{AccessPolicy, AuthError, RefreshTokenManager, Role, TokenIssuer};
use crate::config::{AppConfig, SeedAdmin};
use crate::storage::{hash_password, AuthDatabase, NewUser, UserRepository};

/// Password behind [`AppState::dummy_password_hash`]. Never assigned to a user.
const DUMMY_PASSWORD: &str = "dummy-password-for-unknown-users";

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<AuthDatabase>,
    pub tokens: Arc<TokenIssuer>,
    pub refresh_tokens: Arc<RefreshTokenManager>,
    pub policy: Arc<AccessPolicy>,
    pub config: Arc<AppConfig>,
    dummy_password_hash: Arc<OnceLock<String>>,
}

impl AppState {
    pub fn new(db: AuthDatabase, config: AppConfig) -> Self {
        let db = Arc::new(db);
        let tokens = TokenIssuer::new(config.jwt_secret.as_bytes(), config.access_token_ttl);
        let refresh_tokens = RefreshTokenManager::new(db.clone(), config.refresh_token_ttl);

        Self {
            db,
            tokens: Arc::new(tokens),
            refresh_tokens: Arc::new(refresh_tokens),
            policy: Arc::new(AccessPolicy::standard()),
            config: Arc::new(config),
            dummy_password_hash: Arc::new(OnceLock::new()),
        }
    }

    /// Bcrypt hash at the configured cost that sign-in verifies against when
    /// the username is unknown. Computed on first use; call it off the async
    /// runtime.
    pub fn dummy_password_hash(&self) -> Result<&str, bcrypt::BcryptError> {
        if let Some(hash) = self.dummy_password_hash.get() {
            return Ok(hash.as_str());
        }
        let hash = hash_password(DUMMY_PASSWORD, self.config.bcrypt_cost)?;
        Ok(self.dummy_password_hash.get_or_init(|| hash).as_str())
    }

    /// Create the configured admin account unless the username is taken.
    ///
    /// Returns whether a user was created.
    pub fn seed_admin(&self, seed: &SeedAdmin) -> Result<bool, AuthError> {
        let users = UserRepository::new(&self.db);
        if users.exists_by_username(&seed.username)? {
            tracing::info!(username = %seed.username, "Seed admin already present");
            return Ok(false);
        }

        let password_hash = hash_password(&seed.password, self.config.bcrypt_cost)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let user = users.create(NewUser {
            username: &seed.username,
            email: &seed.email,
            password_hash: &password_hash,
            roles: &[Role::User, Role::Admin],
        })?;
        tracing::info!(user_id = user.id, username = %user.username, "Seed admin created");
        Ok(true)
    }
}

/// State backed by a fresh database in a temporary directory, with the
/// cheapest bcrypt cost.
#[cfg(test)]
pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
    test_state_with_cost(4)
}

#[cfg(test)]
pub(crate) fn test_state_with_cost(bcrypt_cost: u32) -> (AppState, tempfile::TempDir) {
    use crate::config::{Environment, BCRYPT_COST_ENV, DATA_DIR_ENV, JWT_SECRET_ENV};

    let dir = tempfile::tempdir().unwrap();
    let env = Environment::isolated()
        .with_override(
            JWT_SECRET_ENV,
            "test-secret-that-is-long-enough-for-hs512-signing-0123456789abcdef",
        )
        .with_override(BCRYPT_COST_ENV, bcrypt_cost.to_string())
        .with_override(DATA_DIR_ENV, dir.path().to_string_lossy());
    let config = AppConfig::from_environment(&env).unwrap();
    let db = AuthDatabase::open(&config.database_path()).unwrap();
    (AppState::new(db, config), dir)
}
