// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is resolved once at startup into an [`AppConfig`]. Values are
//! looked up through an [`Environment`], which consults explicit overrides
//! first, then the process environment, and finally falls back to the default.
//! Tests build an isolated `Environment` so nothing leaks in from the host.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the auth database | `./data` |
//! | `JWT_SECRET_KEY` | HS512 signing secret for access tokens | Required |
//! | `JWT_EXPIRATION_MS` | Access token lifetime in milliseconds | `3600000` |
//! | `JWT_REFRESH_EXPIRATION_MS` | Refresh token lifetime in milliseconds | `86400000` |
//! | `CORS_DISABLE` | `true` relaxes cross-origin restrictions | `false` |
//! | `BCRYPT_COST` | bcrypt work factor (4-31) | `12` |
//! | `TLS_CERT_PATH` | PEM certificate chain (HTTPS when set with key) | Optional |
//! | `TLS_KEY_PATH` | PEM private key | Optional |
//! | `SEED_ADMIN_USERNAME` | Admin account created at startup if absent | Optional |
//! | `SEED_ADMIN_EMAIL` | Email for the seeded admin | Optional |
//! | `SEED_ADMIN_PASSWORD` | Password for the seeded admin | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Directory that holds `auth.redb`.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const JWT_SECRET_ENV: &str = "JWT_SECRET_KEY";
pub const JWT_EXPIRATION_ENV: &str = "JWT_EXPIRATION_MS";
pub const JWT_REFRESH_EXPIRATION_ENV: &str = "JWT_REFRESH_EXPIRATION_MS";
pub const CORS_DISABLE_ENV: &str = "CORS_DISABLE";
pub const BCRYPT_COST_ENV: &str = "BCRYPT_COST";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const SEED_ADMIN_USERNAME_ENV: &str = "SEED_ADMIN_USERNAME";
pub const SEED_ADMIN_EMAIL_ENV: &str = "SEED_ADMIN_EMAIL";
pub const SEED_ADMIN_PASSWORD_ENV: &str = "SEED_ADMIN_PASSWORD";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_ACCESS_TOKEN_TTL_MS: i64 = 3_600_000;
pub const DEFAULT_REFRESH_TOKEN_TTL_MS: i64 = 86_400_000;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// HMAC-SHA512 keys shorter than the digest size weaken the signature.
pub const RECOMMENDED_SECRET_LEN: usize = 64;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Key/value lookup used to resolve configuration.
///
/// Resolution order is explicit overrides, then (unless isolated) the process
/// environment. Callers supply the default.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    overrides: HashMap<String, String>,
    isolated: bool,
}

impl Environment {
    /// Environment backed by the real process environment.
    pub fn system() -> Self {
        Self::default()
    }

    /// Environment that never reads the process environment.
    pub fn isolated() -> Self {
        Self {
            overrides: HashMap::new(),
            isolated: true,
        }
    }

    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.overrides.get(key) {
            return Some(value.clone());
        }
        if self.isolated {
            return None;
        }
        std::env::var(key).ok()
    }

    /// Non-empty value or `None`.
    fn get_set(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    fn parse_or<T: std::str::FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get_set(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key, value: raw }),
            None => Ok(default),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Admin account to create at startup when it does not exist yet.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Fully resolved application configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub cors_disable: bool,
    pub bcrypt_cost: u32,
    pub tls: Option<TlsPaths>,
    pub seed_admin: Option<SeedAdmin>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("data_dir", &self.data_dir)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("cors_disable", &self.cors_disable)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("tls", &self.tls)
            .field("seed_admin", &self.seed_admin)
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_environment(env: &Environment) -> Result<Self, ConfigError> {
        let jwt_secret = env
            .get_set(JWT_SECRET_ENV)
            .ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;

        let access_ms: i64 = env.parse_or(JWT_EXPIRATION_ENV, DEFAULT_ACCESS_TOKEN_TTL_MS)?;
        if access_ms <= 0 {
            return Err(ConfigError::Invalid {
                key: JWT_EXPIRATION_ENV,
                value: access_ms.to_string(),
            });
        }

        let refresh_ms: i64 =
            env.parse_or(JWT_REFRESH_EXPIRATION_ENV, DEFAULT_REFRESH_TOKEN_TTL_MS)?;
        if refresh_ms <= 0 {
            return Err(ConfigError::Invalid {
                key: JWT_REFRESH_EXPIRATION_ENV,
                value: refresh_ms.to_string(),
            });
        }

        let bcrypt_cost: u32 = env.parse_or(BCRYPT_COST_ENV, bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: BCRYPT_COST_ENV,
                value: bcrypt_cost.to_string(),
            });
        }

        let cors_disable = env
            .get_set(CORS_DISABLE_ENV)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let tls = match (env.get_set(TLS_CERT_PATH_ENV), env.get_set(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        let seed_admin = match env.get_set(SEED_ADMIN_USERNAME_ENV) {
            Some(username) => Some(SeedAdmin {
                username,
                email: env
                    .get_set(SEED_ADMIN_EMAIL_ENV)
                    .ok_or(ConfigError::Missing(SEED_ADMIN_EMAIL_ENV))?,
                password: env
                    .get_set(SEED_ADMIN_PASSWORD_ENV)
                    .ok_or(ConfigError::Missing(SEED_ADMIN_PASSWORD_ENV))?,
            }),
            None => None,
        };

        let log_format = match env.get_set(LOG_FORMAT_ENV) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(v) if v.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            Some(v) => {
                return Err(ConfigError::Invalid {
                    key: LOG_FORMAT_ENV,
                    value: v,
                })
            }
            None => LogFormat::Pretty,
        };

        Ok(Self {
            host: env.get_set(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: env.parse_or(PORT_ENV, DEFAULT_PORT)?,
            data_dir: PathBuf::from(
                env.get_set(DATA_DIR_ENV)
                    .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            ),
            jwt_secret,
            access_token_ttl: Duration::milliseconds(access_ms),
            refresh_token_ttl: Duration::milliseconds(refresh_ms),
            cors_disable,
            bcrypt_cost,
            tls,
            seed_admin,
            log_format,
        })
    }

    /// Path of the redb database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("auth.redb")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
