// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. All types derive `Serialize`,
//! `Deserialize`, and `ToSchema` for JSON handling and OpenAPI documentation.
//! Field names are camelCase on the wire.
//!
//! ## Model Categories
//!
//! - **Sign-up / Sign-in**: credentials in, tokens out
//! - **Token refresh**: refresh token in, new access token out
//! - **Messages**: plain `{message}` bodies shared by several endpoints
//! - **Users**: admin listing

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;

/// Token type reported alongside every access token.
pub const TOKEN_TYPE: &str = "Bearer";

pub const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=20;
pub const EMAIL_MAX_LEN: usize = 50;
pub const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 6..=40;

// =============================================================================
// Sign-up / Sign-in Models
// =============================================================================

/// Request to register a new user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    /// Unique username (3 to 20 characters).
    pub username: String,
    /// Unique email address (at most 50 characters).
    pub email: String,
    /// Plaintext password (6 to 40 characters). Only its hash is stored.
    pub password: String,
}

impl SignUpRequest {
    /// Check field lengths and email shape. The error names the first bad field.
    pub fn validate(&self) -> Result<(), String> {
        let username_len = self.username.trim().chars().count();
        if !USERNAME_LEN.contains(&username_len) {
            return Err(format!(
                "username must be between {} and {} characters",
                USERNAME_LEN.start(),
                USERNAME_LEN.end()
            ));
        }

        let email = self.email.trim();
        if email.is_empty() || email.chars().count() > EMAIL_MAX_LEN || !email.contains('@') {
            return Err(format!(
                "email must be a valid address of at most {EMAIL_MAX_LEN} characters"
            ));
        }

        let password_len = self.password.chars().count();
        if !PASSWORD_LEN.contains(&password_len) {
            return Err(format!(
                "password must be between {} and {} characters",
                PASSWORD_LEN.start(),
                PASSWORD_LEN.end()
            ));
        }
        Ok(())
    }
}

/// Request to sign in with username and password.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    /// Signed access token (JWT).
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Opaque refresh token.
    pub refresh_token: String,
    pub username: String,
    pub email: String,
    /// Role authority names, e.g. `ROLE_USER`.
    pub roles: Vec<Role>,
}

// =============================================================================
// Token Refresh Models
// =============================================================================

/// Request to exchange a refresh token for a new access token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenRefreshRequest {
    pub refresh_token: String,
}

/// New access token; the refresh token is echoed back unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: String,
}

impl TokenRefreshResponse {
    pub fn new(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            token_type: TOKEN_TYPE.to_string(),
            refresh_token,
        }
    }
}

// =============================================================================
// Message Models
// =============================================================================

/// Plain message body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// User Models
// =============================================================================

/// A registered user as seen by administrators.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserSummary {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub roles: Vec<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_up(username: &str, email: &str, password: &str) -> SignUpRequest {
        SignUpRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn sign_up_validation_bounds() {
        assert!(sign_up("bob", "bob@example.com", "secret").validate().is_ok());
        assert!(sign_up("bo", "bob@example.com", "secret").validate().is_err());
        assert!(sign_up(&"b".repeat(21), "bob@example.com", "secret")
            .validate()
            .is_err());
        assert!(sign_up("bob", "not-an-email", "secret").validate().is_err());
        assert!(sign_up("bob", &format!("{}@x.io", "a".repeat(46)), "secret")
            .validate()
            .is_err());
        assert!(sign_up("bob", "bob@example.com", "12345").validate().is_err());
        assert!(sign_up("bob", "bob@example.com", &"p".repeat(41))
            .validate()
            .is_err());
    }

    #[test]
    fn sign_in_response_uses_camel_case() {
        let response = SignInResponse {
            access_token: "a".to_string(),
            token_type: TOKEN_TYPE.to_string(),
            refresh_token: "r".to_string(),
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            roles: vec![Role::User],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["accessToken"], "a");
        assert_eq!(json["tokenType"], "Bearer");
        assert_eq!(json["refreshToken"], "r");
        assert_eq!(json["roles"][0], "ROLE_USER");
    }

    #[test]
    fn sign_in_debug_hides_password() {
        let request = SignInRequest {
            username: "bob".to_string(),
            password: "hunter22".to_string(),
        };
        assert!(!format!("{request:?}").contains("hunter22"));
    }
}
