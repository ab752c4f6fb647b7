// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::storage::StoreError;

/// Authentication error type.
///
/// Every failure of the sign-up, sign-in, refresh and authorization paths
/// maps onto one of these. Invalid access tokens of any kind surface only as
/// `Unauthenticated`; the precise cause stays in the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Sign-up with a username that already exists
    DuplicateUsername,
    /// Sign-up with an email that already exists
    DuplicateEmail,
    /// Unknown user or wrong password (deliberately indistinguishable)
    BadCredentials,
    /// No valid access token where one is required
    Unauthenticated,
    /// Authenticated but lacking the required role
    InsufficientPermissions,
    /// Refresh token past its expiry; the row has been deleted
    TokenExpired { token: String },
    /// Refresh token not found
    InvalidRefreshToken { token: String },
    /// Internal error
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    status: u16,
    error: String,
    message: String,
    error_code: &'static str,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::DuplicateUsername => "duplicate_username",
            AuthError::DuplicateEmail => "duplicate_email",
            AuthError::BadCredentials => "bad_credentials",
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::InsufficientPermissions => "insufficient_permissions",
            AuthError::TokenExpired { .. } => "refresh_token_expired",
            AuthError::InvalidRefreshToken { .. } => "invalid_refresh_token",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::DuplicateUsername | AuthError::DuplicateEmail => StatusCode::BAD_REQUEST,
            AuthError::BadCredentials | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions
            | AuthError::TokenExpired { .. }
            | AuthError::InvalidRefreshToken { .. } => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::DuplicateUsername => write!(f, "Username is already taken."),
            AuthError::DuplicateEmail => write!(f, "Email is already in use."),
            AuthError::BadCredentials => write!(f, "Bad credentials"),
            AuthError::Unauthenticated => {
                write!(f, "Full authentication is required to access this resource")
            }
            AuthError::InsufficientPermissions => {
                write!(f, "Insufficient permissions for this operation")
            }
            AuthError::TokenExpired { token } => write!(
                f,
                "Failed for [{token}]: Refresh token expired. Please sign in again."
            ),
            AuthError::InvalidRefreshToken { token } => {
                write!(f, "Failed for [{token}]: Invalid refresh token.")
            }
            AuthError::Internal(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername => AuthError::DuplicateUsername,
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            other => AuthError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let AuthError::Internal(msg) = &self {
            tracing::error!(error = %msg, "Authentication failed internally");
        }
        let message = self.to_string();
        let body = Json(AuthErrorBody {
            status: status.as_u16(),
            error: message.clone(),
            message,
            error_code: self.error_code(),
        });
        (status, body).into_response()
    }
}
