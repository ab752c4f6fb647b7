// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token issuing and verification.
//!
//! Access tokens are HS512-signed JWTs carrying only `sub` (username), `iat`
//! and `exp`. They are never stored: a token is valid exactly when its
//! signature checks out against the server secret and `exp` has not passed.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

/// The only algorithm tokens are signed with or accepted in.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS512;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (username)
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
}

/// Why an access token was rejected.
///
/// Callers of [`TokenIssuer::validate`] only see a boolean; the variants exist
/// so each failure class is logged distinctly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid JWT signature")]
    InvalidSignature,

    #[error("malformed JWT: {0}")]
    Malformed(String),

    #[error("JWT has expired")]
    Expired,

    #[error("unsupported JWT algorithm")]
    UnsupportedAlgorithm,

    #[error("JWT claims are empty")]
    EmptyClaims,

    #[error("failed to sign JWT: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidAlgorithm => TokenError::UnsupportedAlgorithm,
            ErrorKind::MissingRequiredClaim(_) => TokenError::EmptyClaims,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Signs and verifies access tokens with a process-wide symmetric secret.
///
/// Immutable after construction; share it behind an `Arc`.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        // Strict expiry: no clock skew allowance.
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Lifetime of newly issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a signed access token for `username`.
    pub fn issue(&self, username: &str) -> Result<String, TokenError> {
        self.issue_at(username, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, username: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = AccessClaims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Decode and verify a token, reporting the precise failure.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        if token.trim().is_empty() {
            return Err(TokenError::EmptyClaims);
        }

        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)?;
        if data.claims.sub.is_empty() {
            return Err(TokenError::EmptyClaims);
        }
        Ok(data.claims)
    }

    /// Whether `token` carries a valid signature and has not expired.
    ///
    /// Never fails; the reason for a rejection is logged.
    pub fn validate(&self, token: &str) -> bool {
        self.valid_claims(token).is_some()
    }

    /// Claims of a valid token, or `None` with the rejection logged.
    pub fn valid_claims(&self, token: &str) -> Option<AccessClaims> {
        match self.verify(token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                match &e {
                    TokenError::InvalidSignature => tracing::warn!("Invalid JWT signature"),
                    TokenError::Malformed(detail) => tracing::warn!(%detail, "Invalid JWT token"),
                    TokenError::Expired => tracing::warn!("Expired JWT token"),
                    TokenError::UnsupportedAlgorithm => tracing::warn!("Unsupported JWT token"),
                    TokenError::EmptyClaims => tracing::warn!("JWT claims string is empty"),
                    TokenError::Encoding(detail) => tracing::warn!(%detail, "JWT error"),
                }
                None
            }
        }
    }

    /// Username carried by a token.
    ///
    /// Meant to be called after [`validate`](Self::validate); an invalid
    /// token yields the verification error.
    pub fn subject_of(&self, token: &str) -> Result<String, TokenError> {
        self.verify(token).map(|claims| claims.sub)
    }
}
