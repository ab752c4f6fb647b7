// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! The extractors only read what [`authenticate`](super::middleware::authenticate)
//! left in the request extensions; they never look at headers themselves.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, AuthenticatedUser};

/// Extractor for authenticated users.
///
/// Rejects with 401 when the request is anonymous.
pub struct Auth(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Optional authentication extractor.
///
/// Yields `None` for anonymous requests instead of rejecting.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl<S: Send + Sync> FromRequestParts<S> for OptionalAuth {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(parts.extensions.get::<AuthenticatedUser>().cloned()))
    }
}

/// Extractor that requires admin role.
pub struct AdminOnly(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(AdminOnly(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use axum::http::Request;

    fn parts_with(user: Option<AuthenticatedUser>) -> Parts {
        let mut parts = Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        if let Some(user) = user {
            parts.extensions.insert(user);
        }
        parts
    }

    fn user(roles: &[Role]) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: 7,
            username: "testuser".to_string(),
            email: "test@example.com".to_string(),
            roles: roles.to_vec(),
        }
    }

    #[tokio::test]
    async fn auth_requires_identity() {
        let mut parts = parts_with(None);
        let result = Auth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));
    }

    #[tokio::test]
    async fn auth_reads_extensions() {
        let mut parts = parts_with(Some(user(&[Role::User])));
        let Auth(found) = Auth::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(found.username, "testuser");
    }

    #[tokio::test]
    async fn admin_only_rejects_non_admin() {
        let mut parts = parts_with(Some(user(&[Role::User])));
        let result = AdminOnly::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));

        let mut parts = parts_with(Some(user(&[Role::Admin])));
        assert!(AdminOnly::from_request_parts(&mut parts, &()).await.is_ok());
    }

    #[tokio::test]
    async fn optional_auth_never_rejects() {
        let mut parts = parts_with(None);
        let OptionalAuth(found) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(found.is_none());

        let mut parts = parts_with(Some(user(&[Role::User])));
        let OptionalAuth(found) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(found.map(|u| u.user_id), Some(7));
    }
}
