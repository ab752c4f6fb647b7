// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization middleware for Axum.
//!
//! Two layers wrap the router:
//!
//! - [`authenticate`] runs first. It turns a valid bearer token into an
//!   [`AuthenticatedUser`] stored in the request extensions and never rejects:
//!   anything that goes wrong leaves the request anonymous.
//! - [`authorize`] runs second. It applies the [`AccessPolicy`](super::AccessPolicy)
//!   to the request path and the identity (if any) and answers 401/403 before
//!   the handler is reached.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .merge(routes)
//!     .layer(from_fn_with_state(state.clone(), authorize))
//!     .layer(from_fn_with_state(state.clone(), authenticate))
//!     .with_state(state);
//! ```

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::policy::Decision;
use super::{AuthError, AuthenticatedUser};
use crate::state::AppState;
use crate::storage::UserRepository;

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// Returns `None` for a missing header, another scheme or an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Attach the caller's identity to the request if it presents a valid token.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        match resolve_user(&state, token) {
            Ok(Some(user)) => {
                request.extensions_mut().insert(user);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, "Cannot set user authentication");
            }
        }
    }
    next.run(request).await
}

/// Reject requests the access policy does not permit.
pub async fn authorize(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let decision = state
        .policy
        .evaluate(request.uri().path(), request.extensions().get::<AuthenticatedUser>());

    match decision {
        Decision::Permit => next.run(request).await,
        Decision::Unauthenticated => {
            tracing::debug!(path = %request.uri().path(), "Unauthorized request");
            AuthError::Unauthenticated.into_response()
        }
        Decision::Forbidden => {
            tracing::debug!(path = %request.uri().path(), "Forbidden request");
            AuthError::InsufficientPermissions.into_response()
        }
    }
}

/// `Ok(None)` for an invalid token; `Err` when a valid token cannot be
/// turned into a user.
fn resolve_user(state: &AppState, token: &str) -> Result<Option<AuthenticatedUser>, AuthError> {
    let Some(claims) = state.tokens.valid_claims(token) else {
        return Ok(None);
    };
    let username = claims.sub;

    let user = UserRepository::new(&state.db)
        .find_by_username(&username)?
        .ok_or_else(|| AuthError::Internal(format!("User Not Found with username: {username}")))?;

    Ok(Some(AuthenticatedUser::from(user)))
}
