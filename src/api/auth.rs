// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-up, sign-in, token refresh and sign-out endpoints.
//!
//! Everything under `/auth` is public; sign-out reads the caller's identity
//! if one was attached by the authentication middleware.

use axum::{extract::State, Json};

use crate::{
    auth::{AuthError, OptionalAuth, Role},
    error::ApiError,
    models::{
        Message, SignInRequest, SignInResponse, SignUpRequest, TokenRefreshRequest,
        TokenRefreshResponse, TOKEN_TYPE,
    },
    state::AppState,
    storage::{hash_password, verify_password, NewUser, UserRepository},
};

/// Register a new user with the `ROLE_USER` role.
///
/// No token is issued; the client signs in afterwards.
#[utoipa::path(
    post,
    path = "/auth/sign-up",
    tag = "Auth",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "User registered", body = Message),
        (status = 400, description = "Invalid input, username taken or email in use"),
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> Result<Json<Message>, ApiError> {
    request.validate().map_err(ApiError::bad_request)?;

    let username = request.username.trim().to_string();
    let email = request.email.trim().to_string();

    let users = UserRepository::new(&state.db);
    if users.exists_by_username(&username).map_err(AuthError::from)? {
        return Err(AuthError::DuplicateUsername.into());
    }
    if users.exists_by_email(&email).map_err(AuthError::from)? {
        return Err(AuthError::DuplicateEmail.into());
    }

    let cost = state.config.bcrypt_cost;
    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(|e| ApiError::internal(e.to_string()))?;

    // Uniqueness is checked again inside the insert transaction.
    let user = users
        .create(NewUser {
            username: &username,
            email: &email,
            password_hash: &password_hash,
            roles: &[Role::User],
        })
        .map_err(AuthError::from)?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");
    Ok(Json(Message::new("User registered successfully.")))
}

/// Authenticate with username and password.
///
/// Returns a new access token and rotates the user's refresh token.
#[utoipa::path(
    post,
    path = "/auth/sign-in",
    tag = "Auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 401, description = "Bad credentials"),
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<SignInResponse>, ApiError> {
    let user = UserRepository::new(&state.db)
        .find_by_username(&request.username)
        .map_err(AuthError::from)?;

    // An unknown username is checked against a dummy hash so both failures
    // cost one bcrypt verification.
    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let password = request.password;
    let verify_state = state.clone();
    let matches = tokio::task::spawn_blocking(move || match stored_hash {
        Some(hash) => verify_password(&password, &hash),
        None => verify_password(&password, verify_state.dummy_password_hash()?).map(|_| false),
    })
    .await
    .map_err(|e| ApiError::internal(e.to_string()))?
    .map_err(|e| ApiError::internal(e.to_string()))?;

    let user = match user {
        Some(user) if matches => user,
        Some(user) => {
            tracing::debug!(username = %user.username, "Sign-in with wrong password");
            return Err(AuthError::BadCredentials.into());
        }
        None => {
            tracing::debug!(username = %request.username, "Sign-in for unknown user");
            return Err(AuthError::BadCredentials.into());
        }
    };

    let access_token = state
        .tokens
        .issue(&user.username)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let refresh_token = state.refresh_tokens.create(&user.username)?;

    tracing::info!(user_id = user.id, "User signed in");
    Ok(Json(SignInResponse {
        access_token,
        token_type: TOKEN_TYPE.to_string(),
        refresh_token: refresh_token.token,
        username: user.username,
        email: user.email,
        roles: user.roles.into_iter().collect(),
    }))
}

/// Exchange a refresh token for a new access token.
///
/// The refresh token itself is returned unchanged. An expired token is
/// deleted and the user has to sign in again.
#[utoipa::path(
    post,
    path = "/auth/token-refresh",
    tag = "Auth",
    request_body = TokenRefreshRequest,
    responses(
        (status = 200, description = "New access token", body = TokenRefreshResponse),
        (status = 403, description = "Refresh token invalid or expired"),
    )
)]
pub async fn token_refresh(
    State(state): State<AppState>,
    Json(request): Json<TokenRefreshRequest>,
) -> Result<Json<TokenRefreshResponse>, ApiError> {
    let value = request.refresh_token;

    let stored = state
        .refresh_tokens
        .find_by_value(&value)?
        .ok_or_else(|| AuthError::InvalidRefreshToken {
            token: value.clone(),
        })?;
    let stored = state.refresh_tokens.verify_not_expired(stored)?;

    let user = UserRepository::new(&state.db)
        .find_by_id(stored.user_id)
        .map_err(AuthError::from)?
        .ok_or_else(|| AuthError::InvalidRefreshToken {
            token: value.clone(),
        })?;

    let access_token = state
        .tokens
        .issue(&user.username)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(TokenRefreshResponse::new(access_token, value)))
}

/// Sign out: drop the caller's refresh token if the request is authenticated.
///
/// Always succeeds.
#[utoipa::path(
    post,
    path = "/auth/sign-out",
    tag = "Auth",
    security((), ("bearer" = [])),
    responses(
        (status = 200, description = "Signed out", body = Message),
    )
)]
pub async fn sign_out(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Message>, ApiError> {
    if let Some(user) = user {
        let removed = state.refresh_tokens.delete_all_for_user(&user.username)?;
        tracing::info!(user_id = user.user_id, removed, "User signed out");
    }
    Ok(Json(Message::new("Logout successful.")))
}
