// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints.
//!
//! These endpoints require the Admin role. The access policy already guards
//! `/api/admin`; the [`AdminOnly`] extractor checks again at the handler.

use axum::{extract::State, Json};

use crate::{
    auth::{AdminOnly, AuthError},
    error::ApiError,
    models::UserSummary,
    state::AppState,
    storage::{StoredUser, UserRepository},
};

impl From<StoredUser> for UserSummary {
    fn from(user: StoredUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            roles: user.roles.into_iter().collect(),
        }
    }
}

/// List all registered users.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All users", body = Vec<UserSummary>),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Forbidden - admin role required"),
    )
)]
pub async fn list_users(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let users = UserRepository::new(&state.db)
        .list_all()
        .map_err(AuthError::from)?;

    tracing::debug!(admin = %admin.username, count = users.len(), "Listed users");
    Ok(Json(users.into_iter().map(UserSummary::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::auth::Role;
    use crate::config::SeedAdmin;
    use crate::state::test_state;
    use crate::storage::NewUser;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn get_users(state: &AppState, token: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().uri("/api/admin/users");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = router(state.clone())
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn seed(state: &AppState) {
        state
            .seed_admin(&SeedAdmin {
                username: "root".to_string(),
                email: "root@example.com".to_string(),
                password: "rootpass".to_string(),
            })
            .unwrap();
        UserRepository::new(&state.db)
            .create(NewUser {
                username: "bob",
                email: "bob@example.com",
                password_hash: "$2b$04$hash",
                roles: &[Role::User],
            })
            .unwrap();
    }

    #[tokio::test]
    async fn admin_lists_users() {
        let (state, _dir) = test_state();
        seed(&state);
        let token = state.tokens.issue("root").unwrap();

        let (status, body) = get_users(&state, Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0]["username"], "root");
        assert_eq!(users[1]["roles"], serde_json::json!(["ROLE_USER"]));
        assert!(users[0].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn user_token_is_forbidden() {
        let (state, _dir) = test_state();
        seed(&state);
        let token = state.tokens.issue("bob").unwrap();

        let (status, body) = get_users(&state, Some(&token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "insufficient_permissions");
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let (state, _dir) = test_state();
        let (status, body) = get_users(&state, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "unauthenticated");
    }
}
