// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::Json;

use crate::models::Message;

/// Echo the message back to the caller.
///
/// Requires the `ROLE_USER` role.
#[utoipa::path(
    post,
    path = "/api/user/echo",
    tag = "User",
    security(("bearer" = [])),
    request_body = Message,
    responses(
        (status = 200, description = "The same message", body = Message),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Forbidden - ROLE_USER required"),
    )
)]
pub async fn echo(Json(message): Json<Message>) -> Json<Message> {
    Json(message)
}
