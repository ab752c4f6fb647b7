// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{HeaderName, Method, StatusCode},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        middleware::{authenticate, authorize},
        AuthenticatedUser, Role,
    },
    models::{
        Message, SignInRequest, SignInResponse, SignUpRequest, TokenRefreshRequest,
        TokenRefreshResponse, UserSummary,
    },
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod echo;
pub mod health;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/sign-up", post(auth::sign_up))
        .route("/sign-in", post(auth::sign_in))
        .route("/token-refresh", post(auth::token_refresh))
        .route("/sign-out", post(auth::sign_out));

    let api_routes = Router::new()
        .route("/user/echo", post(echo::echo))
        .route("/admin/users", get(admin::list_users));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let cors_disable = state.config.cors_disable;

    let app = Router::new()
        .nest("/auth", auth_routes)
        .nest("/api", api_routes)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback(|| async { StatusCode::NOT_FOUND })
        .layer(from_fn_with_state(state.clone(), authorize))
        .layer(from_fn_with_state(state.clone(), authenticate))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .with_state(state);

    if cors_disable {
        app.layer(cors_layer())
    } else {
        app
    }
}

/// Relaxed cross-origin policy used when `CORS_DISABLE=true`.
fn cors_layer() -> CorsLayer {
    tracing::warn!("CORS_DISABLE set, allowing any origin");
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::HEAD,
            Method::GET,
            Method::PUT,
            Method::POST,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers(Any)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::sign_up,
        auth::sign_in,
        auth::token_refresh,
        auth::sign_out,
        echo::echo,
        admin::list_users,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            SignUpRequest,
            SignInRequest,
            SignInResponse,
            TokenRefreshRequest,
            TokenRefreshResponse,
            Message,
            UserSummary,
            AuthenticatedUser,
            Role,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Sign-up, sign-in and token refresh"),
        (name = "User", description = "Endpoints for ROLE_USER"),
        (name = "Admin", description = "Endpoints for ROLE_ADMIN"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

/// Registers the `bearer` scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
