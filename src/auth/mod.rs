// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Token-based authentication and path-based authorization for the store API.
//!
//! ## Auth Flow
//!
//! 1. Client signs in with username/password at `/auth/sign-in`
//! 2. Server returns a short-lived access token (HS512 JWT) and a
//!    long-lived refresh token persisted server-side
//! 3. Client sends `Authorization: Bearer <access token>`
//! 4. For every request the server:
//!    - Verifies the JWT signature and expiry (no database access)
//!    - Loads the user named by `sub` together with its roles
//!    - Applies the access policy for the request path
//! 5. When the access token expires the client exchanges the refresh token
//!    at `/auth/token-refresh`
//!
//! ## Security
//!
//! - Paths not listed in the policy require authentication
//! - Zero clock skew tolerance on access tokens
//! - At most one refresh token per user; sign-in rotates it
//! - Passwords are stored as bcrypt hashes only

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod policy;
pub mod refresh;
pub mod roles;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth, OptionalAuth};
pub use jwt::{TokenError, TokenIssuer};
pub use policy::{Access, AccessPolicy, Decision};
pub use refresh::RefreshTokenManager;
pub use roles::Role;
