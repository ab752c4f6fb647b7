// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Store Auth Server - JWT authentication service
//!
//! Username/password accounts, short-lived HS512 access tokens, one
//! persisted refresh token per user and a path-based role gate in front of
//! the REST API.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token issuing, refresh tokens, middleware and access policy
//! - `config` - Environment-driven configuration
//! - `storage` - Credential store (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
