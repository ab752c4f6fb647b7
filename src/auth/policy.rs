// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path-based authorization policy.
//!
//! The policy is a static table of path prefixes and the access each one
//! requires. It is evaluated once per request, after authentication, and
//! holds no state of its own.
//!
//! | Prefix | Access |
//! |---|---|
//! | `/auth`, `/api/anon`, `/health`, `/docs`, `/api-doc` | public |
//! | `/api/user` | `ROLE_USER` |
//! | `/api/admin` | `ROLE_ADMIN` |
//! | anything else | any authenticated user |

use super::{AuthenticatedUser, Role};

/// Access required by a path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// No identity needed
    Public,
    /// Any authenticated user
    Authenticated,
    /// An authenticated user holding at least one of the roles
    AnyRole(Vec<Role>),
}

/// A single policy entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub prefix: String,
    pub access: Access,
}

impl Rule {
    pub fn new(prefix: impl Into<String>, access: Access) -> Self {
        Self {
            prefix: prefix.into(),
            access,
        }
    }

    /// Whether `path` lies under this rule's prefix, segment by segment.
    fn matches(&self, path: &str) -> bool {
        let prefix = self.prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return true;
        }
        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Outcome of evaluating the policy for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permit,
    /// Identity required but absent (401)
    Unauthenticated,
    /// Identity present but lacking the role (403)
    Forbidden,
}

/// Ordered collection of rules with a fallback for unmatched paths.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<Rule>,
    fallback: Access,
}

impl AccessPolicy {
    pub fn new(rules: Vec<Rule>, fallback: Access) -> Self {
        Self { rules, fallback }
    }

    /// The table the server runs with.
    pub fn standard() -> Self {
        Self::new(
            vec![
                Rule::new("/auth", Access::Public),
                Rule::new("/api/anon", Access::Public),
                Rule::new("/health", Access::Public),
                Rule::new("/docs", Access::Public),
                Rule::new("/api-doc", Access::Public),
                Rule::new("/api/user", Access::AnyRole(vec![Role::User])),
                Rule::new("/api/admin", Access::AnyRole(vec![Role::Admin])),
            ],
            Access::Authenticated,
        )
    }

    /// Access required for `path`. The longest matching prefix wins.
    pub fn access_for(&self, path: &str) -> &Access {
        self.rules
            .iter()
            .filter(|rule| rule.matches(path))
            .max_by_key(|rule| rule.prefix.trim_end_matches('/').len())
            .map(|rule| &rule.access)
            .unwrap_or(&self.fallback)
    }

    /// Decide whether a request for `path` by `user` may proceed.
    pub fn evaluate(&self, path: &str, user: Option<&AuthenticatedUser>) -> Decision {
        match (self.access_for(path), user) {
            (Access::Public, _) => Decision::Permit,
            (_, None) => Decision::Unauthenticated,
            (Access::Authenticated, Some(_)) => Decision::Permit,
            (Access::AnyRole(roles), Some(user)) => {
                if user.has_any_role(roles) {
                    Decision::Permit
                } else {
                    Decision::Forbidden
                }
            }
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::standard()
    }
}
