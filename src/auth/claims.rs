// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authenticated identity attached to a request.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;
use crate::storage::StoredUser;

/// Authenticated user information materialized from the credential store.
///
/// The authentication filter builds one per request from the bearer token's
/// subject and stores it in the request extensions. It never outlives the
/// request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Numeric user id
    pub user_id: u64,

    /// Unique username (the token subject)
    pub username: String,

    /// Email address
    pub email: String,

    /// Granted roles
    pub roles: Vec<Role>,
}

impl AuthenticatedUser {
    /// Check if the user holds the given role.
    pub fn has_role(&self, required: Role) -> bool {
        self.roles.contains(&required)
    }

    /// Check if the user holds any of the given roles.
    pub fn has_any_role(&self, required: &[Role]) -> bool {
        required.iter().any(|role| self.has_role(*role))
    }

    /// Check if this user is an admin.
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

impl From<StoredUser> for AuthenticatedUser {
    fn from(user: StoredUser) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            email: user.email,
            roles: user.roles.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn stored(roles: &[Role]) -> StoredUser {
        StoredUser {
            id: 42,
            username: "testuser".to_string(),
            email: "test@example.com".to_string(),
            password_hash: "$2b$04$hash".to_string(),
            roles: roles.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn from_stored_user_copies_identity() {
        let user = AuthenticatedUser::from(stored(&[Role::User]));
        assert_eq!(user.user_id, 42);
        assert_eq!(user.username, "testuser");
        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.roles, vec![Role::User]);
    }

    #[test]
    fn has_role_is_exact() {
        let admin_only = AuthenticatedUser::from(stored(&[Role::Admin]));
        assert!(admin_only.is_admin());
        assert!(!admin_only.has_role(Role::User));

        let both = AuthenticatedUser::from(stored(&[Role::User, Role::Admin]));
        assert!(both.has_any_role(&[Role::User]));
        assert!(both.has_any_role(&[Role::Admin]));
    }

    #[test]
    fn serialization_omits_password() {
        let user = AuthenticatedUser::from(stored(&[Role::User]));
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("hash"));
        assert!(json.contains("ROLE_USER"));
    }
}
