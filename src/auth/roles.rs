// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// Roles are flat: holding `Admin` does not imply `User`. An account that
/// should reach both namespaces is assigned both roles.
///
/// On the wire a role is its authority name (`ROLE_USER`, `ROLE_ADMIN`).
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
)]
pub enum Role {
    /// Regular signed-up user, granted at sign-up
    #[default]
    #[serde(rename = "ROLE_USER")]
    User,
    /// Administrator
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    /// Every role, in lookup-row order.
    pub const ALL: [Role; 2] = [Role::User, Role::Admin];

    /// Row id of the role in the `roles` table.
    pub fn id(&self) -> u32 {
        match self {
            Role::User => 1,
            Role::Admin => 2,
        }
    }

    pub fn from_id(id: u32) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.id() == id)
    }

    /// Authority name, as persisted and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
            Role::Admin => "ROLE_ADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
