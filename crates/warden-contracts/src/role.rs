//! Known roles, actions, and resource tokens.
//!
//! Roles are flat: there is no inheritance between them. A resource token
//! names an object class paired with an action, e.g. `"product:create"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WardenError;

/// The closed set of roles the system recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::User];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| WardenError::RoleNotFound { role: s.to_string() })
    }
}

/// CRUD actions a resource token can pair with.
pub mod action {
    pub const CREATE: &str = "create";
    pub const READ: &str = "read";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
    pub const LIST: &str = "list";

    pub const ALL: [&str; 5] = [CREATE, READ, UPDATE, DELETE, LIST];
}

/// Protected object classes.
pub mod resource {
    pub const USER: &str = "user";
    pub const PRODUCT: &str = "product";
}

/// Build the resource token for `resource` and `action`, e.g. `product:read`.
pub fn resource_token(resource: &str, action: &str) -> String {
    format!("{resource}:{action}")
}
