use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RoleParseError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_ADVISOR: &str = "advisor";
pub const ROLE_ENTREPRENEUR: &str = "entrepreneur";
pub const ROLE_SUPPLIER: &str = "supplier";

/// Roles assigned by the backend's authorization data. Read-only here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Advisor,
    Entrepreneur,
    Supplier,
}

/// Highest priority first.
pub const ROLE_PRIORITY: &[Role] = &[Role::Admin, Role::Advisor, Role::Entrepreneur, Role::Supplier];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::Advisor => ROLE_ADVISOR,
            Role::Entrepreneur => ROLE_ENTREPRENEUR,
            Role::Supplier => ROLE_SUPPLIER,
        }
    }

    /// Lower rank wins when several roles are held.
    pub fn rank(&self) -> u8 {
        match self {
            Role::Admin => 0,
            Role::Advisor => 1,
            Role::Entrepreneur => 2,
            Role::Supplier => 3,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            ROLE_ADMIN => Ok(Role::Admin),
            ROLE_ADVISOR => Ok(Role::Advisor),
            ROLE_ENTREPRENEUR => Ok(Role::Entrepreneur),
            ROLE_SUPPLIER => Ok(Role::Supplier),
            _ => Err(RoleParseError::UnknownRole(s.to_string())),
        }
    }
}

/// Picks the single role that drives dashboard and login destinations.
/// Returns `None` for an empty role set.
pub fn primary_role<'a, I>(roles: I) -> Option<Role>
where
    I: IntoIterator<Item = &'a Role>,
{
    roles.into_iter().copied().min_by_key(Role::rank)
}

/// True when any held role appears in `allowed`.
pub fn has_any_role(roles: &[Role], allowed: &[Role]) -> bool {
    roles.iter().any(|role| allowed.contains(role))
}
