use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::{primary_role, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Row of the backend `profiles` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub terms_accepted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub terms_version: Option<String>,
}

/// Auth state handed to guards and resolvers. `loading` is true while the
/// backend session is still hydrating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub user: Option<SessionUser>,
    pub profile: Option<UserProfile>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub loading: bool,
}

impl SessionState {
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: SessionUser, roles: Vec<Role>) -> Self {
        Self {
            user: Some(user),
            profile: None,
            roles,
            loading: false,
        }
    }

    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user.as_ref().map(|user| user.id)
    }

    /// Primary role only counts for an authenticated user.
    pub fn primary_role(&self) -> Option<Role> {
        if self.user.is_none() {
            return None;
        }
        primary_role(&self.roles)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.user.is_some() && self.roles.contains(&role)
    }
}
