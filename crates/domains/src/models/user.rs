//! Users and roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Mod,
    Support,
    User,
}

impl Role {
    /// Staff roles work tickets on behalf of other users.
    pub fn is_staff(self) -> bool {
        !matches!(self, Role::User)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Mod => "mod",
            Role::Support => "support",
            Role::User => "user",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = crate::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "mod" => Ok(Role::Mod),
            "support" => Ok(Role::Support),
            "user" => Ok(Role::User),
            other => Err(crate::DomainError::Validation(format!("unknown role '{other}'"))),
        }
    }
}

/// A directory entry. Tickets reference users by id, never embed them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub fullname: String,
    pub email: String,
    pub role: Role,
    /// Argon2 PHC string.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// SHA-256 hex digest of the current access token, if one was issued.
    #[serde(skip_serializing, default)]
    pub access_token_digest: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a directory entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub fullname: String,
    pub email: String,
    pub role: Role,
    /// Raw password (hashed before storage).
    pub password: String,
}

/// The public projection of a user, used wherever a reference is populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub fullname: String,
    pub email: String,
    pub role: Role,
}

impl UserSummary {
    /// Placeholder for a reference whose user no longer resolves.
    pub fn unresolved(id: Uuid) -> Self {
        Self {
            id,
            username: String::new(),
            fullname: String::new(),
            email: String::new(),
            role: Role::User,
        }
    }
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            fullname: user.fullname.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}
