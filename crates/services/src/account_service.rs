//! # AccountService
//!
//! Directory administration and access-token issuance.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use domains::{
    CredentialHasher, DomainError, DomainResult, Group, GroupRepository, NewUser, User,
    UserRepository, UserSummary,
};

use crate::markdown;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Returned once by a successful login. The raw token is never stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSession {
    pub access_token: String,
    pub user: UserSummary,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    groups: Arc<dyn GroupRepository>,
    hasher: Arc<dyn CredentialHasher>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        groups: Arc<dyn GroupRepository>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self {
            users,
            groups,
            hasher,
        }
    }

    pub async fn register(&self, input: NewUser) -> DomainResult<User> {
        let username = input.username.trim().to_lowercase();
        if username.is_empty() {
            return Err(DomainError::Validation("username is required".into()));
        }
        if input.password.len() < MIN_PASSWORD_LEN {
            return Err(DomainError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.users.find_by_username(&username).await?.is_some() {
            return Err(DomainError::Conflict(format!("username '{username}' is taken")));
        }

        let user = User {
            id: Uuid::new_v4(),
            username,
            fullname: markdown::plain(&input.fullname),
            email: input.email.trim().to_string(),
            role: input.role,
            password_hash: self.hasher.hash_password(&input.password)?,
            access_token_digest: None,
            created_at: Utc::now(),
        };
        self.users.insert(&user).await?;
        info!(user_id = %user.id, username = %user.username, role = user.role.as_str(), "user registered");
        Ok(user)
    }

    pub async fn create_group(&self, name: &str, members: Vec<Uuid>) -> DomainResult<Group> {
        let name = markdown::plain(name);
        if name.is_empty() {
            return Err(DomainError::Validation("group name is required".into()));
        }
        let group = Group {
            id: Uuid::new_v4(),
            name,
            members,
            created_at: Utc::now(),
        };
        self.groups.insert(&group).await?;
        info!(group_id = %group.id, name = %group.name, "group created");
        Ok(group)
    }

    /// Verifies the password and rotates the user's access token.
    pub async fn login(&self, username: &str, password: &str) -> DomainResult<LoginSession> {
        let username = username.trim().to_lowercase();
        let Some(user) = self.users.find_by_username(&username).await? else {
            warn!(username = %username, "login for unknown user");
            return Err(invalid_credentials());
        };
        if !self.hasher.verify_password(password, &user.password_hash) {
            warn!(username = %username, "login with wrong password");
            return Err(invalid_credentials());
        }

        let access_token = generate_token();
        self.users
            .set_token_digest(user.id, &self.hasher.digest_token(&access_token))
            .await?;

        info!(user_id = %user.id, "access token issued");
        Ok(LoginSession {
            access_token,
            user: UserSummary::from(&user),
        })
    }
}

fn invalid_credentials() -> DomainError {
    DomainError::Unauthorized("invalid username or password".into())
}

/// 64 hex characters drawn from two v4 UUIDs.
fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}
