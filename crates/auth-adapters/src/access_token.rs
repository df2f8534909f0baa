//! Resolves the `accesstoken` request header to a stored user.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use domains::{Authenticator, CredentialHasher, DomainError, DomainResult, User, UserRepository};

pub struct AccessTokenAuthenticator {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
}

impl AccessTokenAuthenticator {
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { users, hasher }
    }
}

fn rejected() -> DomainError {
    DomainError::Unauthorized("Invalid Access Token".into())
}

#[async_trait]
impl Authenticator for AccessTokenAuthenticator {
    async fn authenticate(&self, access_token: &str) -> DomainResult<User> {
        let token = access_token.trim();
        if token.is_empty() {
            return Err(rejected());
        }
        match self.users.find_by_token_digest(&self.hasher.digest_token(token)).await? {
            Some(user) => Ok(user),
            None => {
                debug!("access token did not match any user");
                Err(rejected())
            }
        }
    }
}
