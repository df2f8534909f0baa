//! Argon2 implementation of `CredentialHasher`.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use domains::{CredentialHasher, DomainError, DomainResult};

#[derive(Default)]
pub struct Argon2Credentials {
    argon2: Argon2<'static>,
}

impl Argon2Credentials {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialHasher for Argon2Credentials {
    /// PHC-format hash with a fresh 16-byte salt.
    fn hash_password(&self, password: &str) -> DomainResult<String> {
        let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
            .map_err(|e| DomainError::Internal(format!("salt encoding failed: {e}")))?;
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| DomainError::Internal(format!("password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    fn verify_password(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Access tokens are long random values, so an unsalted SHA-256 is
    /// enough to keep them out of the database while staying indexable.
    fn digest_token(&self, token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}
