//! # auth-adapters
//!
//! Password hashing and access-token authentication.

mod access_token;
mod credentials;

pub use access_token::AccessTokenAuthenticator;
pub use credentials::Argon2Credentials;
