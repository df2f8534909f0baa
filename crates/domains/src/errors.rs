//! # DomainError
//!
//! Centralized error type for the helpdesk domain.
//! Adapters map their own failures into these variants; the HTTP layer
//! decides the status code per endpoint.

use thiserror::Error;

/// The primary error type for all domain and port operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Resource not found (e.g., Ticket, User, Group)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., empty subject, unknown status code)
    #[error("validation error: {0}")]
    Validation(String),

    /// Authentication or permission failure
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Optimistic-concurrency failure or duplicate key
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence failure (e.g., DB down, disk full)
    #[error("storage error: {0}")]
    Storage(String),

    /// Anything else that should never reach a client verbatim
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound(entity.to_string(), id.to_string())
    }
}

/// A specialized Result type for domain logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;
