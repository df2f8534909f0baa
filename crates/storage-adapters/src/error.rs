//! Adapter-level failures and their mapping into `DomainError`.

use domains::DomainError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[cfg(feature = "db-postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        match err {
            #[cfg(feature = "db-postgres")]
            StorageError::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                DomainError::Conflict(db.message().to_string())
            }
            other => DomainError::Storage(other.to_string()),
        }
    }
}
