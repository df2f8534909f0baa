//! # PostgreSQL adapters
//!
//! Tickets are stored as JSONB documents next to a handful of projected
//! columns; the directory tables are plain relational rows.

mod directory;
mod tickets;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::error::StorageError;

pub use directory::{PgGroupRepository, PgTicketTypeRepository, PgUserRepository};
pub use tickets::PgTicketRepository;

const SCHEMA: &str = include_str!("schema.sql");

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;
    info!(max_connections, "postgres pool ready");
    Ok(pool)
}

/// Applies the schema. Every statement is idempotent.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    info!("database schema up to date");
    Ok(())
}

fn to_db_int(value: u64, what: &str) -> Result<i64, StorageError> {
    i64::try_from(value).map_err(|_| StorageError::Corrupt(format!("{what} {value} out of range")))
}

fn from_db_int(value: i64, what: &str) -> Result<u64, StorageError> {
    u64::try_from(value).map_err(|_| StorageError::Corrupt(format!("negative {what} {value}")))
}
