//! # storage-adapters
//!
//! Implementations of the persistence, attachment and event ports declared
//! in `domains`. Each backend sits behind a cargo feature so the binary only
//! links what it is configured for.

pub mod error;
pub mod events;
pub mod memory;
pub mod repositories;

#[cfg(feature = "media-local")]
pub mod media_local;
#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use error::StorageError;
pub use events::BroadcastEventBus;
pub use repositories::Repositories;
