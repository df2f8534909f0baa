//! helpdesk/crates/domains/src/lib.rs
//!
//! The central domain model and port definitions for the helpdesk.
//! No I/O lives here; adapters implement the traits in [`ports`].

pub mod errors;
pub mod events;
pub mod models;
pub mod ports;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use events::*;
pub use models::*;
pub use ports::*;
