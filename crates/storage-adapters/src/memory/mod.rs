//! In-process adapters. Used by the `memory` database backend and the
//! test suites.

mod directory;
mod tickets;

pub use directory::{MemoryGroupRepository, MemoryTicketTypeRepository, MemoryUserRepository};
pub use tickets::MemoryTicketRepository;

/// First ticket number handed out by every backend.
pub const FIRST_TICKET_UID: u64 = 1000;
