pub mod reports;
pub mod system;
pub mod tickets;
