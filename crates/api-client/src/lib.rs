//! # api-client
//!
//! Typed front-end actions and a client that fulfils them against the
//! helpdesk API, returning results ready to feed a client-side store.

pub mod actions;
pub mod client;
pub mod error;

pub use actions::{NewTicketRequest, TicketAction, TicketQuery, TicketUpdate};
pub use client::{ActionResult, HelpdeskClient};
pub use error::ClientError;
