//! # services
//!
//! Application services. Everything here talks to the outside world only
//! through the ports defined in `domains`.

pub mod account_service;
pub mod markdown;
pub mod permissions;
pub mod stats;
pub mod tags;
pub mod ticket_service;
pub mod views;

pub use account_service::{AccountService, LoginSession};
pub use stats::{MonthBucket, TopGroup};
pub use ticket_service::TicketService;
pub use views::{CommentView, HistoryView, TicketPage, TicketView};
