//! # Domain Models
//!
//! These structs represent the core entities of the helpdesk.
//! Storage identifiers are UUID v4; tickets also carry a sequential `uid`.

pub mod group;
pub mod ticket;
pub mod user;

pub use group::{Group, GroupSummary, TicketType};
pub use ticket::{
    Attachment, Comment, HistoryEntry, NewComment, NewNote, NewTicket, SubscriptionChange, TagList, Ticket,
    TicketDraft, TicketFilter, TicketPatch, TicketPriority, TicketStatus,
};
pub use user::{NewUser, Role, User, UserSummary};
