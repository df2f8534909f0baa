//! Ticket lifecycle notifications.
//!
//! Events are published fire-and-forget through the `EventPublisher`
//! port. Subscribers (live-update push, audit logging) see them in
//! publication order but nothing is retried.

use serde::Serialize;
use uuid::Uuid;

use crate::models::{Comment, Ticket};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum TicketEvent {
    #[serde(rename = "ticket:created")]
    Created { ticket: Ticket, by: Uuid },
    #[serde(rename = "ticket:updated")]
    Updated { ticket: Ticket, by: Uuid },
    #[serde(rename = "ticket:deleted")]
    Deleted { ticket_id: Uuid, uid: u64, by: Uuid },
    #[serde(rename = "ticket:comment:added")]
    CommentAdded { ticket: Ticket, comment: Comment },
    #[serde(rename = "ticket:subscribers:update")]
    SubscribersUpdated {
        ticket_id: Uuid,
        uid: u64,
        subscribers: Vec<Uuid>,
    },
}

impl TicketEvent {
    /// The wire name subscribers match on.
    pub fn name(&self) -> &'static str {
        match self {
            TicketEvent::Created { .. } => "ticket:created",
            TicketEvent::Updated { .. } => "ticket:updated",
            TicketEvent::Deleted { .. } => "ticket:deleted",
            TicketEvent::CommentAdded { .. } => "ticket:comment:added",
            TicketEvent::SubscribersUpdated { .. } => "ticket:subscribers:update",
        }
    }

    pub fn ticket_uid(&self) -> u64 {
        match self {
            TicketEvent::Created { ticket, .. }
            | TicketEvent::Updated { ticket, .. }
            | TicketEvent::CommentAdded { ticket, .. } => ticket.uid,
            TicketEvent::Deleted { uid, .. } | TicketEvent::SubscribersUpdated { uid, .. } => *uid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_tag_matches_name() {
        let event = TicketEvent::Deleted {
            ticket_id: Uuid::new_v4(),
            uid: 1001,
            by: Uuid::new_v4(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
        assert_eq!(json["uid"], 1001);
        assert_eq!(event.ticket_uid(), 1001);
    }
}
