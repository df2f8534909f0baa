//! Populated projections of tickets returned to clients.
//!
//! Stored tickets only hold ids. Views resolve those ids into user, group
//! and type summaries in one batch per request.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use domains::{
    Attachment, Comment, Group, GroupSummary, HistoryEntry, Ticket, TicketPriority, TicketStatus,
    TicketType, User, UserSummary,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub owner: UserSummary,
    pub date: DateTime<Utc>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryView {
    pub action: String,
    pub description: String,
    pub owner: UserSummary,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    pub id: Uuid,
    pub uid: u64,
    pub owner: UserSummary,
    pub assignee: Option<UserSummary>,
    pub group: GroupSummary,
    #[serde(rename = "type")]
    pub ticket_type: TicketType,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub tags: Vec<String>,
    pub subject: String,
    pub issue: String,
    pub date: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    pub closed_date: Option<DateTime<Utc>>,
    pub deleted: bool,
    pub comments: Vec<CommentView>,
    /// Only present for viewers allowed to read internal notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<CommentView>>,
    pub history: Vec<HistoryView>,
    pub attachments: Vec<Attachment>,
    pub subscribers: Vec<UserSummary>,
    pub version: u64,
}

/// One page of a ticket listing. `total` counts every match, not just the
/// tickets on this page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TicketPage {
    pub total: u64,
    pub tickets: Vec<TicketView>,
}

/// Every id a batch of tickets refers to.
#[derive(Debug, Default)]
pub(crate) struct References {
    pub users: HashSet<Uuid>,
    pub groups: HashSet<Uuid>,
}

impl References {
    pub fn collect<'a>(tickets: impl IntoIterator<Item = &'a Ticket>) -> Self {
        let mut refs = Self::default();
        for ticket in tickets {
            refs.users.insert(ticket.owner);
            refs.users.extend(ticket.assignee);
            refs.users.extend(ticket.subscribers.iter().copied());
            refs.users.extend(ticket.comments.iter().map(|c| c.owner));
            refs.users.extend(ticket.notes.iter().map(|n| n.owner));
            refs.users.extend(ticket.history.iter().map(|h| h.owner));
            refs.groups.insert(ticket.group);
        }
        refs
    }
}

/// Resolved references for one batch.
#[derive(Debug, Default)]
pub(crate) struct Lookup {
    users: HashMap<Uuid, UserSummary>,
    groups: HashMap<Uuid, GroupSummary>,
    types: HashMap<Uuid, TicketType>,
}

impl Lookup {
    pub fn new(users: &[User], groups: &[Group], types: Vec<TicketType>) -> Self {
        Self {
            users: users.iter().map(|u| (u.id, UserSummary::from(u))).collect(),
            groups: groups.iter().map(|g| (g.id, GroupSummary::from(g))).collect(),
            types: types.into_iter().map(|t| (t.id, t)).collect(),
        }
    }

    fn user(&self, id: Uuid) -> UserSummary {
        self.users
            .get(&id)
            .cloned()
            .unwrap_or_else(|| UserSummary::unresolved(id))
    }

    fn group(&self, id: Uuid) -> GroupSummary {
        self.groups.get(&id).cloned().unwrap_or(GroupSummary {
            id,
            name: String::new(),
        })
    }

    fn ticket_type(&self, id: Uuid) -> TicketType {
        self.types.get(&id).cloned().unwrap_or(TicketType {
            id,
            name: String::new(),
        })
    }

    fn comment(&self, comment: &Comment) -> CommentView {
        CommentView {
            id: comment.id,
            owner: self.user(comment.owner),
            date: comment.date,
            text: comment.text.clone(),
        }
    }

    fn history(&self, entry: &HistoryEntry) -> HistoryView {
        HistoryView {
            action: entry.action.clone(),
            description: entry.description.clone(),
            owner: self.user(entry.owner),
            date: entry.date,
        }
    }

    pub fn view(&self, ticket: Ticket, show_notes: bool) -> TicketView {
        TicketView {
            id: ticket.id,
            uid: ticket.uid,
            owner: self.user(ticket.owner),
            assignee: ticket.assignee.map(|id| self.user(id)),
            group: self.group(ticket.group),
            ticket_type: self.ticket_type(ticket.ticket_type),
            status: ticket.status,
            priority: ticket.priority,
            tags: ticket.tags,
            subject: ticket.subject,
            issue: ticket.issue,
            date: ticket.date,
            updated: ticket.updated,
            closed_date: ticket.closed_date,
            deleted: ticket.deleted,
            comments: ticket.comments.iter().map(|c| self.comment(c)).collect(),
            notes: show_notes.then(|| ticket.notes.iter().map(|n| self.comment(n)).collect()),
            history: ticket.history.iter().map(|h| self.history(h)).collect(),
            attachments: ticket.attachments,
            subscribers: ticket.subscribers.iter().map(|id| self.user(*id)).collect(),
            version: ticket.version,
        }
    }
}
