//! # Ticket
//!
//! A support request record. Tickets are stored as whole documents; every
//! mutation goes through a method here so that the audit trail stays
//! consistent:
//!
//! - each mutation appends exactly one [`HistoryEntry`],
//! - `comments`, `notes` and `history` are append-only,
//! - deletion only flips the `deleted` flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

/// Lifecycle status. Travels as an integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TicketStatus {
    New,
    Open,
    Pending,
    Closed,
}

impl From<TicketStatus> for u8 {
    fn from(status: TicketStatus) -> Self {
        match status {
            TicketStatus::New => 0,
            TicketStatus::Open => 1,
            TicketStatus::Pending => 2,
            TicketStatus::Closed => 3,
        }
    }
}

impl TryFrom<u8> for TicketStatus {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TicketStatus::New),
            1 => Ok(TicketStatus::Open),
            2 => Ok(TicketStatus::Pending),
            3 => Ok(TicketStatus::Closed),
            other => Err(DomainError::Validation(format!("unknown ticket status {other}"))),
        }
    }
}

impl TicketStatus {
    pub fn label(self) -> &'static str {
        match self {
            TicketStatus::New => "New",
            TicketStatus::Open => "Open",
            TicketStatus::Pending => "Pending",
            TicketStatus::Closed => "Closed",
        }
    }
}

/// Travels as an integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TicketPriority {
    #[default]
    Normal,
    Urgent,
    Critical,
}

impl From<TicketPriority> for u8 {
    fn from(priority: TicketPriority) -> Self {
        match priority {
            TicketPriority::Normal => 1,
            TicketPriority::Urgent => 2,
            TicketPriority::Critical => 3,
        }
    }
}

impl TryFrom<u8> for TicketPriority {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TicketPriority::Normal),
            2 => Ok(TicketPriority::Urgent),
            3 => Ok(TicketPriority::Critical),
            other => Err(DomainError::Validation(format!("unknown ticket priority {other}"))),
        }
    }
}

impl TicketPriority {
    pub fn label(self) -> &'static str {
        match self {
            TicketPriority::Normal => "Normal",
            TicketPriority::Urgent => "Urgent",
            TicketPriority::Critical => "Critical",
        }
    }
}

/// Audit log item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: String,
    pub description: String,
    pub owner: Uuid,
    pub date: DateTime<Utc>,
}

/// A comment or an internal note. `text` holds rendered, sanitized HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub owner: Uuid,
    pub date: DateTime<Utc>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub owner: Uuid,
    pub name: String,
    /// Storage path handed back by the `AttachmentStorage` port.
    pub path: String,
    pub mime_type: String,
    pub size: u64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Storage identifier.
    pub id: Uuid,
    /// Sequential, human-facing number. Immutable once assigned.
    pub uid: u64,
    pub owner: Uuid,
    pub assignee: Option<Uuid>,
    pub group: Uuid,
    #[serde(rename = "type")]
    pub ticket_type: Uuid,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub tags: Vec<String>,
    pub subject: String,
    /// Rendered, sanitized HTML.
    pub issue: String,
    pub date: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    pub closed_date: Option<DateTime<Utc>>,
    pub deleted: bool,
    pub comments: Vec<Comment>,
    pub notes: Vec<Comment>,
    pub history: Vec<HistoryEntry>,
    pub attachments: Vec<Attachment>,
    pub subscribers: Vec<Uuid>,
    /// Optimistic-concurrency token, bumped on every persisted write.
    pub version: u64,
}

/// Everything needed to open a ticket once the payload has been validated
/// and rendered.
#[derive(Debug, Clone)]
pub struct TicketDraft {
    pub owner: Uuid,
    pub group: Uuid,
    pub ticket_type: Uuid,
    pub priority: TicketPriority,
    pub tags: Vec<String>,
    pub subject: String,
    pub issue: String,
}

impl Ticket {
    /// Opens a new ticket: the owner is the only subscriber and the history
    /// holds exactly one entry.
    pub fn open(draft: TicketDraft, uid: u64, now: DateTime<Utc>) -> Self {
        let mut ticket = Self {
            id: Uuid::new_v4(),
            uid,
            owner: draft.owner,
            assignee: None,
            group: draft.group,
            ticket_type: draft.ticket_type,
            status: TicketStatus::New,
            priority: draft.priority,
            tags: draft.tags,
            subject: draft.subject,
            issue: draft.issue,
            date: now,
            updated: None,
            closed_date: None,
            deleted: false,
            comments: Vec::new(),
            notes: Vec::new(),
            history: Vec::new(),
            attachments: Vec::new(),
            subscribers: vec![draft.owner],
            version: 0,
        };
        ticket.history.push(HistoryEntry {
            action: "ticket:created".into(),
            description: format!("Ticket #{uid} was created."),
            owner: draft.owner,
            date: now,
        });
        ticket
    }

    fn record(&mut self, action: &str, description: String, by: Uuid, now: DateTime<Utc>) {
        self.history.push(HistoryEntry {
            action: action.to_string(),
            description,
            owner: by,
            date: now,
        });
        // never move backwards, even if the clock does
        self.updated = Some(self.updated.map_or(now, |prev| prev.max(now)));
    }

    /// Bumps the version for a write and returns the version the store is
    /// expected to still hold.
    pub fn next_revision(&mut self) -> u64 {
        let expected = self.version;
        self.version += 1;
        expected
    }

    pub fn set_status(&mut self, status: TicketStatus, by: Uuid, now: DateTime<Utc>) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        self.record(
            "ticket:set:status",
            format!("Ticket status set to: {}", status.label()),
            by,
            now,
        );
        true
    }

    pub fn set_group(&mut self, group: Uuid, group_name: &str, by: Uuid, now: DateTime<Utc>) -> bool {
        if self.group == group {
            return false;
        }
        self.group = group;
        self.record("ticket:set:group", format!("Ticket group set to: {group_name}"), by, now);
        true
    }

    pub fn set_closed_date(
        &mut self,
        closed: Option<DateTime<Utc>>,
        by: Uuid,
        now: DateTime<Utc>,
    ) -> bool {
        if self.closed_date == closed {
            return false;
        }
        self.closed_date = closed;
        let description = match closed {
            Some(date) => format!("Ticket closed date set to: {}", date.to_rfc3339()),
            None => "Ticket closed date cleared".to_string(),
        };
        self.record("ticket:set:closedDate", description, by, now);
        true
    }

    pub fn set_assignee(
        &mut self,
        assignee: Option<(Uuid, &str)>,
        by: Uuid,
        now: DateTime<Utc>,
    ) -> bool {
        let new_id = assignee.map(|(id, _)| id);
        if self.assignee == new_id {
            return false;
        }
        self.assignee = new_id;
        match assignee {
            Some((_, name)) => {
                self.record("ticket:set:assignee", format!("{name} was set as assignee"), by, now)
            }
            None => self.record("ticket:set:assignee", "Assignee was cleared".into(), by, now),
        }
        true
    }

    pub fn set_type(&mut self, ticket_type: Uuid, type_name: &str, by: Uuid, now: DateTime<Utc>) -> bool {
        if self.ticket_type == ticket_type {
            return false;
        }
        self.ticket_type = ticket_type;
        self.record("ticket:set:type", format!("Ticket type set to: {type_name}"), by, now);
        true
    }

    pub fn set_priority(&mut self, priority: TicketPriority, by: Uuid, now: DateTime<Utc>) -> bool {
        if self.priority == priority {
            return false;
        }
        self.priority = priority;
        self.record(
            "ticket:set:priority",
            format!("Ticket priority set to: {}", priority.label()),
            by,
            now,
        );
        true
    }

    pub fn set_tags(&mut self, tags: Vec<String>, by: Uuid, now: DateTime<Utc>) -> bool {
        if self.tags == tags {
            return false;
        }
        let description = format!("Ticket tags set to: {}", tags.join(", "));
        self.tags = tags;
        self.record("ticket:set:tags", description, by, now);
        true
    }

    pub fn set_subject(&mut self, subject: String, by: Uuid, now: DateTime<Utc>) -> bool {
        if self.subject == subject {
            return false;
        }
        self.subject = subject;
        self.record("ticket:set:subject", "Ticket subject was updated".into(), by, now);
        true
    }

    pub fn set_issue(&mut self, issue: String, by: Uuid, now: DateTime<Utc>) -> bool {
        if self.issue == issue {
            return false;
        }
        self.issue = issue;
        self.record("ticket:set:issue", "Ticket issue was updated".into(), by, now);
        true
    }

    pub fn add_comment(&mut self, owner: Uuid, text: String, now: DateTime<Utc>) -> Comment {
        let comment = Comment {
            id: Uuid::new_v4(),
            owner,
            date: now,
            text,
        };
        self.comments.push(comment.clone());
        self.record("ticket:comment:added", "Comment was added".into(), owner, now);
        comment
    }

    pub fn add_note(&mut self, owner: Uuid, text: String, now: DateTime<Utc>) -> Comment {
        let note = Comment {
            id: Uuid::new_v4(),
            owner,
            date: now,
            text,
        };
        self.notes.push(note.clone());
        self.record("ticket:note:added", "Internal note was added".into(), owner, now);
        note
    }

    pub fn add_attachment(&mut self, attachment: Attachment, now: DateTime<Utc>) {
        let description = format!("Attachment {} was added", attachment.name);
        let by = attachment.owner;
        self.attachments.push(attachment);
        self.record("ticket:attachment:added", description, by, now);
    }

    /// Detaches the record and returns it so the caller can drop the file.
    pub fn remove_attachment(
        &mut self,
        attachment_id: Uuid,
        by: Uuid,
        now: DateTime<Utc>,
    ) -> Option<Attachment> {
        let index = self.attachments.iter().position(|a| a.id == attachment_id)?;
        let removed = self.attachments.remove(index);
        self.record(
            "ticket:attachment:removed",
            format!("Attachment {} was removed", removed.name),
            by,
            now,
        );
        Some(removed)
    }

    pub fn is_subscribed(&self, user: Uuid) -> bool {
        self.subscribers.contains(&user)
    }

    pub fn set_subscribed(&mut self, user: Uuid, subscribe: bool, by: Uuid, now: DateTime<Utc>) -> bool {
        if self.is_subscribed(user) == subscribe {
            return false;
        }
        if subscribe {
            self.subscribers.push(user);
            self.record("ticket:subscriber:add", format!("Subscriber {user} was added"), by, now);
        } else {
            self.subscribers.retain(|s| *s != user);
            self.record("ticket:subscriber:remove", format!("Subscriber {user} was removed"), by, now);
        }
        true
    }

    pub fn soft_delete(&mut self, by: Uuid, now: DateTime<Utc>) -> bool {
        if self.deleted {
            return false;
        }
        self.deleted = true;
        self.record("ticket:delete", format!("Ticket #{} was deleted", self.uid), by, now);
        true
    }

    pub fn restore(&mut self, by: Uuid, now: DateTime<Utc>) -> bool {
        if !self.deleted {
            return false;
        }
        self.deleted = false;
        self.record("ticket:restore", format!("Ticket #{} was restored", self.uid), by, now);
        true
    }
}

/// Tags as they arrive from clients: either `"a,b,c"` or `["a","b","c"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TagList {
    Delimited(String),
    List(Vec<String>),
}

/// Payload of `POST /tickets/create`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub issue: String,
    pub group: Option<Uuid>,
    #[serde(rename = "type")]
    pub ticket_type: Option<Uuid>,
    pub priority: Option<TicketPriority>,
    pub tags: Option<TagList>,
}

/// Payload of `PUT /tickets/:id`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPatch {
    pub status: Option<TicketStatus>,
    pub group: Option<Uuid>,
    /// `Some(Some(date))` = set, `Some(None)` = clear, `None` = no change.
    #[serde(default, deserialize_with = "present_or_null")]
    pub closed_date: Option<Option<DateTime<Utc>>>,
    /// `Some(Some(id))` = assign, `Some(None)` = clear, `None` = no change.
    #[serde(default, deserialize_with = "present_or_null")]
    pub assignee: Option<Option<Uuid>>,
    #[serde(rename = "type")]
    pub ticket_type: Option<Uuid>,
    pub priority: Option<TicketPriority>,
    pub tags: Option<TagList>,
    pub subject: Option<String>,
    pub issue: Option<String>,
    /// When given, the write is rejected unless the stored version matches.
    pub version: Option<u64>,
}

impl TicketPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.group.is_none()
            && self.closed_date.is_none()
            && self.assignee.is_none()
            && self.ticket_type.is_none()
            && self.priority.is_none()
            && self.tags.is_none()
            && self.subject.is_none()
            && self.issue.is_none()
    }
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Query string of `GET /tickets`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketFilter {
    pub limit: Option<u32>,
    pub page: Option<u32>,
    #[serde(default)]
    pub assigned_self: bool,
    /// Comma-separated status codes, e.g. `"0,1"`.
    pub status: Option<String>,
}

/// Payload of `POST /tickets/:id/comment`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    #[serde(default)]
    pub comment: String,
    /// Defaults to the authenticated user.
    pub owner_id: Option<Uuid>,
}

/// Payload of `POST /tickets/:id/note`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewNote {
    #[serde(default)]
    pub note: String,
}

/// Payload of `POST /tickets/:id/subscribe`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionChange {
    pub user: Uuid,
    pub subscribe: bool,
}
