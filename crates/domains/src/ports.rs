//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be used by the binary.
//! Services only ever see `Arc<dyn Port>`.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::DomainResult;
use crate::events::TicketEvent;
use crate::models::{Group, Ticket, TicketStatus, TicketType, User};

/// Repository-level listing criteria. Built by the service from a
/// [`crate::models::TicketFilter`] and the requester's group membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketQuery {
    /// Only tickets in one of these groups. Empty matches nothing.
    pub groups: Vec<Uuid>,
    /// Only tickets with one of these statuses. Empty matches any.
    pub statuses: Vec<TicketStatus>,
    pub assignee: Option<Uuid>,
    pub include_deleted: bool,
    pub limit: u32,
    pub offset: u64,
}

impl TicketQuery {
    /// In-process evaluation of the filter part of the query.
    pub fn matches(&self, ticket: &Ticket) -> bool {
        (self.include_deleted || !ticket.deleted)
            && self.groups.contains(&ticket.group)
            && (self.statuses.is_empty() || self.statuses.contains(&ticket.status))
            && self.assignee.is_none_or(|a| ticket.assignee == Some(a))
    }
}

/// Half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupCount {
    pub group: Uuid,
    pub count: u64,
}

/// Ticket document collection.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Allocates the next sequential ticket number.
    async fn next_uid(&self) -> DomainResult<u64>;
    async fn insert(&self, ticket: &Ticket) -> DomainResult<()>;
    /// Direct lookup; returns soft-deleted tickets too.
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Ticket>>;
    async fn find_by_uid(&self, uid: u64) -> DomainResult<Option<Ticket>>;
    /// Ordered by `uid` descending.
    async fn list(&self, query: &TicketQuery) -> DomainResult<Vec<Ticket>>;
    /// Tickets matching `query`, ignoring its `limit` and `offset`.
    async fn count(&self, query: &TicketQuery) -> DomainResult<u64>;
    /// Replaces the stored document only if its version still equals
    /// `expected_version`; otherwise fails with `DomainError::Conflict`.
    async fn replace(&self, ticket: &Ticket, expected_version: u64) -> DomainResult<()>;

    // Reporting
    async fn count_created(&self, range: DateRange) -> DomainResult<u64>;
    async fn count_closed(&self, range: DateRange) -> DomainResult<u64>;
    /// Non-deleted ticket counts per group, optionally only tickets created
    /// at or after `since`.
    async fn count_by_group(&self, since: Option<DateTime<Utc>>) -> DomainResult<Vec<GroupCount>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: &User) -> DomainResult<()>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<User>>;
    async fn find_many(&self, ids: &[Uuid]) -> DomainResult<Vec<User>>;
    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>>;
    async fn find_by_token_digest(&self, digest: &str) -> DomainResult<Option<User>>;
    async fn set_token_digest(&self, id: Uuid, digest: &str) -> DomainResult<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn insert(&self, group: &Group) -> DomainResult<()>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Group>>;
    async fn find_many(&self, ids: &[Uuid]) -> DomainResult<Vec<Group>>;
    /// Groups the user belongs to, ordered by name.
    async fn list_for_member(&self, user_id: Uuid) -> DomainResult<Vec<Group>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TicketTypeRepository: Send + Sync {
    async fn insert(&self, ticket_type: &TicketType) -> DomainResult<()>;
    /// Ordered by name.
    async fn list(&self) -> DomainResult<Vec<TicketType>>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<TicketType>>;
}

/// Where an attachment ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: String,
    pub size: u64,
}

/// Backing storage for attachment bytes.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AttachmentStorage: Send + Sync {
    async fn save(
        &self,
        ticket_id: Uuid,
        file_name: &str,
        content_type: &mime::Mime,
        data: Bytes,
    ) -> DomainResult<StoredFile>;
    /// Removing a path that is already gone is not an error.
    async fn remove(&self, path: &str) -> DomainResult<()>;
}

/// Process-wide lifecycle notifications. Never fails the caller.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: TicketEvent);
}

/// Resolves the `accesstoken` header to a user.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, access_token: &str) -> DomainResult<User>;
}

/// Password hashing and token digesting.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CredentialHasher: Send + Sync {
    fn hash_password(&self, password: &str) -> DomainResult<String>;
    fn verify_password(&self, password: &str, hash: &str) -> bool;
    /// Deterministic digest under which access tokens are stored.
    fn digest_token(&self, token: &str) -> String;
}
