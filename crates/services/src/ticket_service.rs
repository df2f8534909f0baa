//! # TicketService
//!
//! Orchestrates ticket lifecycle operations over the ports. Every write is a
//! read-modify-write guarded by the ticket's `version`: a concurrent writer
//! makes the second `replace` fail with `DomainError::Conflict` instead of
//! silently dropping history entries.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use domains::{
    Attachment, AttachmentStorage, DomainError, DomainResult, EventPublisher, GroupRepository,
    NewComment, NewTicket, SubscriptionChange, Ticket, TicketDraft, TicketEvent, TicketFilter,
    TicketPatch, TicketQuery, TicketRepository, TicketStatus, TicketType, TicketTypeRepository,
    User, UserRepository,
};

use crate::permissions::{self, Permission};
use crate::stats::{self, MonthBucket, TopGroup};
use crate::views::{Lookup, References, TicketPage, TicketView};
use crate::{markdown, tags};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct TicketService {
    tickets: Arc<dyn TicketRepository>,
    users: Arc<dyn UserRepository>,
    groups: Arc<dyn GroupRepository>,
    types: Arc<dyn TicketTypeRepository>,
    attachments: Arc<dyn AttachmentStorage>,
    events: Arc<dyn EventPublisher>,
}

impl TicketService {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        users: Arc<dyn UserRepository>,
        groups: Arc<dyn GroupRepository>,
        types: Arc<dyn TicketTypeRepository>,
        attachments: Arc<dyn AttachmentStorage>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            tickets,
            users,
            groups,
            types,
            attachments,
            events,
        }
    }

    /// Tickets visible to `requester`: only groups they belong to, never
    /// soft-deleted ones, newest `uid` first.
    pub async fn list(&self, requester: &User, filter: TicketFilter) -> DomainResult<TicketPage> {
        let statuses = parse_statuses(filter.status.as_deref())?;
        let groups = self.groups.list_for_member(requester.id).await?;
        if groups.is_empty() {
            return Ok(TicketPage::default());
        }

        let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let query = TicketQuery {
            groups: groups.iter().map(|g| g.id).collect(),
            statuses,
            assignee: filter.assigned_self.then_some(requester.id),
            include_deleted: false,
            limit,
            offset: u64::from(filter.page.unwrap_or(0)) * u64::from(limit),
        };

        let total = self.tickets.count(&query).await?;
        let tickets = self.tickets.list(&query).await?;
        Ok(TicketPage {
            total,
            tickets: self.populate(tickets, requester).await?,
        })
    }

    pub async fn create(&self, requester: &User, input: NewTicket) -> DomainResult<TicketView> {
        let subject = markdown::plain(&input.subject);
        if subject.is_empty() {
            return Err(DomainError::Validation("subject is required".into()));
        }

        let group = match input.group {
            Some(id) => self
                .groups
                .find_by_id(id)
                .await?
                .ok_or_else(|| DomainError::Validation(format!("unknown group {id}")))?,
            None => self
                .groups
                .list_for_member(requester.id)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| DomainError::Validation("requester belongs to no group".into()))?,
        };

        let ticket_type = match input.ticket_type {
            Some(id) => self
                .types
                .find_by_id(id)
                .await?
                .ok_or_else(|| DomainError::Validation(format!("unknown ticket type {id}")))?,
            None => self
                .types
                .list()
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| DomainError::Validation("no ticket types configured".into()))?,
        };

        let draft = TicketDraft {
            owner: requester.id,
            group: group.id,
            ticket_type: ticket_type.id,
            priority: input.priority.unwrap_or_default(),
            tags: input.tags.map(tags::normalize).unwrap_or_default(),
            subject,
            issue: markdown::render(&input.issue),
        };

        let uid = self.tickets.next_uid().await?;
        let ticket = Ticket::open(draft, uid, Utc::now());
        self.tickets.insert(&ticket).await?;

        info!(uid, ticket_id = %ticket.id, owner = %requester.username, "ticket created");
        self.events.publish(TicketEvent::Created {
            ticket: ticket.clone(),
            by: requester.id,
        });
        self.view(ticket, requester).await
    }

    pub async fn get_by_uid(&self, uid: u64, viewer: &User) -> DomainResult<TicketView> {
        let ticket = self
            .tickets
            .find_by_uid(uid)
            .await?
            .ok_or_else(|| DomainError::not_found("Ticket", uid))?;
        self.view(ticket, viewer).await
    }

    /// Applies only the fields present in `patch`. Each changed field adds
    /// one history entry; a patch that changes nothing writes nothing.
    pub async fn update(&self, id: Uuid, patch: TicketPatch, requester: &User) -> DomainResult<TicketView> {
        let mut ticket = self.load(id).await?;
        if let Some(expected) = patch.version {
            if expected != ticket.version {
                return Err(stale(&ticket, expected));
            }
        }

        let now = Utc::now();
        let by = requester.id;
        let mut changed = false;

        if let Some(status) = patch.status {
            changed |= ticket.set_status(status, by, now);
        }
        if let Some(group_id) = patch.group {
            let group = self
                .groups
                .find_by_id(group_id)
                .await?
                .ok_or_else(|| DomainError::Validation(format!("unknown group {group_id}")))?;
            changed |= ticket.set_group(group.id, &group.name, by, now);
        }
        if let Some(closed) = patch.closed_date {
            changed |= ticket.set_closed_date(closed, by, now);
        }
        if let Some(assignee) = patch.assignee {
            match assignee {
                Some(user_id) => {
                    let user = self
                        .users
                        .find_by_id(user_id)
                        .await?
                        .ok_or_else(|| DomainError::Validation(format!("unknown user {user_id}")))?;
                    changed |= ticket.set_assignee(Some((user.id, &user.fullname)), by, now);
                }
                None => changed |= ticket.set_assignee(None, by, now),
            }
        }
        if let Some(type_id) = patch.ticket_type {
            let ticket_type = self
                .types
                .find_by_id(type_id)
                .await?
                .ok_or_else(|| DomainError::Validation(format!("unknown ticket type {type_id}")))?;
            changed |= ticket.set_type(ticket_type.id, &ticket_type.name, by, now);
        }
        if let Some(priority) = patch.priority {
            changed |= ticket.set_priority(priority, by, now);
        }
        if let Some(list) = patch.tags {
            changed |= ticket.set_tags(tags::normalize(list), by, now);
        }
        if let Some(subject) = patch.subject {
            let subject = markdown::plain(&subject);
            if subject.is_empty() {
                return Err(DomainError::Validation("subject may not be empty".into()));
            }
            changed |= ticket.set_subject(subject, by, now);
        }
        if let Some(issue) = patch.issue {
            changed |= ticket.set_issue(markdown::render(&issue), by, now);
        }

        if changed {
            self.save(&mut ticket).await?;
            info!(uid = ticket.uid, by = %requester.username, "ticket updated");
            self.events.publish(TicketEvent::Updated {
                ticket: ticket.clone(),
                by,
            });
        }
        self.view(ticket, requester).await
    }

    /// Flags the ticket as deleted. The document stays in the store and is
    /// still reachable by id.
    pub async fn soft_delete(&self, id: Uuid, requester: &User) -> DomainResult<()> {
        let mut ticket = self.load(id).await?;
        if ticket.soft_delete(requester.id, Utc::now()) {
            self.save(&mut ticket).await?;
            info!(uid = ticket.uid, by = %requester.username, "ticket deleted");
            self.events.publish(TicketEvent::Deleted {
                ticket_id: ticket.id,
                uid: ticket.uid,
                by: requester.id,
            });
        }
        Ok(())
    }

    pub async fn restore(&self, id: Uuid, requester: &User) -> DomainResult<TicketView> {
        permissions::require(requester, Permission::RestoreTicket)?;
        let mut ticket = self.load(id).await?;
        if ticket.restore(requester.id, Utc::now()) {
            self.save(&mut ticket).await?;
            info!(uid = ticket.uid, by = %requester.username, "ticket restored");
            self.events.publish(TicketEvent::Updated {
                ticket: ticket.clone(),
                by: requester.id,
            });
        }
        self.view(ticket, requester).await
    }

    pub async fn post_comment(&self, id: Uuid, input: NewComment, requester: &User) -> DomainResult<TicketView> {
        let text = input.comment.trim();
        if text.is_empty() {
            return Err(DomainError::Validation("comment text is required".into()));
        }

        let owner = match input.owner_id {
            Some(owner_id) if owner_id != requester.id => {
                permissions::require(requester, Permission::CommentOnBehalf)?;
                self.users
                    .find_by_id(owner_id)
                    .await?
                    .ok_or_else(|| DomainError::Validation(format!("unknown user {owner_id}")))?
                    .id
            }
            _ => requester.id,
        };

        let mut ticket = self.load(id).await?;
        let comment = ticket.add_comment(owner, markdown::render(text), Utc::now());
        self.save(&mut ticket).await?;

        info!(uid = ticket.uid, comment_id = %comment.id, "comment added");
        self.events.publish(TicketEvent::CommentAdded {
            ticket: ticket.clone(),
            comment,
        });
        self.view(ticket, requester).await
    }

    /// Internal notes are only visible to staff.
    pub async fn post_note(&self, id: Uuid, note: &str, requester: &User) -> DomainResult<TicketView> {
        permissions::require(requester, Permission::AddNote)?;
        let text = note.trim();
        if text.is_empty() {
            return Err(DomainError::Validation("note text is required".into()));
        }

        let mut ticket = self.load(id).await?;
        ticket.add_note(requester.id, markdown::render(text), Utc::now());
        self.save(&mut ticket).await?;

        info!(uid = ticket.uid, by = %requester.username, "note added");
        self.events.publish(TicketEvent::Updated {
            ticket: ticket.clone(),
            by: requester.id,
        });
        self.view(ticket, requester).await
    }

    pub async fn add_attachment(
        &self,
        id: Uuid,
        file_name: &str,
        content_type: mime::Mime,
        data: Bytes,
        requester: &User,
    ) -> DomainResult<TicketView> {
        permissions::require(requester, Permission::AddAttachment)?;
        let name = markdown::plain(file_name);
        if name.is_empty() || data.is_empty() {
            return Err(DomainError::Validation("attachment needs a file name and content".into()));
        }

        let mut ticket = self.load(id).await?;
        let stored = self
            .attachments
            .save(ticket.id, &name, &content_type, data)
            .await?;

        let now = Utc::now();
        ticket.add_attachment(
            Attachment {
                id: Uuid::new_v4(),
                owner: requester.id,
                name,
                path: stored.path.clone(),
                mime_type: content_type.to_string(),
                size: stored.size,
                date: now,
            },
            now,
        );

        if let Err(err) = self.save(&mut ticket).await {
            // the record never made it, don't leave the file behind
            if let Err(cleanup) = self.attachments.remove(&stored.path).await {
                warn!(path = %stored.path, error = %cleanup, "orphaned attachment file");
            }
            return Err(err);
        }

        info!(uid = ticket.uid, path = %stored.path, "attachment added");
        self.events.publish(TicketEvent::Updated {
            ticket: ticket.clone(),
            by: requester.id,
        });
        self.view(ticket, requester).await
    }

    /// Drops the attachment record, then its backing file. A file that
    /// cannot be deleted is logged and left behind.
    pub async fn remove_attachment(
        &self,
        id: Uuid,
        attachment_id: Uuid,
        requester: &User,
    ) -> DomainResult<TicketView> {
        permissions::require(requester, Permission::RemoveAttachment)?;

        let mut ticket = self.load(id).await?;
        let removed = ticket
            .remove_attachment(attachment_id, requester.id, Utc::now())
            .ok_or_else(|| DomainError::not_found("Attachment", attachment_id))?;
        self.save(&mut ticket).await?;

        if let Err(err) = self.attachments.remove(&removed.path).await {
            warn!(path = %removed.path, error = %err, "attachment file could not be removed");
        }

        info!(uid = ticket.uid, attachment_id = %attachment_id, "attachment removed");
        self.events.publish(TicketEvent::Updated {
            ticket: ticket.clone(),
            by: requester.id,
        });
        self.view(ticket, requester).await
    }

    pub async fn subscribe(
        &self,
        id: Uuid,
        change: SubscriptionChange,
        requester: &User,
    ) -> DomainResult<TicketView> {
        if change.user != requester.id {
            permissions::require(requester, Permission::ManageSubscribers)?;
        }
        if self.users.find_by_id(change.user).await?.is_none() {
            return Err(DomainError::Validation(format!("unknown user {}", change.user)));
        }

        let mut ticket = self.load(id).await?;
        if ticket.set_subscribed(change.user, change.subscribe, requester.id, Utc::now()) {
            self.save(&mut ticket).await?;
        }

        self.events.publish(TicketEvent::SubscribersUpdated {
            ticket_id: ticket.id,
            uid: ticket.uid,
            subscribers: ticket.subscribers.clone(),
        });
        self.view(ticket, requester).await
    }

    pub async fn ticket_types(&self) -> DomainResult<Vec<TicketType>> {
        self.types.list().await
    }

    pub async fn create_type(&self, name: &str) -> DomainResult<TicketType> {
        let name = markdown::plain(name);
        if name.is_empty() {
            return Err(DomainError::Validation("ticket type name is required".into()));
        }
        if self.types.list().await?.iter().any(|t| t.name == name) {
            return Err(DomainError::Conflict(format!("ticket type '{name}' already exists")));
        }
        let ticket_type = TicketType {
            id: Uuid::new_v4(),
            name,
        };
        self.types.insert(&ticket_type).await?;
        Ok(ticket_type)
    }

    /// New and closed counts for the last twelve months, current month last.
    pub async fn month_data(&self, now: DateTime<Utc>) -> DomainResult<Vec<MonthBucket>> {
        self.bucket(stats::trailing_months(now, 12)?).await
    }

    pub async fn year_data(&self, year: i32) -> DomainResult<Vec<MonthBucket>> {
        self.bucket(stats::months_of_year(year)?).await
    }

    /// The `top` busiest groups, optionally only counting tickets created in
    /// the last `timespan_days`. A timespan reaching past the earliest
    /// representable date counts every ticket.
    pub async fn top_groups(&self, top: u32, timespan_days: Option<u32>) -> DomainResult<Vec<TopGroup>> {
        if top == 0 {
            return Err(DomainError::Validation("top must be at least 1".into()));
        }
        let since = timespan_days.and_then(|days| timespan_start(Utc::now(), days));
        let counts = self.tickets.count_by_group(since).await?;

        let ids: Vec<Uuid> = counts.iter().map(|c| c.group).collect();
        let groups = self.groups.find_many(&ids).await?;

        let mut top_groups: Vec<TopGroup> = counts
            .into_iter()
            .filter(|c| c.count > 0)
            .map(|c| TopGroup {
                group_id: c.group,
                name: groups
                    .iter()
                    .find(|g| g.id == c.group)
                    .map(|g| g.name.clone())
                    .unwrap_or_default(),
                count: c.count,
            })
            .collect();
        top_groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        top_groups.truncate(top as usize);
        Ok(top_groups)
    }

    async fn bucket(&self, months: Vec<(String, domains::DateRange)>) -> DomainResult<Vec<MonthBucket>> {
        let mut buckets = Vec::with_capacity(months.len());
        for (month, range) in months {
            buckets.push(MonthBucket {
                month,
                new_count: self.tickets.count_created(range).await?,
                closed_count: self.tickets.count_closed(range).await?,
            });
        }
        Ok(buckets)
    }

    async fn load(&self, id: Uuid) -> DomainResult<Ticket> {
        self.tickets
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Ticket", id))
    }

    async fn save(&self, ticket: &mut Ticket) -> DomainResult<()> {
        let expected = ticket.next_revision();
        self.tickets.replace(ticket, expected).await
    }

    async fn view(&self, ticket: Ticket, viewer: &User) -> DomainResult<TicketView> {
        let mut views = self.populate(vec![ticket], viewer).await?;
        views
            .pop()
            .ok_or_else(|| DomainError::Internal("ticket vanished while populating".into()))
    }

    async fn populate(&self, tickets: Vec<Ticket>, viewer: &User) -> DomainResult<Vec<TicketView>> {
        if tickets.is_empty() {
            return Ok(Vec::new());
        }
        let refs = References::collect(&tickets);
        let user_ids: Vec<Uuid> = refs.users.into_iter().collect();
        let group_ids: Vec<Uuid> = refs.groups.into_iter().collect();

        let users = self.users.find_many(&user_ids).await?;
        let groups = self.groups.find_many(&group_ids).await?;
        let types = self.types.list().await?;

        let lookup = Lookup::new(&users, &groups, types);
        let show_notes = permissions::allows(viewer.role, Permission::ViewNotes);
        Ok(tickets
            .into_iter()
            .map(|ticket| lookup.view(ticket, show_notes))
            .collect())
    }
}

fn stale(ticket: &Ticket, expected: u64) -> DomainError {
    DomainError::Conflict(format!(
        "ticket #{} is at version {}, not {expected}",
        ticket.uid, ticket.version
    ))
}

/// Start of a trailing window of `days`, `None` when it underflows the
/// calendar.
fn timespan_start(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    TimeDelta::try_days(i64::from(days)).and_then(|span| now.checked_sub_signed(span))
}

/// `"0,1"` → `[New, Open]`.
fn parse_statuses(raw: Option<&str>) -> DomainResult<Vec<TicketStatus>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u8>()
                .map_err(|_| DomainError::Validation(format!("invalid status '{part}'")))
                .and_then(TicketStatus::try_from)
        })
        .collect()
}
