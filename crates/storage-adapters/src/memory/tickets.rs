use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use uuid::Uuid;

use domains::{
    DateRange, DomainError, DomainResult, GroupCount, Ticket, TicketQuery, TicketRepository,
};

use super::FIRST_TICKET_UID;

/// Ticket documents held in a sharded concurrent map. Each `replace` runs
/// its version check and write under the shard lock of that ticket.
pub struct MemoryTicketRepository {
    tickets: DashMap<Uuid, Ticket>,
    next_uid: AtomicU64,
}

impl Default for MemoryTicketRepository {
    fn default() -> Self {
        Self {
            tickets: DashMap::new(),
            next_uid: AtomicU64::new(FIRST_TICKET_UID),
        }
    }
}

impl MemoryTicketRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

#[async_trait]
impl TicketRepository for MemoryTicketRepository {
    async fn next_uid(&self) -> DomainResult<u64> {
        Ok(self.next_uid.fetch_add(1, Ordering::SeqCst))
    }

    async fn insert(&self, ticket: &Ticket) -> DomainResult<()> {
        if self.tickets.iter().any(|t| t.uid == ticket.uid) {
            return Err(DomainError::Conflict(format!("ticket uid {} already exists", ticket.uid)));
        }
        match self.tickets.entry(ticket.id) {
            Entry::Occupied(_) => Err(DomainError::Conflict(format!("ticket {} already exists", ticket.id))),
            Entry::Vacant(slot) => {
                slot.insert(ticket.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Ticket>> {
        Ok(self.tickets.get(&id).map(|t| t.value().clone()))
    }

    async fn find_by_uid(&self, uid: u64) -> DomainResult<Option<Ticket>> {
        Ok(self
            .tickets
            .iter()
            .find(|t| t.uid == uid)
            .map(|t| t.value().clone()))
    }

    async fn list(&self, query: &TicketQuery) -> DomainResult<Vec<Ticket>> {
        let mut matching: Vec<Ticket> = self
            .tickets
            .iter()
            .filter(|t| query.matches(t.value()))
            .map(|t| t.value().clone())
            .collect();
        matching.sort_by(|a, b| b.uid.cmp(&a.uid));

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect())
    }

    async fn count(&self, query: &TicketQuery) -> DomainResult<u64> {
        Ok(self.tickets.iter().filter(|t| query.matches(t.value())).count() as u64)
    }

    async fn replace(&self, ticket: &Ticket, expected_version: u64) -> DomainResult<()> {
        let Some(mut stored) = self.tickets.get_mut(&ticket.id) else {
            return Err(DomainError::not_found("Ticket", ticket.id));
        };
        if stored.version != expected_version {
            return Err(DomainError::Conflict(format!(
                "ticket #{} is at version {}, expected {expected_version}",
                stored.uid, stored.version
            )));
        }
        if stored.uid != ticket.uid {
            return Err(DomainError::Validation("ticket uid is immutable".into()));
        }
        *stored = ticket.clone();
        Ok(())
    }

    async fn count_created(&self, range: DateRange) -> DomainResult<u64> {
        Ok(self
            .tickets
            .iter()
            .filter(|t| !t.deleted && range.contains(t.date))
            .count() as u64)
    }

    async fn count_closed(&self, range: DateRange) -> DomainResult<u64> {
        Ok(self
            .tickets
            .iter()
            .filter(|t| !t.deleted && t.closed_date.is_some_and(|closed| range.contains(closed)))
            .count() as u64)
    }

    async fn count_by_group(&self, since: Option<DateTime<Utc>>) -> DomainResult<Vec<GroupCount>> {
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for ticket in self.tickets.iter() {
            if ticket.deleted || since.is_some_and(|since| ticket.date < since) {
                continue;
            }
            *counts.entry(ticket.group).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(group, count)| GroupCount { group, count })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use domains::{TicketDraft, TicketPriority, TicketStatus};

    fn ticket(uid: u64, group: Uuid) -> Ticket {
        Ticket::open(
            TicketDraft {
                owner: Uuid::new_v4(),
                group,
                ticket_type: Uuid::new_v4(),
                priority: TicketPriority::Normal,
                tags: Vec::new(),
                subject: format!("ticket {uid}"),
                issue: String::new(),
            },
            uid,
            Utc::now(),
        )
    }

    fn query(groups: Vec<Uuid>) -> TicketQuery {
        TicketQuery {
            groups,
            limit: 10,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn uids_start_at_one_thousand() {
        let repo = MemoryTicketRepository::new();
        assert_eq!(repo.next_uid().await.unwrap(), 1000);
        assert_eq!(repo.next_uid().await.unwrap(), 1001);
    }

    #[tokio::test]
    async fn duplicate_uid_is_rejected() {
        let repo = MemoryTicketRepository::new();
        let group = Uuid::new_v4();
        repo.insert(&ticket(1000, group)).await.unwrap();
        let err = repo.insert(&ticket(1000, group)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_filters_orders_and_pages() {
        let repo = MemoryTicketRepository::new();
        let mine = Uuid::new_v4();
        let other = Uuid::new_v4();
        for uid in 1000..1005 {
            repo.insert(&ticket(uid, mine)).await.unwrap();
        }
        repo.insert(&ticket(1005, other)).await.unwrap();

        let mut deleted = ticket(1006, mine);
        deleted.deleted = true;
        repo.insert(&deleted).await.unwrap();

        let uids: Vec<u64> = repo.list(&query(vec![mine])).await.unwrap().iter().map(|t| t.uid).collect();
        assert_eq!(uids, vec![1004, 1003, 1002, 1001, 1000]);

        let mut paged = query(vec![mine]);
        paged.limit = 2;
        paged.offset = 2;
        let uids: Vec<u64> = repo.list(&paged).await.unwrap().iter().map(|t| t.uid).collect();
        assert_eq!(uids, vec![1002, 1001]);
        assert_eq!(repo.count(&paged).await.unwrap(), 5);

        let mut closed_only = query(vec![mine]);
        closed_only.statuses = vec![TicketStatus::Closed];
        assert!(repo.list(&closed_only).await.unwrap().is_empty());

        assert!(repo.list(&query(Vec::new())).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replace_checks_version() {
        let repo = MemoryTicketRepository::new();
        let mut t = ticket(1000, Uuid::new_v4());
        repo.insert(&t).await.unwrap();

        let expected = t.next_revision();
        t.subject = "changed".into();
        repo.replace(&t, expected).await.unwrap();

        let mut stale = t.clone();
        stale.version = 1;
        let err = repo.replace(&stale, 0).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let stored = repo.find_by_id(t.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.subject, "changed");
    }

    #[tokio::test]
    async fn soft_deleted_tickets_stay_reachable() {
        let repo = MemoryTicketRepository::new();
        let mut t = ticket(1000, Uuid::new_v4());
        repo.insert(&t).await.unwrap();
        t.soft_delete(t.owner, Utc::now());
        let expected = t.next_revision();
        repo.replace(&t, expected).await.unwrap();

        assert_eq!(repo.len(), 1);
        assert!(repo.find_by_id(t.id).await.unwrap().unwrap().deleted);
        assert!(repo.find_by_uid(1000).await.unwrap().unwrap().deleted);
    }

    #[tokio::test]
    async fn counting_respects_ranges_and_deletion() {
        let repo = MemoryTicketRepository::new();
        let group = Uuid::new_v4();
        let jan = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();

        let mut a = ticket(1000, group);
        a.date = jan;
        a.closed_date = Some(jan + Duration::days(40));
        let mut b = ticket(1001, group);
        b.date = jan;
        b.deleted = true;
        repo.insert(&a).await.unwrap();
        repo.insert(&b).await.unwrap();

        let january = DateRange {
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        };
        let february = DateRange {
            start: january.end,
            end: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        };
        assert_eq!(repo.count_created(january).await.unwrap(), 1);
        assert_eq!(repo.count_closed(january).await.unwrap(), 0);
        assert_eq!(repo.count_closed(february).await.unwrap(), 1);

        let counts = repo.count_by_group(None).await.unwrap();
        assert_eq!(counts, vec![GroupCount { group, count: 1 }]);
        assert!(repo
            .count_by_group(Some(jan + Duration::days(1)))
            .await
            .unwrap()
            .is_empty());
    }
}
