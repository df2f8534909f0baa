//! Users, groups and ticket types kept in process memory.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use domains::{
    DomainError, DomainResult, Group, GroupRepository, TicketType, TicketTypeRepository, User,
    UserRepository,
};

#[derive(Default)]
pub struct MemoryUserRepository {
    users: DashMap<Uuid, User>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: &User) -> DomainResult<()> {
        if self.users.iter().any(|u| u.username == user.username) {
            return Err(DomainError::Conflict(format!("username '{}' is taken", user.username)));
        }
        match self.users.entry(user.id) {
            Entry::Occupied(_) => Err(DomainError::Conflict(format!("user {} already exists", user.id))),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_many(&self, ids: &[Uuid]) -> DomainResult<Vec<User>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.value().clone()))
            .collect())
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.value().clone()))
    }

    async fn find_by_token_digest(&self, digest: &str) -> DomainResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.access_token_digest.as_deref() == Some(digest))
            .map(|u| u.value().clone()))
    }

    async fn set_token_digest(&self, id: Uuid, digest: &str) -> DomainResult<()> {
        let Some(mut user) = self.users.get_mut(&id) else {
            return Err(DomainError::not_found("User", id));
        };
        user.access_token_digest = Some(digest.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryGroupRepository {
    groups: DashMap<Uuid, Group>,
}

impl MemoryGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroupRepository for MemoryGroupRepository {
    async fn insert(&self, group: &Group) -> DomainResult<()> {
        match self.groups.entry(group.id) {
            Entry::Occupied(_) => Err(DomainError::Conflict(format!("group {} already exists", group.id))),
            Entry::Vacant(slot) => {
                slot.insert(group.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Group>> {
        Ok(self.groups.get(&id).map(|g| g.value().clone()))
    }

    async fn find_many(&self, ids: &[Uuid]) -> DomainResult<Vec<Group>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.groups.get(id).map(|g| g.value().clone()))
            .collect())
    }

    async fn list_for_member(&self, user_id: Uuid) -> DomainResult<Vec<Group>> {
        let mut groups: Vec<Group> = self
            .groups
            .iter()
            .filter(|g| g.has_member(user_id))
            .map(|g| g.value().clone())
            .collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }
}

#[derive(Default)]
pub struct MemoryTicketTypeRepository {
    types: DashMap<Uuid, TicketType>,
}

impl MemoryTicketTypeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketTypeRepository for MemoryTicketTypeRepository {
    async fn insert(&self, ticket_type: &TicketType) -> DomainResult<()> {
        if self.types.iter().any(|t| t.name == ticket_type.name) {
            return Err(DomainError::Conflict(format!(
                "ticket type '{}' already exists",
                ticket_type.name
            )));
        }
        self.types.insert(ticket_type.id, ticket_type.clone());
        Ok(())
    }

    async fn list(&self) -> DomainResult<Vec<TicketType>> {
        let mut types: Vec<TicketType> = self.types.iter().map(|t| t.value().clone()).collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<TicketType>> {
        Ok(self.types.get(&id).map(|t| t.value().clone()))
    }
}
