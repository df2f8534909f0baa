use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use domains::{
    DomainError, DomainResult, Group, GroupRepository, Role, TicketType, TicketTypeRepository,
    User, UserRepository,
};

use crate::error::StorageError;

const USER_COLUMNS: &str =
    "id, username, fullname, email, role, password_hash, token_digest, created_at";

fn user_from_row(row: PgRow) -> DomainResult<User> {
    let role: String = row.try_get("role").map_err(StorageError::from)?;
    Ok(User {
        id: row.try_get("id").map_err(StorageError::from)?,
        username: row.try_get("username").map_err(StorageError::from)?,
        fullname: row.try_get("fullname").map_err(StorageError::from)?,
        email: row.try_get("email").map_err(StorageError::from)?,
        role: role
            .parse::<Role>()
            .map_err(|_| StorageError::Corrupt(format!("unknown role '{role}'")))?,
        password_hash: row.try_get("password_hash").map_err(StorageError::from)?,
        access_token_digest: row.try_get("token_digest").map_err(StorageError::from)?,
        created_at: row.try_get("created_at").map_err(StorageError::from)?,
    })
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_optional(&self, filter: &str, value: &str) -> DomainResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter} = $1");
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        row.map(user_from_row).transpose()
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: &User) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO users (id, username, fullname, email, role, password_hash, token_digest, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.fullname)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(&user.access_token_digest)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        row.map(user_from_row).transpose()
    }

    async fn find_many(&self, ids: &[Uuid]) -> DomainResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        let rows = sqlx::query(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        rows.into_iter().map(user_from_row).collect()
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        self.fetch_optional("username", username).await
    }

    async fn find_by_token_digest(&self, digest: &str) -> DomainResult<Option<User>> {
        self.fetch_optional("token_digest", digest).await
    }

    async fn set_token_digest(&self, id: Uuid, digest: &str) -> DomainResult<()> {
        let result = sqlx::query("UPDATE users SET token_digest = $2 WHERE id = $1")
            .bind(id)
            .bind(digest)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("User", id));
        }
        Ok(())
    }
}

fn group_from_row(row: PgRow) -> DomainResult<Group> {
    Ok(Group {
        id: row.try_get("id").map_err(StorageError::from)?,
        name: row.try_get("name").map_err(StorageError::from)?,
        members: row.try_get("members").map_err(StorageError::from)?,
        created_at: row.try_get("created_at").map_err(StorageError::from)?,
    })
}

pub struct PgGroupRepository {
    pool: PgPool,
}

impl PgGroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn insert(&self, group: &Group) -> DomainResult<()> {
        sqlx::query("INSERT INTO user_groups (id, name, members, created_at) VALUES ($1, $2, $3, $4)")
            .bind(group.id)
            .bind(&group.name)
            .bind(&group.members)
            .bind(group.created_at)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Group>> {
        let row = sqlx::query("SELECT id, name, members, created_at FROM user_groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        row.map(group_from_row).transpose()
    }

    async fn find_many(&self, ids: &[Uuid]) -> DomainResult<Vec<Group>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query("SELECT id, name, members, created_at FROM user_groups WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        rows.into_iter().map(group_from_row).collect()
    }

    async fn list_for_member(&self, user_id: Uuid) -> DomainResult<Vec<Group>> {
        let rows = sqlx::query(
            "SELECT id, name, members, created_at FROM user_groups \
             WHERE members @> ARRAY[$1]::uuid[] ORDER BY name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;
        rows.into_iter().map(group_from_row).collect()
    }
}

pub struct PgTicketTypeRepository {
    pool: PgPool,
}

impl PgTicketTypeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TicketTypeRepository for PgTicketTypeRepository {
    async fn insert(&self, ticket_type: &TicketType) -> DomainResult<()> {
        sqlx::query("INSERT INTO ticket_types (id, name) VALUES ($1, $2)")
            .bind(ticket_type.id)
            .bind(&ticket_type.name)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn list(&self) -> DomainResult<Vec<TicketType>> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as("SELECT id, name FROM ticket_types ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| TicketType { id, name })
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<TicketType>> {
        let row: Option<(Uuid, String)> = sqlx::query_as("SELECT id, name FROM ticket_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|(id, name)| TicketType { id, name }))
    }
}
