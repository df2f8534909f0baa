use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgRow, Postgres};
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

use domains::{
    DateRange, DomainError, DomainResult, GroupCount, Ticket, TicketQuery, TicketRepository,
};

use super::{from_db_int, to_db_int};
use crate::error::StorageError;

pub struct PgTicketRepository {
    pool: PgPool,
}

impl PgTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_doc(&self, sql: &str, key: TicketKey) -> DomainResult<Option<Ticket>> {
        let query = sqlx::query(sql);
        let query = match key {
            TicketKey::Id(id) => query.bind(id),
            TicketKey::Uid(uid) => query.bind(uid),
        };
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        row.map(decode).transpose()
    }
}

enum TicketKey {
    Id(Uuid),
    Uid(i64),
}

fn decode(row: PgRow) -> DomainResult<Ticket> {
    let Json(ticket): Json<Ticket> = row.try_get("doc").map_err(StorageError::from)?;
    Ok(ticket)
}

/// `$1..$4` of every ticket listing query.
const FILTER: &str = "group_id = ANY($1) \
     AND (cardinality($2::smallint[]) = 0 OR status = ANY($2)) \
     AND ($3::uuid IS NULL OR assignee_id = $3) \
     AND ($4 OR NOT deleted)";

fn bind_filter<'q>(
    sql: sqlx::query::Query<'q, Postgres, PgArguments>,
    query: &TicketQuery,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    let statuses: Vec<i16> = query
        .statuses
        .iter()
        .map(|s| i16::from(u8::from(*s)))
        .collect();
    sql.bind(query.groups.clone())
        .bind(statuses)
        .bind(query.assignee)
        .bind(query.include_deleted)
}

fn status_code(ticket: &Ticket) -> i16 {
    i16::from(u8::from(ticket.status))
}

#[async_trait]
impl TicketRepository for PgTicketRepository {
    async fn next_uid(&self) -> DomainResult<u64> {
        let uid: i64 = sqlx::query_scalar("SELECT nextval('ticket_uid_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(from_db_int(uid, "ticket uid")?)
    }

    async fn insert(&self, ticket: &Ticket) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO tickets (id, uid, group_id, assignee_id, status, deleted, created_at, closed_at, version, doc) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(ticket.id)
        .bind(to_db_int(ticket.uid, "ticket uid")?)
        .bind(ticket.group)
        .bind(ticket.assignee)
        .bind(status_code(ticket))
        .bind(ticket.deleted)
        .bind(ticket.date)
        .bind(ticket.closed_date)
        .bind(to_db_int(ticket.version, "ticket version")?)
        .bind(Json(ticket))
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Ticket>> {
        self.fetch_doc("SELECT doc FROM tickets WHERE id = $1", TicketKey::Id(id))
            .await
    }

    async fn find_by_uid(&self, uid: u64) -> DomainResult<Option<Ticket>> {
        let uid = to_db_int(uid, "ticket uid")?;
        self.fetch_doc("SELECT doc FROM tickets WHERE uid = $1", TicketKey::Uid(uid))
            .await
    }

    async fn list(&self, query: &TicketQuery) -> DomainResult<Vec<Ticket>> {
        let sql = format!("SELECT doc FROM tickets WHERE {FILTER} ORDER BY uid DESC LIMIT $5 OFFSET $6");
        let rows = bind_filter(sqlx::query(&sql), query)
            .bind(i64::from(query.limit))
            .bind(to_db_int(query.offset, "offset")?)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        rows.into_iter().map(decode).collect()
    }

    async fn count(&self, query: &TicketQuery) -> DomainResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM tickets WHERE {FILTER}");
        let row = bind_filter(sqlx::query(&sql), query)
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)?;
        let count: i64 = row.try_get(0).map_err(StorageError::from)?;
        Ok(from_db_int(count, "count")?)
    }

    async fn replace(&self, ticket: &Ticket, expected_version: u64) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE tickets \
             SET group_id = $2, assignee_id = $3, status = $4, deleted = $5, closed_at = $6, version = $7, doc = $8 \
             WHERE id = $1 AND version = $9 AND uid = $10",
        )
        .bind(ticket.id)
        .bind(ticket.group)
        .bind(ticket.assignee)
        .bind(status_code(ticket))
        .bind(ticket.deleted)
        .bind(ticket.closed_date)
        .bind(to_db_int(ticket.version, "ticket version")?)
        .bind(Json(ticket))
        .bind(to_db_int(expected_version, "ticket version")?)
        .bind(to_db_int(ticket.uid, "ticket uid")?)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let current: Option<(i64, i64)> = sqlx::query_as("SELECT version, uid FROM tickets WHERE id = $1")
            .bind(ticket.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        match current {
            None => Err(DomainError::not_found("Ticket", ticket.id)),
            Some((_, uid)) if from_db_int(uid, "ticket uid")? != ticket.uid => {
                Err(DomainError::Validation("ticket uid is immutable".into()))
            }
            Some((version, _)) => Err(DomainError::Conflict(format!(
                "ticket #{} is at version {version}, expected {expected_version}",
                ticket.uid
            ))),
        }
    }

    async fn count_created(&self, range: DateRange) -> DomainResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets WHERE NOT deleted AND created_at >= $1 AND created_at < $2",
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(from_db_int(count, "count")?)
    }

    async fn count_closed(&self, range: DateRange) -> DomainResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets WHERE NOT deleted AND closed_at >= $1 AND closed_at < $2",
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(from_db_int(count, "count")?)
    }

    async fn count_by_group(&self, since: Option<DateTime<Utc>>) -> DomainResult<Vec<GroupCount>> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            "SELECT group_id, COUNT(*) FROM tickets \
             WHERE NOT deleted AND ($1::timestamptz IS NULL OR created_at >= $1) \
             GROUP BY group_id",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;

        rows.into_iter()
            .map(|(group, count)| -> DomainResult<GroupCount> {
                Ok(GroupCount {
                    group,
                    count: from_db_int(count, "count")?,
                })
            })
            .collect()
    }
}
