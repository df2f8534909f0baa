//! # Ticket actions
//!
//! One constructor per API operation, shaped like the messages a front-end
//! store dispatches. Each action knows its stable action type and the HTTP
//! call that fulfils it.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use domains::{TicketPriority, TicketStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub assigned_self: bool,
    /// Statuses joined into the comma list the API expects.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "status_list")]
    pub status: Option<Vec<TicketStatus>>,
}

fn status_list<S: serde::Serializer>(statuses: &Option<Vec<TicketStatus>>, s: S) -> Result<S::Ok, S::Error> {
    let joined = statuses
        .iter()
        .flatten()
        .map(|status| u8::from(*status).to_string())
        .collect::<Vec<_>>()
        .join(",");
    s.serialize_str(&joined)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicketRequest {
    pub subject: String,
    pub issue: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Uuid>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ticket_type: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TicketPriority>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Only the fields that are `Some` are sent. `Some(None)` sends `null`,
/// which clears `closedDate` or `assignee`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Option<Uuid>>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ticket_type: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TicketPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TicketAction {
    Login { username: String, password: String },
    FetchTickets(TicketQuery),
    CreateTicket(NewTicketRequest),
    FetchTicket { uid: u64 },
    UpdateTicket { id: Uuid, update: TicketUpdate },
    DeleteTicket { id: Uuid },
    RestoreTicket { id: Uuid },
    PostComment { id: Uuid, comment: String, owner_id: Option<Uuid> },
    PostNote { id: Uuid, note: String },
    UploadAttachment { id: Uuid, file_name: String, content_type: String, data: Bytes },
    RemoveAttachment { id: Uuid, attachment_id: Uuid },
    SetSubscription { id: Uuid, user: Uuid, subscribe: bool },
    FetchTicketTypes,
    FetchMonthData,
    FetchYearData { year: i32 },
    FetchTopGroups { top: u32, timespan_days: Option<u32> },
}

/// How an action maps onto the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    None,
    Json(Value),
    File { file_name: String, content_type: String, data: Bytes },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub method: Method,
    /// Path below `/api/v1`, query string included.
    pub path: String,
    pub payload: Payload,
}

impl TicketAction {
    pub fn action_type(&self) -> &'static str {
        match self {
            TicketAction::Login { .. } => "LOGIN",
            TicketAction::FetchTickets(_) => "FETCH_TICKETS",
            TicketAction::CreateTicket(_) => "CREATE_TICKET",
            TicketAction::FetchTicket { .. } => "FETCH_SINGLE_TICKET",
            TicketAction::UpdateTicket { .. } => "UPDATE_TICKET",
            TicketAction::DeleteTicket { .. } => "DELETE_TICKET",
            TicketAction::RestoreTicket { .. } => "RESTORE_TICKET",
            TicketAction::PostComment { .. } => "TICKET_COMMENT_ADD",
            TicketAction::PostNote { .. } => "TICKET_NOTE_ADD",
            TicketAction::UploadAttachment { .. } => "TICKET_ATTACHMENT_UPLOAD",
            TicketAction::RemoveAttachment { .. } => "TICKET_ATTACHMENT_REMOVE",
            TicketAction::SetSubscription { .. } => "TICKET_SUBSCRIBE",
            TicketAction::FetchTicketTypes => "FETCH_TICKET_TYPES",
            TicketAction::FetchMonthData => "FETCH_DASHBOARD_MONTH_DATA",
            TicketAction::FetchYearData { .. } => "FETCH_DASHBOARD_YEAR_DATA",
            TicketAction::FetchTopGroups { .. } => "FETCH_DASHBOARD_TOP_GROUPS",
        }
    }

    /// Every action except `Login` needs an access token.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, TicketAction::Login { .. })
    }

    pub fn endpoint(&self) -> Result<Endpoint, serde_json::Error> {
        let (method, path, payload) = match self {
            TicketAction::Login { username, password } => (
                Method::POST,
                "/login".to_string(),
                Payload::Json(json!({ "username": username, "password": password })),
            ),
            TicketAction::FetchTickets(query) => {
                let params = serde_json::to_value(query)?;
                (Method::GET, format!("/tickets{}", query_string(&params)), Payload::None)
            }
            TicketAction::CreateTicket(ticket) => (
                Method::POST,
                "/tickets/create".to_string(),
                Payload::Json(serde_json::to_value(ticket)?),
            ),
            TicketAction::FetchTicket { uid } => (Method::GET, format!("/tickets/{uid}"), Payload::None),
            TicketAction::UpdateTicket { id, update } => (
                Method::PUT,
                format!("/tickets/{id}"),
                Payload::Json(serde_json::to_value(update)?),
            ),
            TicketAction::DeleteTicket { id } => (Method::DELETE, format!("/tickets/{id}"), Payload::None),
            TicketAction::RestoreTicket { id } => (Method::POST, format!("/tickets/{id}/restore"), Payload::None),
            TicketAction::PostComment { id, comment, owner_id } => (
                Method::POST,
                format!("/tickets/{id}/comment"),
                Payload::Json(match owner_id {
                    Some(owner) => json!({ "comment": comment, "ownerId": owner }),
                    None => json!({ "comment": comment }),
                }),
            ),
            TicketAction::PostNote { id, note } => (
                Method::POST,
                format!("/tickets/{id}/note"),
                Payload::Json(json!({ "note": note })),
            ),
            TicketAction::UploadAttachment {
                id,
                file_name,
                content_type,
                data,
            } => (
                Method::POST,
                format!("/tickets/{id}/attachments"),
                Payload::File {
                    file_name: file_name.clone(),
                    content_type: content_type.clone(),
                    data: data.clone(),
                },
            ),
            TicketAction::RemoveAttachment { id, attachment_id } => (
                Method::DELETE,
                format!("/tickets/{id}/attachments/{attachment_id}"),
                Payload::None,
            ),
            TicketAction::SetSubscription { id, user, subscribe } => (
                Method::POST,
                format!("/tickets/{id}/subscribe"),
                Payload::Json(json!({ "user": user, "subscribe": subscribe })),
            ),
            TicketAction::FetchTicketTypes => (Method::GET, "/tickets/types".to_string(), Payload::None),
            TicketAction::FetchMonthData => (Method::GET, "/tickets/stats/month".to_string(), Payload::None),
            TicketAction::FetchYearData { year } => {
                (Method::GET, format!("/tickets/stats/year/{year}"), Payload::None)
            }
            TicketAction::FetchTopGroups { top, timespan_days } => {
                let path = match timespan_days {
                    Some(days) => format!("/tickets/count/topgroups/{top}?timespan={days}"),
                    None => format!("/tickets/count/topgroups/{top}"),
                };
                (Method::GET, path, Payload::None)
            }
        };
        Ok(Endpoint { method, path, payload })
    }
}

/// Flat JSON object → `?k=v&...`. Values here are numbers, booleans or
/// comma lists of digits, so no percent-encoding is needed.
fn query_string(params: &Value) -> String {
    let Some(map) = params.as_object().filter(|m| !m.is_empty()) else {
        return String::new();
    };
    let pairs: Vec<String> = map
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{key}={s}"),
            other => format!("{key}={other}"),
        })
        .collect();
    format!("?{}", pairs.join("&"))
}
