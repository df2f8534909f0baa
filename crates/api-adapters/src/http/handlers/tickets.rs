//! Ticket endpoints. Every response carries a `success` discriminator.

use axum::{
    extract::{rejection::QueryRejection, Multipart, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use domains::{DomainError, NewComment, NewNote, NewTicket, SubscriptionChange, TicketFilter, TicketPatch};

use crate::http::error::{ApiError, ApiResult};
use crate::http::extract::{parse_ticket_id, AuthUser, JsonBody};
use crate::http::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    filter: Result<Query<TicketFilter>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(filter) = filter.map_err(|err| {
        warn!(error = %err.body_text(), "rejected ticket filter");
        ApiError::bad_request("Invalid filter")
    })?;
    let page = state.tickets.list(&user, filter).await?;
    Ok(Json(json!({ "success": true, "count": page.total, "tickets": page.tickets })))
}

/// The body must be a JSON object; tags may be a delimited string or an
/// array.
pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(payload): JsonBody<Value>,
) -> ApiResult<Json<Value>> {
    if !payload.is_object() {
        return Err(ApiError::bad_request("Invalid Post Data"));
    }
    let input: NewTicket = serde_json::from_value(payload).map_err(|err| {
        warn!(error = %err, "malformed ticket payload");
        ApiError::bad_request("Invalid Post Data")
    })?;
    let ticket = state.tickets.create(&user, input).await?;
    Ok(Json(json!({ "success": true, "ticket": ticket })))
}

/// Unknown or malformed numbers answer 200 with `success:false`.
pub async fn get_by_uid(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(uid): Path<String>,
) -> ApiResult<Json<Value>> {
    let uid: u64 = uid.parse().map_err(|_| ApiError::soft("Invalid Ticket"))?;
    match state.tickets.get_by_uid(uid, &user).await {
        Ok(ticket) => Ok(Json(json!({ "success": true, "ticket": ticket }))),
        Err(DomainError::NotFound(..)) => Err(ApiError::soft("Invalid Ticket")),
        Err(err) => Err(err.into()),
    }
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<TicketPatch>,
) -> ApiResult<Json<Value>> {
    let id = parse_ticket_id(&id)?;
    let ticket = state.tickets.update(id, patch, &user).await?;
    Ok(Json(json!({ "success": true, "ticket": ticket })))
}

pub async fn soft_delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_ticket_id(&id)?;
    state.tickets.soft_delete(id, &user).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn restore(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_ticket_id(&id)?;
    let ticket = state.tickets.restore(id, &user).await?;
    Ok(Json(json!({ "success": true, "ticket": ticket })))
}

pub async fn post_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<NewComment>,
) -> ApiResult<Json<Value>> {
    let id = parse_ticket_id(&id)?;
    let ticket = state.tickets.post_comment(id, input, &user).await?;
    Ok(Json(json!({ "success": true, "ticket": ticket })))
}

pub async fn post_note(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<NewNote>,
) -> ApiResult<Json<Value>> {
    let id = parse_ticket_id(&id)?;
    let ticket = state.tickets.post_note(id, &input.note, &user).await?;
    Ok(Json(json!({ "success": true, "ticket": ticket })))
}

/// Takes the first multipart field that carries a file name.
pub async fn add_attachment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let id = parse_ticket_id(&id)?;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        warn!(error = %err, "malformed multipart body");
        ApiError::bad_request("Invalid Attachment")
    })? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .and_then(|ct| ct.parse::<mime::Mime>().ok())
            .unwrap_or_else(|| mime_guess::from_path(&file_name).first_or_octet_stream());
        let data = field.bytes().await.map_err(|err| {
            warn!(error = %err, "attachment upload interrupted");
            ApiError::bad_request("Invalid Attachment")
        })?;

        info!(ticket_id = %id, file_name = %file_name, size = data.len(), "attachment upload");
        let ticket = state
            .tickets
            .add_attachment(id, &file_name, content_type, data, &user)
            .await?;
        return Ok(Json(json!({ "success": true, "ticket": ticket })));
    }

    Err(ApiError::bad_request("Invalid Attachment"))
}

pub async fn remove_attachment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((id, attachment_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let id = parse_ticket_id(&id)?;
    let attachment_id = attachment_id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid Attachment"))?;
    let ticket = state
        .tickets
        .remove_attachment(id, attachment_id, &user)
        .await?;
    Ok(Json(json!({ "success": true, "ticket": ticket })))
}

pub async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    JsonBody(change): JsonBody<SubscriptionChange>,
) -> ApiResult<Json<Value>> {
    let id = parse_ticket_id(&id)?;
    let ticket = state.tickets.subscribe(id, change, &user).await?;
    Ok(Json(json!({ "success": true, "ticket": ticket })))
}
