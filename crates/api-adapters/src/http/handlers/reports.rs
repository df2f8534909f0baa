//! Read-only reporting endpoints.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::error::{ApiError, ApiResult};
use crate::http::extract::AuthUser;
use crate::http::state::AppState;

pub async fn types(State(state): State<AppState>, AuthUser(_): AuthUser) -> ApiResult<Json<Value>> {
    let types = state.tickets.ticket_types().await?;
    Ok(Json(json!({ "success": true, "types": types })))
}

pub async fn month_data(State(state): State<AppState>, AuthUser(_): AuthUser) -> ApiResult<Json<Value>> {
    let data = state.tickets.month_data(Utc::now()).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

pub async fn year_data(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(year): Path<String>,
) -> ApiResult<Json<Value>> {
    let year: i32 = year.parse().map_err(|_| ApiError::bad_request("Invalid Year"))?;
    let data = state.tickets.year_data(year).await?;
    Ok(Json(json!({ "success": true, "year": year, "data": data })))
}

#[derive(Debug, Default, Deserialize)]
pub struct TopGroupsQuery {
    /// Only count tickets created within this many days.
    pub timespan: Option<u32>,
}

pub async fn top_groups(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(top): Path<String>,
    query: Result<Query<TopGroupsQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let top: u32 = top.parse().map_err(|_| ApiError::bad_request("Invalid Count"))?;
    let Query(query) = query.map_err(|_| ApiError::bad_request("Invalid Timespan"))?;
    let items = state.tickets.top_groups(top, query.timespan).await?;
    Ok(Json(json!({ "success": true, "items": items })))
}
