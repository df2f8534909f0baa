//! Login, liveness and metrics.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::http::error::ApiResult;
use crate::http::extract::JsonBody;
use crate::http::state::AppState;
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(credentials): JsonBody<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let session = state
        .accounts
        .login(&credentials.username, &credentials.password)
        .await?;
    Ok(Json(json!({
        "success": true,
        "accessToken": session.access_token,
        "user": session.user,
    })))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, metrics::CONTENT_TYPE)], body).into_response(),
        Err(err) => {
            error!(error = %err, "metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
