//! Request extractors.

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use domains::User;

use super::error::ApiError;
use super::state::AppState;

pub const ACCESS_TOKEN_HEADER: &str = "accesstoken";

/// The user behind the `accesstoken` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(ACCESS_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Invalid Access Token"))?;
        let user = state.auth.authenticate(token).await?;
        Ok(Self(user))
    }
}

/// `axum::Json` whose rejection uses the `success:false` envelope.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

pub fn parse_ticket_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse().map_err(|_| ApiError::invalid_ticket())
}
