//! `reqwest` dispatcher for [`TicketAction`]s.

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::actions::{Payload, TicketAction};
use crate::error::ClientError;

pub const ACCESS_TOKEN_HEADER: &str = "accesstoken";

/// What a front-end store receives once an action's request completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    #[serde(rename = "type")]
    pub action_type: &'static str,
    pub payload: Value,
}

#[derive(Debug, Clone)]
pub struct HelpdeskClient {
    http: Client,
    base_url: String,
    access_token: Option<String>,
}

impl HelpdeskClient {
    /// `base_url` is the server root, e.g. `http://localhost:8118`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Logs in and keeps the issued token for later dispatches.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<ActionResult, ClientError> {
        let result = self
            .dispatch(TicketAction::Login {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;
        self.access_token = result.payload["accessToken"].as_str().map(str::to_string);
        Ok(result)
    }

    pub async fn dispatch(&self, action: TicketAction) -> Result<ActionResult, ClientError> {
        let action_type = action.action_type();
        let endpoint = action.endpoint()?;
        let url = format!("{}/api/v1{}", self.base_url, endpoint.path);

        let mut request = self.http.request(endpoint.method.clone(), &url);
        if action.requires_auth() {
            let token = self
                .access_token
                .as_deref()
                .ok_or(ClientError::NotAuthenticated(action_type))?;
            request = request.header(ACCESS_TOKEN_HEADER, token);
        }
        request = match endpoint.payload {
            Payload::None => request,
            Payload::Json(body) => request.json(&body),
            Payload::File {
                file_name,
                content_type,
                data,
            } => {
                let part = Part::bytes(data.to_vec())
                    .file_name(file_name)
                    .mime_str(&content_type)?;
                request.multipart(Form::new().part("attachment", part))
            }
        };

        debug!(action = action_type, method = %endpoint.method, %url, "dispatching");
        let response = request.send().await?;
        let status = response.status().as_u16();
        let payload: Value = response.json().await?;

        if payload["success"].as_bool() == Some(true) {
            Ok(ActionResult {
                action_type,
                payload,
            })
        } else {
            Err(ClientError::Api {
                action_type,
                status,
                message: payload["error"].as_str().unwrap_or("unknown error").to_string(),
            })
        }
    }
}
