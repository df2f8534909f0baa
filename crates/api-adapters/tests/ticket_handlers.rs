//! Router-level tests: real handlers over in-memory adapters, driven with
//! `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use api_adapters::{build_router, AppState};
use auth_adapters::{AccessTokenAuthenticator, Argon2Credentials};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use services::{AccountService, TicketService};
use storage_adapters::media_local::LocalAttachmentStorage;
use storage_adapters::memory::{
    MemoryGroupRepository, MemoryTicketRepository, MemoryTicketTypeRepository, MemoryUserRepository,
};
use storage_adapters::BroadcastEventBus;
use tower::ServiceExt;
use uuid::Uuid;

use domains::{CredentialHasher, Group, GroupRepository, Role, User, UserRepository};

const ADMIN_TOKEN: &str = "admin-token";
const USER_TOKEN: &str = "user-token";

async fn app() -> Router {
    let users = Arc::new(MemoryUserRepository::new());
    let groups = Arc::new(MemoryGroupRepository::new());
    let hasher = Arc::new(Argon2Credentials::new());

    let mut members = Vec::new();
    for (name, role, token) in [("admin", Role::Admin, ADMIN_TOKEN), ("user", Role::User, USER_TOKEN)] {
        let user = User {
            id: Uuid::new_v4(),
            username: name.into(),
            fullname: name.to_uppercase(),
            email: format!("{name}@example.com"),
            role,
            password_hash: String::new(),
            access_token_digest: Some(hasher.digest_token(token)),
            created_at: Utc::now(),
        };
        users.insert(&user).await.unwrap();
        members.push(user.id);
    }
    groups
        .insert(&Group {
            id: Uuid::new_v4(),
            name: "Support".into(),
            members,
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    let tickets = TicketService::new(
        Arc::new(MemoryTicketRepository::new()),
        users.clone(),
        groups.clone(),
        Arc::new(MemoryTicketTypeRepository::new()),
        Arc::new(LocalAttachmentStorage::new(
            std::env::temp_dir().join(format!("helpdesk-api-{}", Uuid::new_v4())),
        )),
        Arc::new(BroadcastEventBus::default()),
    );
    tickets.create_type("Issue").await.unwrap();

    let accounts = AccountService::new(users.clone(), groups, hasher.clone());
    let auth = Arc::new(AccessTokenAuthenticator::new(users, hasher));
    build_router(AppState::new(tickets, accounts, auth))
}

async fn send(router: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("accesstoken", token);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn create(router: &Router, body: Value) -> Value {
    let (status, json) = send(router, "POST", "/api/v1/tickets/create", Some(ADMIN_TOKEN), Some(body)).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    json["ticket"].clone()
}

#[tokio::test]
async fn missing_or_unknown_token_is_rejected() {
    let router = app().await;

    let (status, json) = send(&router, "GET", "/api/v1/tickets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json, json!({ "success": false, "error": "Invalid Access Token" }));

    let (status, _) = send(&router, "GET", "/api/v1/tickets", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_normalizes_tags_and_renders_issue() {
    let router = app().await;
    let ticket = create(
        &router,
        json!({ "subject": "Subject", "issue": "line one\nline two", "tags": "a, b,,c" }),
    )
    .await;

    assert_eq!(ticket["uid"], 1000);
    assert_eq!(ticket["tags"], json!(["a", "b", "c"]));
    assert_eq!(ticket["comments"], json!([]));
    assert_eq!(ticket["history"].as_array().unwrap().len(), 1);
    assert_eq!(ticket["subscribers"].as_array().unwrap().len(), 1);
    assert_eq!(ticket["status"], 0);
    assert_eq!(ticket["group"]["name"], "Support");
    assert_eq!(ticket["type"]["name"], "Issue");
    assert!(ticket["issue"].as_str().unwrap().contains("<br />"));
}

#[tokio::test]
async fn create_rejects_non_object_and_missing_subject() {
    let router = app().await;

    let (status, json) = send(&router, "POST", "/api/v1/tickets/create", Some(ADMIN_TOKEN), Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let (status, json) = send(&router, "POST", "/api/v1/tickets/create", Some(ADMIN_TOKEN), Some(json!({ "issue": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "subject is required");
}

#[tokio::test]
async fn unknown_uid_is_a_soft_failure() {
    let router = app().await;

    let (status, json) = send(&router, "GET", "/api/v1/tickets/4242", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "success": false, "error": "Invalid Ticket" }));

    let (status, json) = send(&router, "GET", "/api/v1/tickets/not-a-number", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["error"], "Invalid Ticket");
}

#[tokio::test]
async fn status_only_update_keeps_other_fields() {
    let router = app().await;
    let ticket = create(&router, json!({ "subject": "Printer" })).await;
    let id = ticket["id"].as_str().unwrap();

    let (status, json) = send(
        &router,
        "PUT",
        &format!("/api/v1/tickets/{id}"),
        Some(USER_TOKEN),
        Some(json!({ "status": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    let updated = &json["ticket"];
    assert_eq!(updated["status"], 1);
    assert_eq!(updated["group"], ticket["group"]);
    assert_eq!(updated["closedDate"], Value::Null);
    assert_eq!(updated["history"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn stale_version_conflicts() {
    let router = app().await;
    let ticket = create(&router, json!({ "subject": "Race" })).await;
    let uri = format!("/api/v1/tickets/{}", ticket["id"].as_str().unwrap());

    let (status, _) = send(&router, "PUT", &uri, Some(ADMIN_TOKEN), Some(json!({ "priority": 2, "version": 0 }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&router, "PUT", &uri, Some(ADMIN_TOKEN), Some(json!({ "priority": 3, "version": 0 }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn deleted_tickets_leave_the_list_but_not_the_store() {
    let router = app().await;
    let keep = create(&router, json!({ "subject": "keep" })).await;
    let drop = create(&router, json!({ "subject": "drop" })).await;

    let (status, _) = send(
        &router,
        "DELETE",
        &format!("/api/v1/tickets/{}", drop["id"].as_str().unwrap()),
        Some(ADMIN_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&router, "GET", "/api/v1/tickets", Some(ADMIN_TOKEN), None).await;
    let uids: Vec<&Value> = json["tickets"].as_array().unwrap().iter().map(|t| &t["uid"]).collect();
    assert_eq!(uids, vec![&keep["uid"]]);

    let (_, json) = send(&router, "GET", &format!("/api/v1/tickets/{}", drop["uid"]), Some(ADMIN_TOKEN), None).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["ticket"]["deleted"], true);
}

#[tokio::test]
async fn list_count_is_the_total_across_pages() {
    let router = app().await;
    for subject in ["a", "b", "c"] {
        create(&router, json!({ "subject": subject })).await;
    }

    let (status, json) = send(&router, "GET", "/api/v1/tickets?limit=2&page=1", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 3);
    assert_eq!(json["tickets"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn comment_on_behalf_needs_admin() {
    let router = app().await;
    let ticket = create(&router, json!({ "subject": "Help" })).await;
    let uri = format!("/api/v1/tickets/{}/comment", ticket["id"].as_str().unwrap());
    let admin_id = ticket["owner"]["id"].clone();

    let (status, json) = send(&router, "POST", &uri, Some(USER_TOKEN), Some(json!({ "comment": "hi", "ownerId": admin_id }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{json}");

    let (status, json) = send(&router, "POST", &uri, Some(USER_TOKEN), Some(json!({ "comment": "**hi**" }))).await;
    assert_eq!(status, StatusCode::OK);
    let comments = json["ticket"]["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert!(comments[0]["text"].as_str().unwrap().contains("<strong>hi</strong>"));
    assert_eq!(comments[0]["owner"]["username"], "user");
}

#[tokio::test]
async fn attachment_removal_is_permission_gated() {
    let router = app().await;
    let ticket = create(&router, json!({ "subject": "Files" })).await;
    let uri = format!(
        "/api/v1/tickets/{}/attachments/{}",
        ticket["id"].as_str().unwrap(),
        Uuid::new_v4()
    );

    let (status, _) = send(&router, "DELETE", &uri, Some(USER_TOKEN), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = send(&router, "DELETE", &uri, Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid Attachment");
}

#[tokio::test]
async fn reporting_endpoints_answer() {
    let router = app().await;
    create(&router, json!({ "subject": "one" })).await;

    let (_, json) = send(&router, "GET", "/api/v1/tickets/types", Some(ADMIN_TOKEN), None).await;
    assert_eq!(json["types"][0]["name"], "Issue");

    let (_, json) = send(&router, "GET", "/api/v1/tickets/stats/month", Some(ADMIN_TOKEN), None).await;
    let months = json["data"].as_array().unwrap();
    assert_eq!(months.len(), 12);
    assert_eq!(months[11]["newCount"], 1);

    let (_, json) = send(&router, "GET", "/api/v1/tickets/stats/year/2001", Some(ADMIN_TOKEN), None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 12);
    assert_eq!(json["data"][0]["month"], "2001-01");

    let (_, json) = send(&router, "GET", "/api/v1/tickets/count/topgroups/5?timespan=30", Some(ADMIN_TOKEN), None).await;
    assert_eq!(json["items"], json!([{ "groupId": json["items"][0]["groupId"], "name": "Support", "count": 1 }]));

    let (status, json) = send(&router, "GET", "/api/v1/tickets/count/topgroups/5?timespan=4294967295", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["items"][0]["count"], 1);
}

#[tokio::test]
async fn health_and_metrics_are_public() {
    let router = app().await;
    let (status, json) = send(&router, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");

    send(&router, "GET", "/api/v1/tickets", Some(ADMIN_TOKEN), None).await;

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains(r#"route="/api/v1/tickets""#), "{text}");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let router = app().await;
    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
