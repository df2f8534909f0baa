use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use super::handlers::{reports, system, tickets};
use super::middleware;
use super::state::AppState;

/// Upper bound for a single attachment upload.
pub const MAX_ATTACHMENT_BYTES: usize = 25 * 1024 * 1024;

/// Every route under `/api/v1` except `login` requires the `accesstoken`
/// header.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(system::login))
        .route("/tickets", get(tickets::list))
        .route("/tickets/create", post(tickets::create))
        .route("/tickets/types", get(reports::types))
        .route("/tickets/stats/month", get(reports::month_data))
        .route("/tickets/stats/year/{year}", get(reports::year_data))
        .route("/tickets/count/topgroups/{top}", get(reports::top_groups))
        .route(
            "/tickets/{id}",
            get(tickets::get_by_uid)
                .put(tickets::update)
                .delete(tickets::soft_delete),
        )
        .route("/tickets/{id}/restore", post(tickets::restore))
        .route("/tickets/{id}/comment", post(tickets::post_comment))
        .route("/tickets/{id}/note", post(tickets::post_note))
        .route("/tickets/{id}/subscribe", post(tickets::subscribe))
        .route(
            "/tickets/{id}/attachments",
            post(tickets::add_attachment).layer(DefaultBodyLimit::max(MAX_ATTACHMENT_BYTES)),
        )
        .route(
            "/tickets/{id}/attachments/{attachment_id}",
            delete(tickets::remove_attachment),
        )
}

pub fn build_router(state: AppState) -> Router {
    let metrics = state.metrics.clone();
    let router = Router::new()
        .nest("/api/v1", api_routes())
        .route("/health", get(system::health))
        .route("/metrics", get(system::metrics))
        .with_state(state);
    middleware::apply(router, metrics)
}
