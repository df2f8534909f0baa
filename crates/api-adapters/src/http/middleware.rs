//! Cross-cutting layers: request ids, tracing, CORS, compression and the
//! request counter.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{MatchedPath, Request, State},
    http::HeaderName,
    middleware::Next,
    response::Response,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info_span;

use crate::metrics::HttpMetrics;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Label used for requests that matched no route.
const UNMATCHED_ROUTE: &str = "unmatched";

pub async fn track_requests(
    State(metrics): State<Arc<HttpMetrics>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());

    let response = next.run(req).await;
    metrics.record(&method, &route, response.status().as_u16());
    response
}

pub fn apply(router: Router, metrics: Arc<HttpMetrics>) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let trace = TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-");
        info_span!(
            "http",
            method = %req.method(),
            uri = %req.uri(),
            request_id = %request_id,
        )
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(axum::middleware::from_fn_with_state(metrics, track_requests))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(trace)
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(cors)
                .layer(CompressionLayer::new()),
        )
}
