//! # api-adapters
//!
//! Inbound adapters. The HTTP surface lives behind the `web-axum` feature;
//! metrics are framework independent.

pub mod metrics;

#[cfg(feature = "web-axum")]
pub mod http;

#[cfg(feature = "web-axum")]
pub use http::{build_router, ApiError, AppState};
pub use metrics::HttpMetrics;
