//! axum surface of the helpdesk API.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use extract::{AuthUser, ACCESS_TOKEN_HEADER};
pub use router::build_router;
pub use state::AppState;
