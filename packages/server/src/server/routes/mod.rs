// HTTP routes
pub mod backlog;
pub mod feedback;
pub mod health;
pub mod search;

pub use backlog::*;
pub use feedback::*;
pub use health::*;
pub use search::*;

use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Parse a path id; anything that is not a UUID cannot exist, so it is a 404.
pub(crate) fn parse_id(kind: &str, raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError::new(
            axum::http::StatusCode::NOT_FOUND,
            format!("{} not found: {}", kind, raw),
        )
    })
}
