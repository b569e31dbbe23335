use std::str::FromStr;

use axum::{
    extract::{Query, State},
    Json,
};
use feedback_pipeline::{DocumentType, SearchHit};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::server::app::AppState;

const DEFAULT_SEARCH_LIMIT: usize = 10;
const MAX_SEARCH_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Optional here so a missing query gets the same JSON error as a blank one
    pub query: Option<String>,
    pub limit: Option<usize>,
    /// `feedback` or `story`
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
}

/// GET /api/search?query=&limit=&type=
pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<SearchHit>>> {
    let query = params.query.as_deref().unwrap_or_default().trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("query must not be empty"));
    }

    let doc_type = params
        .doc_type
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(DocumentType::from_str)
        .transpose()
        .map_err(ApiError::bad_request)?;

    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);

    let hits = state.deps.vectors.search(query, limit, doc_type).await?;
    Ok(Json(hits))
}
