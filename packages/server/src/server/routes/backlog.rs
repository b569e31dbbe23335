//! Backlog and theme endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use feedback_pipeline::{BacklogQuery, NewStory, PipelineError, UserStory};
use tracing::info;

use super::parse_id;
use crate::error::ApiResult;
use crate::server::app::AppState;

/// GET /api/backlog?min_score=&theme=&limit=&offset=
pub async fn list_backlog_handler(
    State(state): State<AppState>,
    Query(query): Query<BacklogQuery>,
) -> ApiResult<Json<Vec<UserStory>>> {
    let stories = state.deps.stories.list_stories(&query.normalized()).await?;
    Ok(Json(stories))
}

pub async fn get_story_handler(
    State(state): State<AppState>,
    Path(story_id): Path<String>,
) -> ApiResult<Json<UserStory>> {
    let id = parse_id("story", &story_id)?;
    state
        .deps
        .stories
        .get_story(id)
        .await?
        .map(Json)
        .ok_or_else(|| PipelineError::NotFound { kind: "story", id }.into())
}

/// Manually authored story. Out-of-range RICE inputs are a 400.
pub async fn create_story_handler(
    State(state): State<AppState>,
    Json(input): Json<NewStory>,
) -> ApiResult<(StatusCode, Json<UserStory>)> {
    let story = input.into_story()?;
    state.deps.stories.insert_story(&story).await?;
    info!(story_id = %story.id, rice_score = story.score(), "Story created");
    Ok((StatusCode::CREATED, Json(story)))
}

/// GET /api/themes
pub async fn list_themes_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.deps.feedback.distinct_themes().await?))
}
