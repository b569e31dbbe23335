//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use feedback_pipeline::{FeedbackPipeline, PipelineDeps};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::routes::{
    create_story_handler, get_feedback_handler, get_story_handler, health_handler,
    list_backlog_handler, list_feedback_handler, list_themes_handler, process_feedback_handler,
    search_handler, upload_feedback_handler,
};

/// Uploads above this size are rejected before parsing.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: PipelineDeps,
    pub pipeline: Arc<FeedbackPipeline>,
}

impl AppState {
    pub fn new(deps: PipelineDeps) -> Self {
        let pipeline = Arc::new(FeedbackPipeline::new(&deps));
        Self { deps, pipeline }
    }
}

/// Build the Axum application router
///
/// API routes live under `/api`; `/health` stays at the root.
pub fn build_app(deps: PipelineDeps) -> Router {
    let state = AppState::new(deps);

    // CORS configuration - allow any origin, method and header
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/feedback/upload", post(upload_feedback_handler))
        .route("/feedback/process/:feedback_id", post(process_feedback_handler))
        .route("/feedback", get(list_feedback_handler))
        .route("/feedback/:feedback_id", get(get_feedback_handler))
        .route(
            "/backlog",
            get(list_backlog_handler).post(create_story_handler),
        )
        .route("/backlog/:story_id", get(get_story_handler))
        .route("/themes", get(list_themes_handler))
        .route("/search", get(search_handler));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
