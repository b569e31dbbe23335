//! Feedback upload, processing and lookup.
//!
//! POST /api/feedback/upload              multipart: title, source, description?, file?, content?
//! POST /api/feedback/process/:feedback_id run the pipeline synchronously
//! GET  /api/feedback                      newest first
//! GET  /api/feedback/:feedback_id

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use feedback_pipeline::{Feedback, NewFeedback, PipelineError};
use serde::Serialize;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::parse_id;
use crate::error::{ApiError, ApiResult};
use crate::server::app::AppState;

/// Extension used when the uploaded file name has none.
const DEFAULT_EXTENSION: &str = "txt";

#[derive(Debug, Default)]
struct UploadForm {
    title: Option<String>,
    description: Option<String>,
    source: Option<String>,
    content: Option<String>,
    file: Option<UploadedFile>,
}

#[derive(Debug)]
struct UploadedFile {
    file_name: Option<String>,
    bytes: Vec<u8>,
}

/// Storage key for an upload: `{feedback_id}.{extension}`.
pub fn file_key(feedback_id: Uuid, file_name: Option<&str>) -> String {
    let extension = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(DEFAULT_EXTENSION);
    format!("{}.{}", feedback_id, extension.to_ascii_lowercase())
}

async fn read_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?;
            // Browsers send an empty part when no file was chosen
            if !bytes.is_empty() || file_name.as_deref().is_some_and(|n| !n.is_empty()) {
                form.file = Some(UploadedFile {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid field {}: {}", name, e)))?;
        let value = Some(value).filter(|v| !v.trim().is_empty());
        match name.as_str() {
            "title" => form.title = value,
            "description" => form.description = value,
            "source" => form.source = value,
            "content" => form.content = value,
            _ => {}
        }
    }
    Ok(form)
}

#[instrument(skip(state, multipart))]
pub async fn upload_feedback_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<Feedback>> {
    let form = read_form(multipart).await?;

    let title = form
        .title
        .ok_or_else(|| ApiError::bad_request("title is required"))?;
    let source = form
        .source
        .ok_or_else(|| ApiError::bad_request("source is required"))?;
    if form.file.is_none() && form.content.is_none() {
        return Err(ApiError::bad_request(
            "Provide either a file or text content",
        ));
    }

    let mut input = NewFeedback::new(title, source);
    if let Some(description) = form.description {
        input = input.with_description(description);
    }
    if let Some(content) = form.content {
        input = input.with_content(content);
    }
    if let Some(file) = form.file {
        let key = file_key(input.id, file.file_name.as_deref());
        state
            .deps
            .files
            .put(&key, file.bytes)
            .await
            .map_err(|e| ApiError::internal(format!("File upload failed: {}", e)))?;
        input = input.with_file_path(key);
    }

    let feedback = state.deps.feedback.create_feedback(input).await?;
    info!(feedback_id = %feedback.id, has_file = feedback.file_path.is_some(), "Feedback uploaded");
    Ok(Json(feedback))
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub message: String,
    pub stories_count: usize,
}

/// Runs the whole pipeline inside the request.
///
/// The record is claimed first, so a concurrent request for the same id
/// gets 409. On failure the error is recorded on the record and echoed.
#[instrument(skip(state))]
pub async fn process_feedback_handler(
    State(state): State<AppState>,
    Path(feedback_id): Path<String>,
) -> ApiResult<(StatusCode, Json<ProcessResponse>)> {
    let id = parse_id("feedback", &feedback_id)?;
    let feedback = state
        .deps
        .feedback
        .claim_for_processing(id)
        .await?
        .ok_or(PipelineError::AlreadyProcessing { id })?;

    match state.pipeline.run(feedback).await {
        Ok(result) => Ok((
            StatusCode::ACCEPTED,
            Json(ProcessResponse {
                message: format!("Processing of feedback {} completed", id),
                stories_count: result.stories().len(),
            }),
        )),
        Err(e) => {
            let message = e.to_string();
            if let Err(mark_err) = state.deps.feedback.mark_error(id, &message).await {
                error!(feedback_id = %id, error = %mark_err, "Failed to record processing error");
            }
            Err(ApiError::internal(format!("Processing failed: {}", message)))
        }
    }
}

pub async fn list_feedback_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<Feedback>>> {
    Ok(Json(state.deps.feedback.list_feedback().await?))
}

pub async fn get_feedback_handler(
    State(state): State<AppState>,
    Path(feedback_id): Path<String>,
) -> ApiResult<Json<Feedback>> {
    let id = parse_id("feedback", &feedback_id)?;
    state
        .deps
        .feedback
        .get_feedback(id)
        .await?
        .map(Json)
        .ok_or_else(|| PipelineError::NotFound { kind: "feedback", id }.into())
}
