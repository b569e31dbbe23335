//! In-process API fixtures.
//!
//! `TestApp` drives the real router against in-memory stores and a
//! scripted model, so route behavior can be checked without Postgres or
//! network access.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use feedback_pipeline::pipeline::{GeneratedStories, InsightExtraction};
use feedback_pipeline::testing::{test_deps_with, MockLanguageModel, TestHandles};
use feedback_pipeline::PipelineDeps;
use openai_client::StructuredOutput;
use serde_json::{json, Value};
use server_core::server::build_app;
use tower::ServiceExt;

const BOUNDARY: &str = "feedback-test-boundary";

/// Model responses for one successful pipeline run.
pub fn scripted_model() -> MockLanguageModel {
    MockLanguageModel::new()
        .with_structured(
            <InsightExtraction as StructuredOutput>::schema_name(),
            json!({
                "themes": ["performance", "onboarding"],
                "sentiments": [
                    {"theme": "performance", "score": -0.7},
                    {"theme": "onboarding", "score": 0.2}
                ],
                "pain_points": ["exports time out"],
                "feature_requests": ["background exports"],
                "user_personas": [{"attributes": [{"name": "role", "value": "analyst"}]}],
                "key_metrics": []
            }),
        )
        .with_text("Analysts hit export timeouts on large reports.")
        .with_structured(
            <GeneratedStories as StructuredOutput>::schema_name(),
            json!({"stories": [{
                "title": "Background exports",
                "as_a": "analyst",
                "i_want": "large exports to run in the background",
                "so_that": "I can keep working while they finish",
                "description": "Exports over 10k rows time out.",
                "acceptance_criteria": ["export of 100k rows completes"],
                "themes": ["performance"]
            }]}),
        )
}

/// A router over in-memory dependencies.
pub struct TestApp {
    pub router: Router,
    pub deps: PipelineDeps,
    pub handles: TestHandles,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_model(scripted_model())
    }

    pub fn with_model(model: MockLanguageModel) -> Self {
        let (deps, handles) = test_deps_with(model);
        Self::from_parts(deps, handles)
    }

    /// Use prepared dependencies, e.g. with a swapped-in model.
    pub fn from_parts(deps: PipelineDeps, handles: TestHandles) -> Self {
        Self {
            router: build_app(deps.clone()),
            deps,
            handles,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post(&self, uri: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// POST /api/feedback/upload with text fields and an optional file part.
    pub async fn upload(
        &self,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/feedback/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(fields, file)))
                .unwrap(),
        )
        .await
    }

    /// Upload inline text and return the new feedback id.
    pub async fn upload_text(&self, title: &str, content: &str) -> String {
        let (status, body) = self
            .upload(
                &[("title", title), ("source", "survey"), ("content", content)],
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "upload failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }
}

pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
