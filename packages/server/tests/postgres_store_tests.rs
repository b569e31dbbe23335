//! Postgres + pgvector store tests.
//!
//! These start a `pgvector/pgvector` container, so they need a running
//! Docker daemon.

mod common;

use chrono::Duration;
use feedback_pipeline::{
    BacklogQuery, DocumentType, FeedbackPipeline, FeedbackStatus, FeedbackStore, NewDocument,
    NewFeedback, NewStory, StoryStore, VectorStore,
};
use feedback_pipeline::stores::PostgresStore;
use serde_json::json;
use uuid::Uuid;

use crate::common::{scripted_model, TestHarness};

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

#[tokio::test]
async fn feedback_status_lifecycle() {
    let harness = TestHarness::new().await.expect("harness");
    let store = &harness.deps.feedback;

    let created = store
        .create_feedback(NewFeedback::new("Survey", "survey").with_content("slow exports"))
        .await
        .unwrap();
    assert_eq!(created.status, FeedbackStatus::Pending);

    let claimed = store.claim_for_processing(created.id).await.unwrap();
    assert_eq!(claimed.unwrap().status, FeedbackStatus::Processing);
    assert!(store.claim_for_processing(created.id).await.unwrap().is_none());

    store.mark_error(created.id, "model offline").await.unwrap();
    let errored = store.get_feedback(created.id).await.unwrap().unwrap();
    assert_eq!(errored.status, FeedbackStatus::Error);
    assert_eq!(errored.error.as_deref(), Some("model offline"));

    // Reclaiming clears the previous error
    let reclaimed = store.claim_for_processing(created.id).await.unwrap().unwrap();
    assert!(reclaimed.error.is_none());

    let missing = Uuid::new_v4();
    assert!(store.claim_for_processing(missing).await.is_err());
    assert!(store.mark_completed(missing, 1).await.is_err());
}

#[tokio::test]
async fn claim_survives_stage_updates_until_released() {
    let harness = TestHarness::new().await.expect("harness");
    let store = &harness.deps.feedback;

    let created = store
        .create_feedback(NewFeedback::new("Claims", "survey").with_content("slow exports"))
        .await
        .unwrap();
    let claimed = store.claim_for_processing(created.id).await.unwrap().unwrap();
    assert!(claimed.claimed_at.is_some());

    store.mark_ingested(created.id, "slow exports").await.unwrap();
    let ingested = store.get_feedback(created.id).await.unwrap().unwrap();
    assert_eq!(ingested.status, FeedbackStatus::Ingested);
    assert!(store.claim_for_processing(created.id).await.unwrap().is_none());

    store.mark_completed(created.id, 0).await.unwrap();
    let completed = store.get_feedback(created.id).await.unwrap().unwrap();
    assert!(completed.claimed_at.is_none());
    assert!(store.claim_for_processing(created.id).await.unwrap().is_some());
}

#[tokio::test]
async fn expired_claim_can_be_taken_over() {
    let harness = TestHarness::new().await.expect("harness");
    let store = PostgresStore::new(harness.db_pool.clone()).with_processing_lease(Duration::zero());

    let created = store
        .create_feedback(NewFeedback::new("Stale", "survey").with_content("slow exports"))
        .await
        .unwrap();
    assert!(store.claim_for_processing(created.id).await.unwrap().is_some());
    assert!(store.claim_for_processing(created.id).await.unwrap().is_some());
}

#[tokio::test]
async fn manual_story_round_trips_with_theme_filter() {
    let harness = TestHarness::new().await.expect("harness");
    let theme = unique("billing");

    let story = NewStory {
        title: "Invoice export".into(),
        as_a: "accountant".into(),
        i_want: "to export invoices".into(),
        so_that: "I can file taxes".into(),
        description: "CSV invoice export.".into(),
        acceptance_criteria: vec!["export button".into()],
        themes: vec![theme.clone()],
        feedback_ids: vec![],
        reach: 5.0,
        impact: 2.0,
        confidence: 8.0,
        effort: 4.0,
        rice_score: None,
    }
    .into_story()
    .unwrap();
    harness.deps.stories.insert_story(&story).await.unwrap();

    let fetched = harness.deps.stories.get_story(story.id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "Invoice export");
    assert_eq!(fetched.rice_score, Some(2.0));

    let query = BacklogQuery {
        theme: Some(theme.to_uppercase()),
        ..BacklogQuery::default()
    };
    let listed = harness.deps.stories.list_stories(&query).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, story.id);
}

#[tokio::test]
async fn vector_namespace_replace_and_search() {
    let harness = TestHarness::new().await.expect("harness");
    let vectors = &harness.deps.vectors;
    let namespace = unique("feedback");

    let doc = |text: &str| NewDocument {
        content: text.into(),
        doc_type: DocumentType::Feedback,
        metadata: json!({"title": text}),
    };

    let ids = vectors
        .add_documents(vec![doc("exports time out"), doc("login is fine")], &namespace)
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);

    let hits = vectors
        .search("exports time out", 5, Some(DocumentType::Feedback))
        .await
        .unwrap();
    assert!(hits.iter().any(|h| h.id == ids[0]));
    assert!(hits
        .windows(2)
        .all(|w| w[0].similarity >= w[1].similarity));

    assert!(vectors
        .search("exports", 5, Some(DocumentType::Story))
        .await
        .unwrap()
        .iter()
        .all(|h| h.doc_type == DocumentType::Story));

    assert_eq!(vectors.delete_namespace(&namespace).await.unwrap(), 2);
    assert_eq!(vectors.delete_namespace(&namespace).await.unwrap(), 0);
}

#[tokio::test]
async fn pipeline_run_persists_to_postgres() {
    let harness = TestHarness::with_model(scripted_model())
        .await
        .expect("harness");
    let deps = &harness.deps;

    let feedback = deps
        .feedback
        .create_feedback(
            NewFeedback::new("Exports", "support").with_content("Exports over 10k rows time out."),
        )
        .await
        .unwrap();
    let claimed = deps
        .feedback
        .claim_for_processing(feedback.id)
        .await
        .unwrap()
        .unwrap();

    let state = FeedbackPipeline::new(deps).run(claimed).await.unwrap();
    assert_eq!(state.stories().len(), 1);

    let stored = deps.feedback.get_feedback(feedback.id).await.unwrap().unwrap();
    assert_eq!(stored.status, FeedbackStatus::Completed);
    assert_eq!(stored.stories_count, 1);
    assert_eq!(
        stored.analysis.unwrap().themes,
        vec!["performance".to_string(), "onboarding".to_string()]
    );

    let themes = deps.feedback.distinct_themes().await.unwrap();
    assert!(themes.contains(&"performance".to_string()));

    let story_id = state.stories()[0].id;
    let story = deps.stories.get_story(story_id).await.unwrap().unwrap();
    assert_eq!(story.feedback_ids, vec![feedback.id]);
}
