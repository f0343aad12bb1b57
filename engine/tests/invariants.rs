//! Covers the invariant checks, round-trip laws, and boundary behaviors
//! called out alongside the seed scenarios: group-key uniqueness, review
//! idempotency, story-index bounds, upstream-approval gating, and the
//! provider-deadline failure path.

mod support;

use std::time::Duration;

use ideation_engine::boundary::dto::{
    StartPlanningRequest, StartRequirementsRequest, StartStoriesRequest,
};
use ideation_engine::{ArtifactStatus, EngineError, Stage};
use support::{engine_with_provider, ScriptedProvider};

const REQ_BODY: &str = "\
## Overview
An online bookstore.

## Scope
Browse and buy books.
";

const PLAN_BODY: &str = "\
## Milestones
MVP then checkout.
";

const STORIES_BODY: &str = "\
### Story: User Registration
Description: Create an account.

### Story: User Login
Description: Log in.

### Story: Browse Catalog
Description: Browse books.
";

async fn approved_requirements(
    engine: &ideation_engine::Engine,
) -> (ideation_engine::ProjectId, ideation_engine::ArtifactId) {
    let project = engine.create_project("Bookstore", "Online bookstore").unwrap();
    let req = engine
        .start_requirements(StartRequirementsRequest {
            project_id: project.id,
            project_description: "Online bookstore".to_string(),
            additional_context: None,
            constraints: None,
        })
        .await
        .unwrap();
    engine.approve_review(req.review_id, None).unwrap();
    (project.id, req.analysis_id)
}

#[tokio::test]
async fn second_concurrent_planning_start_for_same_parent_fails_already_in_progress() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![REQ_BODY, PLAN_BODY, PLAN_BODY]);
    let engine = engine_with_provider(dir.path(), provider);

    let (_project_id, analysis_id) = approved_requirements(&engine).await;

    let first = engine.start_planning(StartPlanningRequest {
        requirements_analysis_id: analysis_id,
        preferences: None,
    });
    let second = engine.start_planning(StartPlanningRequest {
        requirements_analysis_id: analysis_id,
        preferences: None,
    });

    let (first, second) = tokio::join!(first, second);
    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(EngineError::AlreadyInProgress))));
}

#[tokio::test]
async fn deciding_an_already_decided_review_fails_review_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![REQ_BODY]);
    let engine = engine_with_provider(dir.path(), provider);

    let project = engine.create_project("Bookstore", "Online bookstore").unwrap();
    let req = engine
        .start_requirements(StartRequirementsRequest {
            project_id: project.id,
            project_description: "Online bookstore".to_string(),
            additional_context: None,
            constraints: None,
        })
        .await
        .unwrap();

    engine.approve_review(req.review_id, None).unwrap();
    let second_decision = engine.reject_review(req.review_id, None);
    assert!(matches!(second_decision, Err(EngineError::ReviewConflict(id)) if id == req.review_id));
}

#[tokio::test]
async fn story_index_at_count_is_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![REQ_BODY, PLAN_BODY, STORIES_BODY]);
    let engine = engine_with_provider(dir.path(), provider);

    let (_project_id, analysis_id) = approved_requirements(&engine).await;
    let plan = engine
        .start_planning(StartPlanningRequest {
            requirements_analysis_id: analysis_id,
            preferences: None,
        })
        .await
        .unwrap();
    engine.approve_review(plan.review_id, None).unwrap();

    let stories = engine
        .start_stories(StartStoriesRequest {
            planning_id: plan.planning_id,
            story_preferences: None,
            complexity_levels: None,
            additional_guidance: None,
        })
        .await
        .unwrap();
    engine.approve_review(stories.review_id, None).unwrap();

    let count = engine.stories_count(stories.generation_id).unwrap();
    assert_eq!(count, 3);

    let in_range = engine.story_at(stories.generation_id, count - 1);
    assert!(in_range.is_ok());

    let out_of_range = engine.story_at(stories.generation_id, count);
    assert!(matches!(
        out_of_range,
        Err(EngineError::OutOfRange { index, len }) if index == count && len == count
    ));
}

#[tokio::test]
async fn planning_from_a_rejected_requirements_artifact_fails_prerequisite_missing() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![REQ_BODY]);
    let engine = engine_with_provider(dir.path(), provider);

    let project = engine.create_project("Bookstore", "Online bookstore").unwrap();
    let req = engine
        .start_requirements(StartRequirementsRequest {
            project_id: project.id,
            project_description: "Online bookstore".to_string(),
            additional_context: None,
            constraints: None,
        })
        .await
        .unwrap();
    engine.reject_review(req.review_id, Some("needs more detail".to_string())).unwrap();

    assert!(!engine.can_start(Stage::Plan, Some(req.analysis_id)).unwrap());

    let outcome = engine
        .start_planning(StartPlanningRequest {
            requirements_analysis_id: req.analysis_id,
            preferences: None,
        })
        .await;
    assert!(matches!(
        outcome,
        Err(EngineError::PrerequisiteMissing { stage: Stage::Req, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn provider_call_exceeding_its_deadline_marks_the_artifact_failed() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::with_delay(REQ_BODY, Duration::from_secs(200));
    let engine = engine_with_provider(dir.path(), provider);

    let project = engine.create_project("Bookstore", "Online bookstore").unwrap();
    let outcome = engine
        .start_requirements(StartRequirementsRequest {
            project_id: project.id,
            project_description: "Online bookstore".to_string(),
            additional_context: None,
            constraints: None,
        })
        .await;

    assert!(matches!(outcome, Err(EngineError::Timeout(_))));

    let progress = engine.progress(project.id).unwrap();
    let req_progress = &progress[&Stage::Req];
    assert_eq!(req_progress.failed, 1);
    assert_eq!(req_progress.approved, 0);

    let artifacts = engine.artifacts.list_stage_artifacts(project.id, Stage::Req).unwrap();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].status, ArtifactStatus::Failed);
}
