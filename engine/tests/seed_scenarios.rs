//! Walks the literal Bookstore walkthrough end to end, and exercises the
//! concurrent-start race over a single group key.

mod support;

use ideation_engine::boundary::dto::{
    StartPlanningRequest, StartPromptRequest, StartRequirementsRequest, StartStoriesRequest,
};
use ideation_engine::{EngineError, Stage};
use support::{engine_with_provider, ScriptedProvider};

const REQ_BODY: &str = "\
## Overview
An online bookstore where customers browse, search, and purchase books.

## Scope
Customer-facing storefront plus an admin catalog workflow.
";

const PLAN_BODY: &str = "\
## Milestones
Storefront MVP, then checkout, then admin tooling.

## Architecture
Web frontend, REST API, relational catalog store.
";

const STORIES_BODY: &str = "\
### Story: User Registration
Description: A visitor can create an account with email and password.
Acceptance Criteria:
- Email is validated
- Password meets policy
Priority: High
Story Points: 3
Tags: auth

### Story: User Login
Description: A registered user can log in.
Priority: High

### Story: Browse Catalog
Description: A visitor can browse the book catalog.
Priority: Medium
";

const PROMPT_BODY: &str = "Implement the User Login story against the existing auth module, in Go.";

#[tokio::test]
async fn bookstore_seed_scenario_runs_start_to_finish() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![REQ_BODY, PLAN_BODY, STORIES_BODY, PROMPT_BODY]);
    let engine = engine_with_provider(dir.path(), provider.clone());

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
    assert!(!engine.can_start(Stage::Plan, Some(req.analysis_id)).unwrap());

    engine.approve_review(req.review_id, None).unwrap();
    assert!(engine.can_start(Stage::Plan, Some(req.analysis_id)).unwrap());
    assert_eq!(
        engine.progress(project.id).unwrap()[&Stage::Req].approved,
        1
    );

    let plan = engine
        .start_planning(StartPlanningRequest {
            requirements_analysis_id: req.analysis_id,
            preferences: None,
        })
        .await
        .unwrap();
    let plan_artifact = engine.artifacts.get(plan.planning_id).unwrap().unwrap();
    assert_eq!(plan_artifact.parent_artifact_id, Some(req.analysis_id));
    engine.approve_review(plan.review_id, None).unwrap();

    let stories = engine
        .start_stories(StartStoriesRequest {
            planning_id: plan.planning_id,
            story_preferences: Some("focus on auth".to_string()),
            complexity_levels: None,
            additional_guidance: None,
        })
        .await
        .unwrap();
    engine.approve_review(stories.review_id, None).unwrap();

    assert_eq!(engine.stories_count(stories.generation_id).unwrap(), 3);
    assert_eq!(
        engine.story_at(stories.generation_id, 0).unwrap().title,
        "User Registration"
    );

    let prompt = engine
        .start_prompt(StartPromptRequest {
            story_generation_id: stories.generation_id,
            story_index: 1,
            technical_preferences: Some([("language".to_string(), "Go".to_string())].into()),
            prompt_style: None,
        })
        .await
        .unwrap();

    let prompt_artifact = engine.artifacts.get(prompt.prompt_id).unwrap().unwrap();
    let extras = prompt_artifact.prompt_extras.as_ref().unwrap();
    assert_eq!(
        extras.technical_preferences.get("language").map(String::as_str),
        Some("Go")
    );
    let sent = provider.sent_prompts();
    assert!(sent.last().unwrap().contains("# Technical Preferences"));
    assert!(sent.last().unwrap().contains("- language: Go"));

    let result = engine.result(Stage::Prompt, prompt.prompt_id);
    assert!(matches!(result, Err(EngineError::NotFound(_))));

    engine.approve_review(prompt.review_id, None).unwrap();
    let prompt_result = engine.result(Stage::Prompt, prompt.prompt_id).unwrap();
    assert!(prompt_result["text"]
        .as_str()
        .unwrap()
        .contains("User Login"));
}

#[tokio::test]
async fn concurrent_prompt_starts_for_same_story_yield_exactly_one_success() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![REQ_BODY, PLAN_BODY, STORIES_BODY, PROMPT_BODY, PROMPT_BODY]);
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

    let plan = engine
        .start_planning(StartPlanningRequest {
            requirements_analysis_id: req.analysis_id,
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

    let first = engine.start_prompt(StartPromptRequest {
        story_generation_id: stories.generation_id,
        story_index: 1,
        technical_preferences: None,
        prompt_style: None,
    });
    let second = engine.start_prompt(StartPromptRequest {
        story_generation_id: stories.generation_id,
        story_index: 1,
        technical_preferences: None,
        prompt_style: None,
    });

    let (first, second) = tokio::join!(first, second);
    let outcomes = [first, second];
    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(EngineError::AlreadyInProgress)))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 1);

    let winner = outcomes.into_iter().find(Result::is_ok).unwrap().unwrap();
    engine.approve_review(winner.review_id, None).unwrap();

    let retry = engine
        .start_prompt(StartPromptRequest {
            story_generation_id: stories.generation_id,
            story_index: 1,
            technical_preferences: None,
            prompt_style: None,
        })
        .await;
    assert!(retry.is_ok());
}
