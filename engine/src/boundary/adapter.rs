//! Wires the stage services, review registry, and coordinator behind the
//! DTO shapes in `dto.rs`. This is the only place that knows both the
//! wire format and the domain types.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::EngineConfig;
use crate::context::{ContextAssembler, ContextInputs};
use crate::coordinator::PipelineCoordinator;
use crate::error::{EngineError, EngineResult};
use crate::ids::{ArtifactId, ReviewId};
use crate::instructions::InstructionStore;
use crate::model::artifact::Stage;
use crate::model::review::ReviewDecision;
use crate::model::story::UserStory;
use crate::providers::{ClaudeClient, LmStudioClient, NanoGptClient, OpenRouterClient, ProviderClient, ProviderName, ProviderPool};
use crate::stages::{PlanningService, PromptService, RequirementsService, StartRequest, StoriesService};
use crate::store::{ArtifactStore, PipelineDb, ReviewRegistry};

use super::dto::*;

pub struct Engine {
    pub artifacts: Arc<ArtifactStore>,
    pub reviews: Arc<ReviewRegistry>,
    pub instructions: Arc<InstructionStore>,
    pub providers: Arc<ProviderPool>,
    pub coordinator: PipelineCoordinator,
    requirements: RequirementsService,
    planning: PlanningService,
    stories: StoriesService,
    prompts: PromptService,
    review_await_default: Duration,
}

impl Engine {
    pub fn new(
        config: &EngineConfig,
        db_path: impl Into<PathBuf>,
        instructions_dir: Option<PathBuf>,
    ) -> EngineResult<Self> {
        let mut pool = ProviderPool::new(config.provider_concurrency_cap, config.provider_queue_wait, 2);
        for (name, provider_config) in &config.providers {
            let client: Arc<dyn ProviderClient> = match name {
                ProviderName::Claude => Arc::new(ClaudeClient::new(provider_config)),
                ProviderName::LmStudio => Arc::new(LmStudioClient::new(provider_config)?),
                ProviderName::OpenRouter => Arc::new(OpenRouterClient::new(provider_config)?),
                ProviderName::NanoGpt => Arc::new(NanoGptClient::new(provider_config)?),
            };
            pool.register_with_retries(client, config.provider_concurrency_cap, provider_config.max_retries);
            info!(provider = %name, max_retries = provider_config.max_retries, "provider registered");
        }
        Self::with_pool(config, db_path, instructions_dir, pool)
    }

    /// Build an `Engine` around an already-assembled `ProviderPool`,
    /// bypassing the `config.providers` → concrete-client wiring `new`
    /// does. Used by callers that register a non-network provider (the
    /// CLI's offline fake provider, or a test double).
    pub fn with_pool(
        config: &EngineConfig,
        db_path: impl Into<PathBuf>,
        instructions_dir: Option<PathBuf>,
        pool: ProviderPool,
    ) -> EngineResult<Self> {
        let db = PipelineDb::open(db_path).map_err(EngineError::Store)?.shared();
        let artifacts = Arc::new(ArtifactStore::new(db.clone()));
        let reviews = Arc::new(ReviewRegistry::new(db));
        let instructions = Arc::new(match instructions_dir {
            Some(dir) => InstructionStore::load(dir),
            None => InstructionStore::in_memory(),
        });

        let providers = Arc::new(pool);

        let context = Arc::new(ContextAssembler::new(
            artifacts.clone(),
            instructions.clone(),
            config.context_token_budget,
            config.context_token_ceiling,
        ));

        let provider_for = |stage: Stage| {
            config
                .stage_providers
                .get(&stage)
                .copied()
                .unwrap_or(ProviderName::Claude)
        };

        let requirements = RequirementsService::new(
            artifacts.clone(),
            reviews.clone(),
            context.clone(),
            providers.clone(),
            provider_for(Stage::Req),
        );
        let planning = PlanningService::new(
            artifacts.clone(),
            reviews.clone(),
            context.clone(),
            providers.clone(),
            provider_for(Stage::Plan),
        );
        let stories = StoriesService::new(
            artifacts.clone(),
            reviews.clone(),
            context.clone(),
            providers.clone(),
            provider_for(Stage::Stories),
        );
        let prompts = PromptService::new(
            artifacts.clone(),
            reviews.clone(),
            context.clone(),
            providers.clone(),
            provider_for(Stage::Prompt),
        );

        let coordinator = PipelineCoordinator::new(artifacts.clone());

        Ok(Self {
            artifacts,
            reviews,
            instructions,
            providers,
            coordinator,
            requirements,
            planning,
            stories,
            prompts,
            review_await_default: config.review_await_default,
        })
    }

    // -- Projects -------------------------------------------------------------

    pub fn create_project(&self, name: impl Into<String>, description: impl Into<String>) -> EngineResult<crate::model::project::Project> {
        let project = crate::model::project::Project::new(name, description);
        self.artifacts.create_project(&project).map_err(EngineError::Store)?;
        Ok(project)
    }

    pub fn get_project(&self, id: crate::ids::ProjectId) -> EngineResult<crate::model::project::Project> {
        self.artifacts
            .get_project(id)
            .map_err(EngineError::Store)?
            .ok_or_else(|| EngineError::NotFound(format!("project {id}")))
    }

    pub fn delete_project(&self, id: crate::ids::ProjectId) -> EngineResult<()> {
        self.artifacts.delete_project(id).map_err(EngineError::Store)
    }

    pub fn progress(&self, id: crate::ids::ProjectId) -> EngineResult<std::collections::HashMap<Stage, crate::coordinator::StageProgress>> {
        self.coordinator.progress(id)
    }

    // -- Stage starts -------------------------------------------------------

    pub async fn start_requirements(
        &self,
        request: StartRequirementsRequest,
    ) -> EngineResult<StartRequirementsResponse> {
        let outcome = self
            .requirements
            .start(StartRequest {
                project_id_override: Some(request.project_id),
                parent_artifact_id: None,
                context: ContextInputs {
                    project_description: Some(request.project_description),
                    caller_preferences: request.constraints,
                    extra_hints: request.additional_context,
                    story_index: None,
                    technical_preferences: Default::default(),
                },
                model_hint: None,
                deadline: None,
            })
            .await?;

        let status = self.requirements.get_status(outcome.artifact_id)?;
        Ok(StartRequirementsResponse {
            analysis_id: outcome.artifact_id,
            review_id: outcome.review_id,
            status: status.into(),
        })
    }

    pub async fn start_planning(
        &self,
        request: StartPlanningRequest,
    ) -> EngineResult<StartPlanningResponse> {
        let outcome = self
            .planning
            .start(StartRequest {
                project_id_override: None,
                parent_artifact_id: Some(request.requirements_analysis_id),
                context: ContextInputs {
                    project_description: None,
                    caller_preferences: request.preferences,
                    extra_hints: None,
                    story_index: None,
                    technical_preferences: Default::default(),
                },
                model_hint: None,
                deadline: None,
            })
            .await?;

        let status = self.planning.get_status(outcome.artifact_id)?;
        Ok(StartPlanningResponse {
            planning_id: outcome.artifact_id,
            review_id: outcome.review_id,
            status: status.into(),
        })
    }

    pub async fn start_stories(
        &self,
        request: StartStoriesRequest,
    ) -> EngineResult<StartStoriesResponse> {
        let extra_hints = [request.complexity_levels, request.additional_guidance]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("\n");

        let outcome = self
            .stories
            .start(StartRequest {
                project_id_override: None,
                parent_artifact_id: Some(request.planning_id),
                context: ContextInputs {
                    project_description: None,
                    caller_preferences: request.story_preferences,
                    extra_hints: if extra_hints.is_empty() { None } else { Some(extra_hints) },
                    story_index: None,
                    technical_preferences: Default::default(),
                },
                model_hint: None,
                deadline: None,
            })
            .await?;

        let status = self.stories.get_status(outcome.artifact_id)?;
        Ok(StartStoriesResponse {
            generation_id: outcome.artifact_id,
            review_id: outcome.review_id,
            status: status.into(),
        })
    }

    pub async fn start_prompt(&self, request: StartPromptRequest) -> EngineResult<StartPromptResponse> {
        let outcome = self
            .prompts
            .start(StartRequest {
                project_id_override: None,
                parent_artifact_id: Some(request.story_generation_id),
                context: ContextInputs {
                    project_description: None,
                    caller_preferences: request.prompt_style,
                    extra_hints: None,
                    story_index: Some(request.story_index),
                    technical_preferences: request.technical_preferences.unwrap_or_default(),
                },
                model_hint: None,
                deadline: None,
            })
            .await?;

        let status = self.prompts.get_status(outcome.artifact_id)?;
        Ok(StartPromptResponse {
            prompt_id: outcome.artifact_id,
            review_id: outcome.review_id,
            status: status.into(),
        })
    }

    // -- Status / result lookups ---------------------------------------------

    pub fn status(&self, stage: Stage, artifact_id: ArtifactId) -> EngineResult<StatusResponse> {
        let status = match stage {
            Stage::Req => self.requirements.get_status(artifact_id)?,
            Stage::Plan => self.planning.get_status(artifact_id)?,
            Stage::Stories => self.stories.get_status(artifact_id)?,
            Stage::Prompt => self.prompts.get_status(artifact_id)?,
        };
        Ok(StatusResponse { status: status.into() })
    }

    pub fn result(&self, stage: Stage, artifact_id: ArtifactId) -> EngineResult<serde_json::Value> {
        match stage {
            Stage::Req => serde_json::to_value(self.requirements.get_result(artifact_id)?),
            Stage::Plan => serde_json::to_value(self.planning.get_result(artifact_id)?),
            Stage::Stories => serde_json::to_value(self.stories.get_result(artifact_id)?),
            Stage::Prompt => serde_json::to_value(self.prompts.get_result(artifact_id)?),
        }
        .map_err(|e| EngineError::ParseError(e.to_string()))
    }

    pub fn story_at(&self, stories_id: ArtifactId, index: usize) -> EngineResult<UserStory> {
        self.stories.get_one(stories_id, index)
    }

    pub fn stories_count(&self, stories_id: ArtifactId) -> EngineResult<usize> {
        self.stories.count(stories_id)
    }

    pub fn can_start(&self, stage: Stage, parent_id: Option<ArtifactId>) -> EngineResult<bool> {
        match stage {
            Stage::Req => self.requirements.can_start(),
            Stage::Plan => self.planning.can_start(parent_id.ok_or_else(missing_parent)?),
            Stage::Stories => self.stories.can_start(parent_id.ok_or_else(missing_parent)?),
            Stage::Prompt => self.prompts.can_start(parent_id.ok_or_else(missing_parent)?),
        }
    }

    // -- Reviews --------------------------------------------------------------

    pub fn list_pending_reviews(&self) -> EngineResult<Vec<ReviewView>> {
        Ok(self
            .reviews
            .list_pending(None)?
            .into_iter()
            .map(review_view)
            .collect())
    }

    pub fn get_review(&self, id: ReviewId) -> EngineResult<ReviewView> {
        self.reviews
            .get(id)?
            .map(review_view)
            .ok_or_else(|| EngineError::NotFound(format!("review {id}")))
    }

    pub fn approve_review(&self, id: ReviewId, feedback: Option<String>) -> EngineResult<ReviewView> {
        self.decide_and_sync(id, ReviewDecision::Approved, feedback)
    }

    pub fn reject_review(&self, id: ReviewId, feedback: Option<String>) -> EngineResult<ReviewView> {
        self.decide_and_sync(id, ReviewDecision::Rejected, feedback)
    }

    fn decide_and_sync(
        &self,
        id: ReviewId,
        decision: ReviewDecision,
        feedback: Option<String>,
    ) -> EngineResult<ReviewView> {
        let review = self.reviews.decide(id, decision, feedback)?;
        let wire_status = match decision {
            ReviewDecision::Approved => crate::model::artifact::ArtifactStatus::Approved,
            ReviewDecision::Rejected => crate::model::artifact::ArtifactStatus::Rejected,
            ReviewDecision::Pending => unreachable!("decide() never sets Pending"),
        };
        self.artifacts
            .update_status(review.artifact_id, wire_status, Some(id))
            .map_err(EngineError::Store)?;
        Ok(review_view(review))
    }

    pub async fn await_review(&self, id: ReviewId, deadline: Option<Duration>) -> EngineResult<ReviewView> {
        let review = self
            .reviews
            .await_decision(id, deadline.unwrap_or(self.review_await_default))
            .await?;
        Ok(review_view(review))
    }

    // -- Health -----------------------------------------------------------

    pub async fn provider_health(&self, provider: ProviderName, deadline: Duration) -> bool {
        self.providers.is_healthy(provider, deadline).await
    }

    pub fn review_registry_health(&self) -> bool {
        self.reviews.list_pending(None).is_ok()
    }
}

fn review_view(review: crate::model::review::Review) -> ReviewView {
    ReviewView {
        id: review.id,
        artifact_id: review.artifact_id,
        decision: review.decision,
        feedback: review.feedback,
    }
}

fn missing_parent() -> EngineError {
    EngineError::ArgumentInvalid("parent artifact id required".to_string())
}
