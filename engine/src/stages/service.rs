//! The generic start sequence (spec.md §4.6 "Start step"), parameterized
//! by stage so the four stage services share one implementation instead
//! of four near-identical structs (spec.md §9 design note).

use std::sync::Arc;
use std::time::Duration;

use blake3::Hasher;
use tracing::{debug, info};

use crate::context::{ContextAssembler, ContextInputs};
use crate::error::{EngineError, EngineResult};
use crate::ids::{ArtifactId, ProjectId};
use crate::model::artifact::{
    ArtifactStatus, ParsedOutput, PromptExtras, ProjectPlan, RequirementsDocument, Stage,
    StageArtifact, StoriesOutput,
};
use crate::providers::{ProviderCall, ProviderName, ProviderPool};
use crate::store::{ArtifactStore, ReviewRegistry};

use super::parse;

/// Everything a `start()` call needs beyond the fixed per-stage wiring.
#[derive(Debug, Clone, Default)]
pub struct StartRequest {
    pub project_id_override: Option<ProjectId>,
    pub parent_artifact_id: Option<ArtifactId>,
    pub context: ContextInputs,
    pub model_hint: Option<String>,
    pub deadline: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub artifact_id: ArtifactId,
    pub review_id: crate::ids::ReviewId,
}

const DEFAULT_DEADLINE: Duration = Duration::from_secs(120);

/// Shared machinery the four stage facades (`requirements`, `planning`,
/// `stories`, `prompts`) delegate to.
pub struct StageService {
    pub(super) artifacts: Arc<ArtifactStore>,
    pub(super) reviews: Arc<ReviewRegistry>,
    pub(super) context: Arc<ContextAssembler>,
    pub(super) providers: Arc<ProviderPool>,
    pub(super) stage: Stage,
    pub(super) provider_name: ProviderName,
}

impl StageService {
    pub fn new(
        stage: Stage,
        provider_name: ProviderName,
        artifacts: Arc<ArtifactStore>,
        reviews: Arc<ReviewRegistry>,
        context: Arc<ContextAssembler>,
        providers: Arc<ProviderPool>,
    ) -> Self {
        Self {
            artifacts,
            reviews,
            context,
            providers,
            stage,
            provider_name,
        }
    }

    /// `canStart(parentId) -> bool` (spec.md §4.6) — parent exists and is
    /// Approved. Always true for REQ, which has no parent.
    pub fn can_start(&self, parent_id: Option<ArtifactId>) -> EngineResult<bool> {
        let Some(parent_id) = parent_id else {
            return Ok(self.stage.parent_stage().is_none());
        };
        let Some(parent) = self.artifacts.get(parent_id)? else {
            return Ok(false);
        };
        Ok(parent.status == ArtifactStatus::Approved)
    }

    pub fn get_status(&self, artifact_id: ArtifactId) -> EngineResult<ArtifactStatus> {
        self.artifacts
            .get(artifact_id)?
            .map(|a| a.status)
            .ok_or_else(|| EngineError::not_found_artifact(artifact_id))
    }

    pub fn get_result(&self, artifact_id: ArtifactId) -> EngineResult<ParsedOutput> {
        let artifact = self
            .artifacts
            .get(artifact_id)?
            .ok_or_else(|| EngineError::not_found_artifact(artifact_id))?;
        if artifact.status != ArtifactStatus::Approved {
            return Err(EngineError::NotFound(format!(
                "artifact {artifact_id} has no approved result (status {})",
                artifact.status
            )));
        }
        artifact
            .parsed_output
            .ok_or_else(|| EngineError::NotFound(format!("artifact {artifact_id} has no parsed output")))
    }

    /// The authoritative start sequence (spec.md §4.6 steps 1-7).
    pub async fn start(&self, request: StartRequest) -> EngineResult<StartOutcome> {
        self.validate_request(&request)?;

        let project_id = self.resolve_project_id(&request)?;

        if !self.can_start(request.parent_artifact_id)? {
            return Err(EngineError::prerequisite_missing(
                self.stage.parent_stage().unwrap_or(self.stage),
                "parent artifact missing or not Approved",
            ));
        }

        let prompt_extras = self.build_prompt_extras(&request);
        let artifact = StageArtifact::new_processing(
            project_id,
            self.stage,
            request.parent_artifact_id,
            prompt_extras,
        );
        let artifact_id = artifact.id;
        let artifact = self
            .artifacts
            .create(artifact)
            .map_err(map_store_create_error)?;

        debug!(artifact_id = %artifact_id, stage = %self.stage, "stage started");

        let assembled = match self.context.assemble(self.stage, project_id, &request.context) {
            Ok(assembled) => assembled,
            Err(err) => {
                self.mark_failed(artifact_id, &err)?;
                return Err(err);
            }
        };

        let deadline = request.deadline.unwrap_or(DEFAULT_DEADLINE);
        let call = ProviderCall {
            prompt: assembled.prompt,
            model_hint: request.model_hint.clone(),
            max_tokens: None,
            temperature: None,
            deadline,
        };

        let response = match self.providers.call(self.provider_name, call).await {
            Ok(response) => response,
            Err(err) => {
                self.mark_failed(artifact_id, &err)?;
                return Err(err);
            }
        };

        let mut artifact = artifact;
        artifact.raw_output = Some(response.content.clone());

        let parsed = match self.parse(&response.content) {
            Ok(parsed) => parsed,
            Err(err) => {
                self.mark_failed(artifact_id, &err)?;
                return Err(err);
            }
        };
        artifact.parsed_output = Some(parsed);
        self.artifacts.save_output(&artifact)?;

        let digest = digest_payload(&response.content);
        let review = self
            .reviews
            .submit(artifact_id, self.stage, digest)?;

        self.artifacts
            .update_status(artifact_id, ArtifactStatus::PendingReview, Some(review.id))?;

        info!(artifact_id = %artifact_id, review_id = %review.id, stage = %self.stage, "stage submitted for review");

        Ok(StartOutcome {
            artifact_id,
            review_id: review.id,
        })
    }

    fn validate_request(&self, request: &StartRequest) -> EngineResult<()> {
        if self.stage.parent_stage().is_some() && request.parent_artifact_id.is_none() {
            return Err(EngineError::ArgumentInvalid(format!(
                "{} requires a parent artifact id",
                self.stage
            )));
        }
        if self.stage == Stage::Prompt && request.context.story_index.is_none() {
            return Err(EngineError::ArgumentInvalid(
                "PROMPT requires a story_index".to_string(),
            ));
        }
        Ok(())
    }

    fn resolve_project_id(&self, request: &StartRequest) -> EngineResult<ProjectId> {
        if let Some(id) = request.project_id_override {
            return Ok(id);
        }
        let parent_id = request
            .parent_artifact_id
            .ok_or_else(|| EngineError::ArgumentInvalid("missing project id".to_string()))?;
        let parent = self
            .artifacts
            .get(parent_id)?
            .ok_or_else(|| EngineError::not_found_artifact(parent_id))?;
        Ok(parent.project_id)
    }

    fn build_prompt_extras(&self, request: &StartRequest) -> Option<PromptExtras> {
        if self.stage != Stage::Prompt {
            return None;
        }
        Some(PromptExtras {
            story_index: request.context.story_index.unwrap_or(0),
            technical_preferences: request.context.technical_preferences.clone(),
        })
    }

    fn parse(&self, raw: &str) -> EngineResult<ParsedOutput> {
        match self.stage {
            Stage::Req => parse::parse_sections(raw)
                .map(|sections| ParsedOutput::Req(RequirementsDocument { sections }))
                .map_err(|e| EngineError::ParseError(e.to_string())),
            Stage::Plan => parse::parse_sections(raw)
                .map(|sections| ParsedOutput::Plan(ProjectPlan { sections }))
                .map_err(|e| EngineError::ParseError(e.to_string())),
            Stage::Stories => parse::parse_stories(raw)
                .map(|stories| ParsedOutput::Stories(StoriesOutput { stories }))
                .map_err(|e| EngineError::ParseError(e.to_string())),
            Stage::Prompt => Ok(ParsedOutput::Prompt(parse::parse_prompt(raw))),
        }
    }

    fn mark_failed(&self, artifact_id: ArtifactId, err: &EngineError) -> EngineResult<()> {
        if let Some(mut artifact) = self.artifacts.get(artifact_id)? {
            artifact.failure_reason = Some(err.to_string());
            artifact.status = ArtifactStatus::Failed;
            artifact.updated_at = chrono::Utc::now();
            self.artifacts.save_output(&artifact)?;
        }
        Ok(())
    }
}

fn map_store_create_error(err: crate::store::StoreError) -> EngineError {
    match &err {
        crate::store::StoreError::Serialization(msg) if msg == "AlreadyInProgress" => {
            EngineError::AlreadyInProgress
        }
        _ => EngineError::Store(err),
    }
}

fn digest_payload(raw: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(raw.as_bytes());
    hasher.finalize().to_hex().to_string()
}
