//! Project Planning stage facade (PLAN).

use std::sync::Arc;

use crate::context::ContextAssembler;
use crate::error::EngineResult;
use crate::ids::ArtifactId;
use crate::model::artifact::{ArtifactStatus, ParsedOutput, ProjectPlan, Stage};
use crate::providers::{ProviderName, ProviderPool};
use crate::store::{ArtifactStore, ReviewRegistry};

use super::service::{StageService, StartOutcome, StartRequest};

pub struct PlanningService {
    inner: StageService,
}

impl PlanningService {
    pub fn new(
        artifacts: Arc<ArtifactStore>,
        reviews: Arc<ReviewRegistry>,
        context: Arc<ContextAssembler>,
        providers: Arc<ProviderPool>,
        provider_name: ProviderName,
    ) -> Self {
        Self {
            inner: StageService::new(Stage::Plan, provider_name, artifacts, reviews, context, providers),
        }
    }

    pub fn can_start(&self, requirements_analysis_id: ArtifactId) -> EngineResult<bool> {
        self.inner.can_start(Some(requirements_analysis_id))
    }

    pub async fn start(&self, request: StartRequest) -> EngineResult<StartOutcome> {
        self.inner.start(request).await
    }

    pub fn get_status(&self, artifact_id: ArtifactId) -> EngineResult<ArtifactStatus> {
        self.inner.get_status(artifact_id)
    }

    pub fn get_result(&self, artifact_id: ArtifactId) -> EngineResult<ProjectPlan> {
        match self.inner.get_result(artifact_id)? {
            ParsedOutput::Plan(plan) => Ok(plan),
            other => unreachable!("PLAN artifact produced non-PLAN output: {other:?}"),
        }
    }
}
