//! Per-Story Prompt Generation stage facade (PROMPT).

use std::sync::Arc;

use crate::context::ContextAssembler;
use crate::error::EngineResult;
use crate::ids::ArtifactId;
use crate::model::artifact::{ArtifactStatus, ParsedOutput, PromptOutput, Stage};
use crate::providers::{ProviderName, ProviderPool};
use crate::store::{ArtifactStore, ReviewRegistry};

use super::service::{StageService, StartOutcome, StartRequest};

pub struct PromptService {
    inner: StageService,
}

impl PromptService {
    pub fn new(
        artifacts: Arc<ArtifactStore>,
        reviews: Arc<ReviewRegistry>,
        context: Arc<ContextAssembler>,
        providers: Arc<ProviderPool>,
        provider_name: ProviderName,
    ) -> Self {
        Self {
            inner: StageService::new(Stage::Prompt, provider_name, artifacts, reviews, context, providers),
        }
    }

    pub fn can_start(&self, stories_id: ArtifactId) -> EngineResult<bool> {
        self.inner.can_start(Some(stories_id))
    }

    pub async fn start(&self, request: StartRequest) -> EngineResult<StartOutcome> {
        self.inner.start(request).await
    }

    pub fn get_status(&self, artifact_id: ArtifactId) -> EngineResult<ArtifactStatus> {
        self.inner.get_status(artifact_id)
    }

    pub fn get_result(&self, artifact_id: ArtifactId) -> EngineResult<PromptOutput> {
        match self.inner.get_result(artifact_id)? {
            ParsedOutput::Prompt(out) => Ok(out),
            other => unreachable!("PROMPT artifact produced non-PROMPT output: {other:?}"),
        }
    }
}
