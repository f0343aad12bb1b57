//! User Story Generation stage facade (STORIES) — adds `count`/`getOne`
//! over the common shape (spec.md §4.6).

use std::sync::Arc;

use crate::context::ContextAssembler;
use crate::error::{EngineError, EngineResult};
use crate::ids::ArtifactId;
use crate::model::artifact::{ArtifactStatus, ParsedOutput, Stage, StoriesOutput};
use crate::model::story::UserStory;
use crate::providers::{ProviderName, ProviderPool};
use crate::store::{ArtifactStore, ReviewRegistry};

use super::service::{StageService, StartOutcome, StartRequest};

pub struct StoriesService {
    inner: StageService,
}

impl StoriesService {
    pub fn new(
        artifacts: Arc<ArtifactStore>,
        reviews: Arc<ReviewRegistry>,
        context: Arc<ContextAssembler>,
        providers: Arc<ProviderPool>,
        provider_name: ProviderName,
    ) -> Self {
        Self {
            inner: StageService::new(Stage::Stories, provider_name, artifacts, reviews, context, providers),
        }
    }

    pub fn can_start(&self, planning_id: ArtifactId) -> EngineResult<bool> {
        self.inner.can_start(Some(planning_id))
    }

    pub async fn start(&self, request: StartRequest) -> EngineResult<StartOutcome> {
        self.inner.start(request).await
    }

    pub fn get_status(&self, artifact_id: ArtifactId) -> EngineResult<ArtifactStatus> {
        self.inner.get_status(artifact_id)
    }

    pub fn get_result(&self, artifact_id: ArtifactId) -> EngineResult<StoriesOutput> {
        match self.inner.get_result(artifact_id)? {
            ParsedOutput::Stories(out) => Ok(out),
            other => unreachable!("STORIES artifact produced non-STORIES output: {other:?}"),
        }
    }

    pub fn count(&self, artifact_id: ArtifactId) -> EngineResult<usize> {
        Ok(self.get_result(artifact_id)?.stories.len())
    }

    pub fn get_one(&self, artifact_id: ArtifactId, index: usize) -> EngineResult<UserStory> {
        let out = self.get_result(artifact_id)?;
        let len = out.stories.len();
        out.stories
            .into_iter()
            .nth(index)
            .ok_or(EngineError::OutOfRange { index, len })
    }
}
