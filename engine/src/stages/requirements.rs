//! Requirements Analysis stage facade (REQ).

use std::sync::Arc;

use crate::context::ContextAssembler;
use crate::error::EngineResult;
use crate::ids::ArtifactId;
use crate::model::artifact::{ArtifactStatus, ParsedOutput, RequirementsDocument, Stage};
use crate::providers::{ProviderName, ProviderPool};
use crate::store::{ArtifactStore, ReviewRegistry};

use super::service::{StageService, StartOutcome, StartRequest};

pub struct RequirementsService {
    inner: StageService,
}

impl RequirementsService {
    pub fn new(
        artifacts: Arc<ArtifactStore>,
        reviews: Arc<ReviewRegistry>,
        context: Arc<ContextAssembler>,
        providers: Arc<ProviderPool>,
        provider_name: ProviderName,
    ) -> Self {
        Self {
            inner: StageService::new(Stage::Req, provider_name, artifacts, reviews, context, providers),
        }
    }

    pub fn can_start(&self) -> EngineResult<bool> {
        self.inner.can_start(None)
    }

    pub async fn start(&self, request: StartRequest) -> EngineResult<StartOutcome> {
        self.inner.start(request).await
    }

    pub fn get_status(&self, artifact_id: ArtifactId) -> EngineResult<ArtifactStatus> {
        self.inner.get_status(artifact_id)
    }

    pub fn get_result(&self, artifact_id: ArtifactId) -> EngineResult<RequirementsDocument> {
        match self.inner.get_result(artifact_id)? {
            ParsedOutput::Req(doc) => Ok(doc),
            other => unreachable!("REQ artifact produced non-REQ output: {other:?}"),
        }
    }
}
