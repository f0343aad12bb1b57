//! Pipeline Coordinator (C7) — stateless queries composed over the
//! Review Registry and Artifact Store (spec.md §4.7).

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::EngineResult;
use crate::ids::{ArtifactId, ProjectId};
use crate::model::artifact::{ArtifactStatus, Stage};
use crate::store::ArtifactStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageProgress {
    pub total: usize,
    pub approved: usize,
    pub pending: usize,
    pub failed: usize,
}

pub struct PipelineCoordinator {
    artifacts: Arc<ArtifactStore>,
}

impl PipelineCoordinator {
    pub fn new(artifacts: Arc<ArtifactStore>) -> Self {
        Self { artifacts }
    }

    /// `canProgress(projectId, targetStage) -> bool` — true iff every
    /// stage required upstream of `target_stage` has an Approved
    /// artifact for this project (spec.md §4.5's required-upstream
    /// table).
    pub fn can_progress(&self, project_id: ProjectId, target_stage: Stage) -> EngineResult<bool> {
        for upstream in target_stage.required_upstreams() {
            if self.artifacts.find_approved_upstream(project_id, *upstream)?.is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// `latestApproved(projectId, stage) -> artifactId | none`.
    pub fn latest_approved(
        &self,
        project_id: ProjectId,
        stage: Stage,
    ) -> EngineResult<Option<ArtifactId>> {
        Ok(self
            .artifacts
            .find_approved_upstream(project_id, stage)?
            .map(|a| a.id))
    }

    /// `progress(projectId) -> {stage -> {total, approved, pending, failed}}`.
    pub fn progress(&self, project_id: ProjectId) -> EngineResult<HashMap<Stage, StageProgress>> {
        let mut out = HashMap::new();
        for stage in Stage::ordered() {
            let stats = self.stage_progress(project_id, *stage)?;
            out.insert(*stage, stats);
        }
        Ok(out)
    }

    fn stage_progress(&self, project_id: ProjectId, stage: Stage) -> EngineResult<StageProgress> {
        // The artifact store has no direct by-project-and-stage query
        // beyond parent traversal; the coordinator walks the lineage
        // tree from the project's roots to build the roll-up, since
        // spec.md treats this as a read-side aggregation, not a C4
        // primitive.
        let mut progress = StageProgress::default();
        let roots = if stage == Stage::Req {
            self.root_candidates(project_id)?
        } else {
            self.stage_candidates(project_id, stage)?
        };

        for artifact in roots {
            progress.total += 1;
            match artifact.status {
                ArtifactStatus::Approved => progress.approved += 1,
                ArtifactStatus::PendingReview | ArtifactStatus::Processing => progress.pending += 1,
                ArtifactStatus::Rejected | ArtifactStatus::Failed => progress.failed += 1,
            }
        }
        Ok(progress)
    }

    fn root_candidates(
        &self,
        project_id: ProjectId,
    ) -> EngineResult<Vec<crate::model::artifact::StageArtifact>> {
        self.stage_candidates(project_id, Stage::Req)
    }

    fn stage_candidates(
        &self,
        project_id: ProjectId,
        stage: Stage,
    ) -> EngineResult<Vec<crate::model::artifact::StageArtifact>> {
        self.artifacts.list_stage_artifacts(project_id, stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::artifact::StageArtifact;
    use crate::model::project::Project;
    use crate::store::db::PipelineDb;

    fn coordinator() -> (PipelineCoordinator, Arc<ArtifactStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = PipelineDb::open(dir.path()).unwrap().shared();
        let artifacts = Arc::new(ArtifactStore::new(db));
        (PipelineCoordinator::new(artifacts.clone()), artifacts, dir)
    }

    #[test]
    fn can_progress_false_until_req_approved() {
        let (coordinator, artifacts, _dir) = coordinator();
        let project = Project::new("P", "d");
        artifacts.create_project(&project).unwrap();

        assert!(!coordinator.can_progress(project.id, Stage::Plan).unwrap());

        let artifact = StageArtifact::new_processing(project.id, Stage::Req, None, None);
        let id = artifact.id;
        artifacts.create(artifact).unwrap();
        artifacts
            .update_status(id, ArtifactStatus::PendingReview, Some(crate::ids::ReviewId::new()))
            .unwrap();
        artifacts.update_status(id, ArtifactStatus::Approved, None).unwrap();

        assert!(coordinator.can_progress(project.id, Stage::Plan).unwrap());
    }

    #[test]
    fn progress_counts_by_status() {
        let (coordinator, artifacts, _dir) = coordinator();
        let project = Project::new("P", "d");
        artifacts.create_project(&project).unwrap();

        let artifact = StageArtifact::new_processing(project.id, Stage::Req, None, None);
        artifacts.create(artifact).unwrap();

        let roll_up = coordinator.progress(project.id).unwrap();
        assert_eq!(roll_up[&Stage::Req].total, 1);
        assert_eq!(roll_up[&Stage::Req].pending, 1);
        assert_eq!(roll_up[&Stage::Plan].total, 0);
    }
}
