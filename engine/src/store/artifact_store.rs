//! Artifact Store (C4) — typed persistence of stage inputs, raw LLM
//! output, parsed structured form, and lineage edges (spec.md §4.4).

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::ids::{ArtifactId, ProjectId};
use crate::model::artifact::{ArtifactStatus, GroupKey, Stage, StageArtifact};
use crate::model::project::Project;

use super::db::{SharedDb, StoreError, StoreResult};
use super::schema::{self, keys};

/// Typed façade over the shared `PipelineDb`, owning the `projects` and
/// `artifacts` column families plus the lineage/group-key indexes.
#[derive(Clone)]
pub struct ArtifactStore {
    db: SharedDb,
    /// Serializes `create`'s check-then-act against the group-key index.
    /// `PipelineDb::put`/`get` only ever take a read lock on the RocksDB
    /// handle (concurrent readers/writers are safe at the storage layer),
    /// so without this, two racing `create()` calls for the same group key
    /// can both observe no occupant before either inserts one.
    create_lock: Arc<Mutex<()>>,
}

impl ArtifactStore {
    pub fn new(db: SharedDb) -> Self {
        Self {
            db,
            create_lock: Arc::new(Mutex::new(())),
        }
    }

    // -- Projects ---------------------------------------------------------

    pub fn create_project(&self, project: &Project) -> StoreResult<()> {
        self.db.put(schema::CF_PROJECTS, &keys::project(project.id), project)
    }

    pub fn get_project(&self, id: ProjectId) -> StoreResult<Option<Project>> {
        self.db.get(schema::CF_PROJECTS, &keys::project(id))
    }

    /// Cascading delete: removes the project plus every artifact beneath
    /// it (spec.md §3 "deletion cascades", SPEC_FULL.md §9.5).
    pub fn delete_project(&self, id: ProjectId) -> StoreResult<()> {
        for stage in Stage::ordered() {
            let artifacts = self.list_project_artifacts(id, *stage)?;
            for artifact in artifacts {
                self.db.delete(schema::CF_ARTIFACTS, &keys::artifact(artifact.id))?;
                self.db
                    .delete(schema::CF_ARTIFACT_INDEX, &keys::children_of(artifact.id))?;
            }
        }
        self.db.delete(schema::CF_PROJECTS, &keys::project(id))
    }

    /// All artifacts of `stage` belonging to `projectId`, used by the
    /// Pipeline Coordinator's progress roll-up and by cascading delete.
    pub fn list_stage_artifacts(&self, project_id: ProjectId, stage: Stage) -> StoreResult<Vec<StageArtifact>> {
        self.list_project_artifacts(project_id, stage)
    }

    fn list_project_artifacts(&self, project_id: ProjectId, stage: Stage) -> StoreResult<Vec<StageArtifact>> {
        let all: Vec<(String, StageArtifact)> =
            self.db.list_entries(schema::CF_ARTIFACTS, schema::keys::artifact_prefix())?;
        Ok(all
            .into_iter()
            .map(|(_, a)| a)
            .filter(|a| a.project_id == project_id && a.stage == stage)
            .collect())
    }

    // -- Artifacts ----------------------------------------------------------

    /// Persist a newly created artifact, enforcing invariants 2, 3, and 5.
    /// Invariant 2 (parent exists and is Approved) and invariant 3 (prompt
    /// story index in range) are caller-checked preconditions surfaced as
    /// `EngineError` before this is reached; this method re-asserts
    /// invariant 5 atomically against the group-key index.
    pub fn create(&self, artifact: StageArtifact) -> StoreResult<StageArtifact> {
        let group_key = artifact.group_key();
        let _guard = self.create_lock.lock().map_err(|_| StoreError::LockPoisoned)?;

        if let Some(existing_id) = self.group_occupant(&group_key)? {
            if let Some(existing) = self.get(existing_id)? {
                if !existing.status.is_terminal() {
                    return Err(StoreError::Serialization(
                        "AlreadyInProgress".to_string(),
                    ));
                }
            }
        }

        self.db.put(schema::CF_ARTIFACTS, &keys::artifact(artifact.id), &artifact)?;
        self.db
            .put(schema::CF_ARTIFACT_INDEX, &keys::group(&group_key), &artifact.id)?;

        if let Some(parent) = artifact.parent_artifact_id {
            let mut children = self.get_children_ids(parent)?;
            children.push(artifact.id);
            self.db
                .put(schema::CF_ARTIFACT_INDEX, &keys::children_of(parent), &children)?;
        }

        debug!(artifact_id = %artifact.id, stage = ?artifact.stage, "artifact created");
        Ok(artifact)
    }

    fn group_occupant(&self, key: &GroupKey) -> StoreResult<Option<ArtifactId>> {
        self.db.get(schema::CF_ARTIFACT_INDEX, &keys::group(key))
    }

    fn get_children_ids(&self, parent: ArtifactId) -> StoreResult<Vec<ArtifactId>> {
        Ok(self
            .db
            .get(schema::CF_ARTIFACT_INDEX, &keys::children_of(parent))?
            .unwrap_or_default())
    }

    pub fn get(&self, id: ArtifactId) -> StoreResult<Option<StageArtifact>> {
        self.db.get(schema::CF_ARTIFACTS, &keys::artifact(id))
    }

    /// Overwrite an already-`create`d artifact's stored record in place
    /// (raw/parsed output, failure reason) without touching the
    /// group-key or lineage indexes, which were populated once at
    /// `create` time and describe the same logical artifact.
    pub fn save_output(&self, artifact: &StageArtifact) -> StoreResult<()> {
        self.db.put(schema::CF_ARTIFACTS, &keys::artifact(artifact.id), artifact)
    }

    pub fn get_by_parent(&self, parent_id: ArtifactId) -> StoreResult<Vec<StageArtifact>> {
        let ids = self.get_children_ids(parent_id)?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(a) = self.get(id)? {
                out.push(a);
            }
        }
        Ok(out)
    }

    /// Most recent Approved artifact of `stage` for `projectId`, or none.
    pub fn find_approved_upstream(
        &self,
        project_id: ProjectId,
        stage: Stage,
    ) -> StoreResult<Option<StageArtifact>> {
        let prefix = keys::approved_upstream_prefix(project_id, stage);
        let mut index_keys = self.db.list_keys(schema::CF_ARTIFACT_INDEX, &prefix)?;
        index_keys.sort();
        let Some(latest_key) = index_keys.pop() else {
            return Ok(None);
        };
        let artifact_id: Option<ArtifactId> = self.db.get(schema::CF_ARTIFACT_INDEX, &latest_key)?;
        match artifact_id {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }

    /// Guarded status transition per invariant 1. `review_id` must be
    /// supplied exactly when `new_status` requires one (invariant 4).
    pub fn update_status(
        &self,
        id: ArtifactId,
        new_status: ArtifactStatus,
        review_id: Option<crate::ids::ReviewId>,
    ) -> StoreResult<StageArtifact> {
        let mut artifact = self
            .get(id)?
            .ok_or_else(|| StoreError::Serialization(format!("NotFound:{id}")))?;

        if artifact.status == new_status {
            // Idempotent re-application of the same terminal status.
            return Ok(artifact);
        }

        if !artifact.status.can_transition_to(new_status) {
            return Err(StoreError::Serialization(format!(
                "invalid transition {:?} -> {:?}",
                artifact.status, new_status
            )));
        }

        artifact.status = new_status;
        if new_status.requires_review_id() {
            if let Some(rid) = review_id {
                artifact.review_id = Some(rid);
            }
        }
        artifact.updated_at = chrono::Utc::now();
        self.db.put(schema::CF_ARTIFACTS, &keys::artifact(id), &artifact)?;

        if new_status == ArtifactStatus::Approved {
            let approved_at = artifact.updated_at.timestamp_nanos_opt().unwrap_or(0);
            let index_key =
                keys::approved_upstream(artifact.project_id, artifact.stage, approved_at, id);
            self.db.put(schema::CF_ARTIFACT_INDEX, &index_key, &id)?;
        }

        debug!(artifact_id = %id, new_status = %new_status, "artifact status updated");
        Ok(artifact)
    }

    /// Fetch a single story by index from a STORIES artifact's parsed
    /// output, enforcing invariant 3.
    pub fn get_story_at(
        &self,
        stories_id: ArtifactId,
        index: usize,
    ) -> StoreResult<Option<crate::model::story::UserStory>> {
        let Some(artifact) = self.get(stories_id)? else {
            return Ok(None);
        };
        let Some(parsed) = artifact.parsed_output.as_ref().and_then(|p| p.as_stories()) else {
            return Ok(None);
        };
        Ok(parsed.stories.get(index).cloned())
    }
}
