//! Column family definitions for the RocksDB-backed persistence
//! substrate shared by the Artifact Store (C4) and Review Registry (C3).
//!
//! spec.md §1 puts "the relational schema beyond the fields named in §3"
//! out of scope for this engine — a column-family KV store satisfies the
//! same durability and lookup contract without committing to a SQL
//! dialect the external collaborator owns.

pub const CF_PROJECTS: &str = "projects";
pub const CF_ARTIFACTS: &str = "artifacts";
pub const CF_REVIEWS: &str = "reviews";
/// Secondary index: group key -> artifact id, used to enforce invariant 5
/// and to serve `getByParent` / `findApprovedUpstream` without a scan.
pub const CF_ARTIFACT_INDEX: &str = "artifact_index";

pub const ALL_CFS: &[&str] = &[CF_PROJECTS, CF_ARTIFACTS, CF_REVIEWS, CF_ARTIFACT_INDEX];

pub mod keys {
    use crate::ids::{ArtifactId, ProjectId, ReviewId};
    use crate::model::artifact::{GroupKey, Stage};

    pub fn project(id: ProjectId) -> String {
        format!("proj:{id}")
    }

    pub fn project_prefix() -> &'static str {
        "proj:"
    }

    pub fn artifact(id: ArtifactId) -> String {
        format!("art:{id}")
    }

    pub fn artifact_prefix() -> &'static str {
        "art:"
    }

    pub fn review(id: ReviewId) -> String {
        format!("rev:{id}")
    }

    pub fn review_prefix() -> &'static str {
        "rev:"
    }

    /// Index key for an artifact's children lookup (`getByParent`).
    pub fn children_of(parent: ArtifactId) -> String {
        format!("children:{parent}")
    }

    /// Index key for the group-key uniqueness guarantee (invariant 5) and
    /// for `findApprovedUpstream`'s most-recent-first scan.
    pub fn group(key: &GroupKey) -> String {
        let parent = key
            .parent_artifact_id
            .map(|p| p.to_string())
            .unwrap_or_else(|| "none".to_string());
        let index = key
            .story_index
            .map(|i| i.to_string())
            .unwrap_or_else(|| "none".to_string());
        format!("group:{}:{:?}:{}:{}", key.project_id, key.stage, parent, index)
    }

    pub fn approved_upstream_prefix(project_id: ProjectId, stage: Stage) -> String {
        format!("approved:{project_id}:{stage:?}:")
    }

    pub fn approved_upstream(project_id: ProjectId, stage: Stage, approved_at_nanos: i64, artifact_id: ArtifactId) -> String {
        format!(
            "{}{:020}:{}",
            approved_upstream_prefix(project_id, stage),
            approved_at_nanos,
            artifact_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ProjectId;
    use crate::model::artifact::Stage;

    #[test]
    fn approved_upstream_keys_sort_by_timestamp() {
        let project = ProjectId::new();
        let a = crate::ids::ArtifactId::new();
        let b = crate::ids::ArtifactId::new();
        let k1 = keys::approved_upstream(project, Stage::Req, 100, a);
        let k2 = keys::approved_upstream(project, Stage::Req, 200, b);
        assert!(k1 < k2);
    }
}
